//! Resource identifiers.
//!
//! A `Uri` names something in a record store that can change: a whole table
//! (`content://media/songs`) or a single item beneath it
//! (`content://media/songs/7`). Identifiers are opaque to the reactive layer
//! apart from the descendant relation used for change notification.

use crate::row::RowId;
use alloc::format;
use alloc::string::String;
use core::fmt;

/// An opaque, comparable handle naming an observable unit of data.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uri(String);

impl Uri {
    /// Creates an identifier from its string form. Trailing slashes are dropped.
    pub fn new(uri: impl Into<String>) -> Self {
        let mut uri = uri.into();
        while uri.len() > 1 && uri.ends_with('/') {
            uri.pop();
        }
        Uri(uri)
    }

    /// Returns the string form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the identifier of the item `id` beneath this identifier.
    pub fn with_appended_id(&self, id: RowId) -> Uri {
        Uri(format!("{}/{}", self.0, id))
    }

    /// Parses the trailing path segment as a row id.
    pub fn last_id(&self) -> Option<RowId> {
        self.0.rsplit('/').next().and_then(|segment| segment.parse().ok())
    }

    /// Returns the identifier one path segment up, if any.
    pub fn parent(&self) -> Option<Uri> {
        let (head, _) = self.0.rsplit_once('/')?;
        if head.is_empty() || head.ends_with('/') {
            // scheme separator, e.g. "content://"
            return None;
        }
        Some(Uri(String::from(head)))
    }

    /// Returns true if `self` lies strictly beneath `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Uri) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(ancestor.as_str())
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }

    /// Returns true if a listener registered on `watched` must be notified
    /// about a change to `self`.
    pub fn matches(&self, watched: &Uri, notify_for_descendants: bool) -> bool {
        self == watched
            || (notify_for_descendants && self.is_descendant_of(watched))
            // a change to a whole collection affects every item beneath it
            || watched.is_descendant_of(self)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(uri: &str) -> Self {
        Uri::new(uri)
    }
}

impl From<String> for Uri {
    fn from(uri: String) -> Self {
        Uri::new(uri)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
