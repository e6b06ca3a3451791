//! Record store contract.
//!
//! A record store is any data source that can be queried by identifier and
//! that can notify registered listeners when the data behind an identifier
//! changes. The reactive layer treats it as opaque.

use crate::cursor::RowCursor;
use crate::query::Query;
use rxstore_core::{Result, Uri};
use std::fmt;
use std::sync::Arc;

/// Handle returned by a listener registration, used to unregister it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Callback invoked with the identifier that changed.
pub type ChangeListener = Arc<dyn Fn(&Uri) + Send + Sync>;

/// A queryable store that notifies on change.
pub trait RecordStore: Send + Sync {
    /// Registers `listener` for changes to `uri`. With `notify_for_descendants`
    /// the listener also fires for identifiers beneath `uri`.
    fn register_change_listener(
        &self,
        uri: &Uri,
        notify_for_descendants: bool,
        listener: ChangeListener,
    ) -> Result<ListenerId>;

    /// Removes a listener previously returned by `register_change_listener`.
    fn unregister_change_listener(&self, id: ListenerId) -> Result<()>;

    /// Reads the rows behind `uri`.
    ///
    /// `Ok(None)` means the store produced no result set at all, which is
    /// distinct from an empty one.
    fn query(&self, uri: &Uri, query: &Query) -> Result<Option<Box<dyn RowCursor>>>;
}
