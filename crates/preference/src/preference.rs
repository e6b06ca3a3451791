//! Typed reactive preferences.

use crate::hub::ListenerHub;
use crate::kind::PreferenceValue;
use rxstore_core::Result;
use rxstore_reactive::{spawn, ChangeStream, Dispatcher, Executor, QueryStream, ReactiveContext, TaskHandle};
use rxstore_storage::KeyValueStore;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Factory for preferences backed by one key/value store.
///
/// All preferences created from the same `Preferences` share one
/// [`ListenerHub`], and so one native listener on the store.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    hub: ListenerHub,
    dispatcher: Dispatcher,
    executor: Arc<dyn Executor>,
}

impl Preferences {
    /// Uses the context's dispatcher and default worker pool.
    pub fn new(store: Arc<dyn KeyValueStore>, context: &ReactiveContext) -> Self {
        Self::with_executor(store, context.dispatcher(), context.default_executor())
    }

    /// Runs reads and writes on `executor` instead of a context's pool.
    pub fn with_executor(store: Arc<dyn KeyValueStore>, dispatcher: &Dispatcher, executor: Arc<dyn Executor>) -> Self {
        Self {
            hub: ListenerHub::new(store.clone()),
            store,
            dispatcher: dispatcher.clone(),
            executor,
        }
    }

    /// Creates a preference of any supported kind.
    pub fn preference<T: PreferenceValue>(&self, key: impl Into<String>) -> Preference<T> {
        Preference {
            key: key.into(),
            store: self.store.clone(),
            hub: self.hub.clone(),
            dispatcher: self.dispatcher.clone(),
            executor: self.executor.clone(),
            _kind: PhantomData,
        }
    }

    pub fn boolean(&self, key: impl Into<String>) -> Preference<bool> {
        self.preference(key)
    }

    pub fn int(&self, key: impl Into<String>) -> Preference<i32> {
        self.preference(key)
    }

    pub fn long(&self, key: impl Into<String>) -> Preference<i64> {
        self.preference(key)
    }

    pub fn float(&self, key: impl Into<String>) -> Preference<f32> {
        self.preference(key)
    }

    pub fn string(&self, key: impl Into<String>) -> Preference<String> {
        self.preference(key)
    }

    pub fn string_set(&self, key: impl Into<String>) -> Preference<BTreeSet<String>> {
        self.preference(key)
    }

    /// Returns the shared listener hub.
    pub fn hub(&self) -> &ListenerHub {
        &self.hub
    }
}

/// A typed view of one key.
///
/// `blocking_*` methods run on the calling thread. The other operations run
/// on the executor the preference was created with.
pub struct Preference<T> {
    key: String,
    store: Arc<dyn KeyValueStore>,
    hub: ListenerHub,
    dispatcher: Dispatcher,
    executor: Arc<dyn Executor>,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for Preference<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            store: self.store.clone(),
            hub: self.hub.clone(),
            dispatcher: self.dispatcher.clone(),
            executor: self.executor.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Preference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preference").field("key", &self.key).finish()
    }
}

impl<T: PreferenceValue> Preference<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns true if the key holds a value.
    pub fn blocking_exists(&self) -> bool {
        self.store.contains(&self.key)
    }

    /// Reads the current value; None when the key is absent.
    pub fn blocking_get(&self) -> Result<Option<T>> {
        T::read_optional(self.store.as_ref(), &self.key)
    }

    /// Reads the current value, or `default` when the key is absent.
    pub fn blocking_get_or(&self, default: T) -> Result<T> {
        T::read(self.store.as_ref(), &self.key, default)
    }

    pub fn blocking_set(&self, value: T) -> Result<()> {
        T::write(self.store.as_ref(), &self.key, value)
    }

    /// Deletes the key. Deleting an absent key succeeds.
    pub fn blocking_remove(&self) -> Result<()> {
        self.store.remove(&self.key)
    }

    /// Streams the value, re-read after every change to the key.
    ///
    /// Yields the current value first, `None` while the key is absent.
    pub fn get(&self) -> QueryStream<Option<T>> {
        let (store, key) = (self.store.clone(), self.key.clone());
        QueryStream::new(self.watch(), self.executor.clone(), move || {
            T::read_optional(store.as_ref(), &key)
        })
    }

    /// Streams the value, falling back to `default` while the key is absent.
    pub fn get_or(&self, default: T) -> QueryStream<T> {
        let (store, key) = (self.store.clone(), self.key.clone());
        QueryStream::new(self.watch(), self.executor.clone(), move || {
            T::read(store.as_ref(), &key, default.clone())
        })
    }

    /// Writes `value`. Completes once the store has applied it.
    pub fn set(&self, value: T) -> TaskHandle<()> {
        let (store, key) = (self.store.clone(), self.key.clone());
        spawn(self.executor.as_ref(), move || T::write(store.as_ref(), &key, value))
    }

    /// Writes `Some(value)`, or removes the key for `None`.
    pub fn set_option(&self, value: Option<T>) -> TaskHandle<()> {
        match value {
            Some(value) => self.set(value),
            None => self.remove(),
        }
    }

    /// Deletes the key. Completes once the store has applied it.
    pub fn remove(&self) -> TaskHandle<()> {
        let (store, key) = (self.store.clone(), self.key.clone());
        spawn(self.executor.as_ref(), move || store.remove(&key))
    }

    /// Resolves to true if the key holds a value.
    pub fn exists(&self) -> TaskHandle<bool> {
        let (store, key) = (self.store.clone(), self.key.clone());
        spawn(self.executor.as_ref(), move || Ok(store.contains(&key)))
    }

    fn watch(&self) -> ChangeStream {
        let hub = self.hub.clone();
        let key = self.key.clone();
        ChangeStream::register(&self.dispatcher, move |trigger| hub.subscribe(&key, trigger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use rxstore_core::{Error, ValueKind};
    use rxstore_reactive::ImmediateExecutor;
    use rxstore_storage::MemoryPreferences;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn make_prefs() -> (Preferences, Arc<MemoryPreferences>, Dispatcher) {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let store = Arc::new(MemoryPreferences::new());
        let prefs = Preferences::with_executor(store.clone(), &dispatcher, Arc::new(ImmediateExecutor));
        (prefs, store, dispatcher)
    }

    async fn next<T: Send + 'static>(stream: &mut QueryStream<T>) -> T {
        timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap()
    }

    #[test]
    fn test_boolean_blocking() {
        let (prefs, _store, _d) = make_prefs();
        let flag = prefs.boolean("bool_key");
        assert_eq!(flag.blocking_get().unwrap(), None);
        assert!(flag.blocking_get_or(true).unwrap());

        flag.blocking_set(false).unwrap();
        assert_eq!(flag.blocking_get().unwrap(), Some(false));
        flag.blocking_set(true).unwrap();
        assert_eq!(flag.blocking_get().unwrap(), Some(true));
    }

    #[test]
    fn test_blocking_every_kind() {
        let (prefs, _store, _d) = make_prefs();

        let int = prefs.int("int_key");
        assert_eq!(int.blocking_get_or(101).unwrap(), 101);
        int.blocking_set(137).unwrap();
        assert_eq!(int.blocking_get().unwrap(), Some(137));

        let long = prefs.long("long_key");
        long.blocking_set(1).unwrap();
        assert_eq!(long.blocking_get_or(201).unwrap(), 1);

        let float = prefs.float("float_key");
        float.blocking_set(2.5).unwrap();
        assert_eq!(float.blocking_get().unwrap(), Some(2.5));

        let string = prefs.string("string_key");
        assert_eq!(string.blocking_get_or("Hi".into()).unwrap(), "Hi");
        string.blocking_set("Hello".into()).unwrap();
        assert_eq!(string.blocking_get().unwrap().as_deref(), Some("Hello"));

        let set = prefs.string_set("set_key");
        let value: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        set.blocking_set(value.clone()).unwrap();
        assert_eq!(set.blocking_get().unwrap(), Some(value));
    }

    #[test]
    fn test_exists_and_remove() {
        let (prefs, _store, _d) = make_prefs();
        let flag = prefs.boolean("flag");
        assert!(!flag.blocking_exists());
        flag.blocking_set(false).unwrap();
        assert!(flag.blocking_exists());
        assert!(futures::executor::block_on(flag.exists()).unwrap());

        flag.blocking_remove().unwrap();
        assert!(!flag.blocking_exists());
        flag.blocking_remove().unwrap();
    }

    #[tokio::test]
    async fn test_absent_versus_false() {
        let (prefs, _store, _d) = make_prefs();
        let flag = prefs.boolean("flag");
        let mut optional = flag.get();
        let mut with_default = flag.get_or(true);
        assert_eq!(next(&mut optional).await, None);
        assert!(next(&mut with_default).await);

        flag.set(false).await.unwrap();
        assert_eq!(next(&mut optional).await, Some(false));
        assert!(!next(&mut with_default).await);
    }

    #[tokio::test]
    async fn test_flag_scenario() {
        let (prefs, _store, _d) = make_prefs();
        let flag = prefs.boolean("flag");
        let mut values = flag.get_or(false);
        assert!(!next(&mut values).await);

        flag.set(true).await.unwrap();
        assert!(next(&mut values).await);

        flag.remove().await.unwrap();
        assert!(!next(&mut values).await);
    }

    #[tokio::test]
    async fn test_int_sequence() {
        let (prefs, _store, _d) = make_prefs();
        let int = prefs.int("int_key");
        let mut values = int.get_or(100);
        assert_eq!(next(&mut values).await, 100);
        for v in [200, 300, 400] {
            int.set(v).await.unwrap();
            assert_eq!(next(&mut values).await, v);
        }
    }

    #[tokio::test]
    async fn test_set_option() {
        let (prefs, _store, _d) = make_prefs();
        let name = prefs.string("name");
        name.set_option(Some("Ada".into())).await.unwrap();
        assert_eq!(name.blocking_get().unwrap().as_deref(), Some("Ada"));
        name.set_option(None).await.unwrap();
        assert_eq!(name.blocking_get().unwrap(), None);
    }

    #[tokio::test]
    async fn test_other_keys_do_not_emit() {
        let (prefs, _store, _d) = make_prefs();
        let mut flag = prefs.boolean("flag").get_or(false);
        next(&mut flag).await;

        prefs.int("count").set(3).await.unwrap();
        assert!(timeout(Duration::from_millis(50), flag.next()).await.is_err());
    }

    #[tokio::test]
    async fn test_type_isolation() {
        let (prefs, _store, _d) = make_prefs();
        let text = prefs.string("shared");
        let number = prefs.int("shared");

        text.set("not a number".into()).await.unwrap();
        assert!(matches!(
            number.blocking_get(),
            Err(Error::TypeMismatch { expected: ValueKind::Int32, got: ValueKind::String, .. })
        ));

        let mut stream = number.get();
        let result = timeout(WAIT, stream.next()).await.unwrap().unwrap();
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
        assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_streams_share_one_native_listener() {
        let (prefs, store, _d) = make_prefs();
        let baseline = store.listener_count();
        let streams: Vec<_> = (0..4).map(|i| prefs.int(format!("k{}", i)).get()).collect();
        assert_eq!(store.listener_count(), baseline + 1);
        assert_eq!(prefs.hub().subscriber_count(), 4);

        drop(streams);
        assert_eq!(store.listener_count(), baseline);
        assert_eq!(prefs.hub().subscriber_count(), 0);
    }
}
