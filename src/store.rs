//! # Query Store Engine
//!
//! [`QueryStore`] owns the mapping from [`QueryKey`] to [`QueryState`] and is the only
//! thing that mutates it. Callers read snapshots, subscribe to change events, and call
//! [`QueryStore::invoke`].
//!
//! ## 🔄 Invocation Protocol
//!
//! 1. **Claim** (synchronous, inside `invoke`): if the key's record is fetching, the call
//!    is deduplicated and returns without touching state or calling the producer.
//!    Otherwise the record moves to `loading` with `is_fetching = true` and its refetch
//!    handle is rebound to the new producer.
//! 2. **Cache read** (first invocation of a key only): a cached value is published as an
//!    interim `success`, then the record returns to `loading` with the cached data kept.
//! 3. **Resolution**: the producer's `Ok` value is written through to the cache, then
//!    becomes `data`; an `Err` becomes `error` and leaves the cache untouched. The key
//!    stays fetching until the write-through returns.
//!
//! Steps 2 and 3 run on a spawned tokio task. Because the claim is synchronous, at most
//! one producer call is outstanding per key no matter how many callers race.
//!
//! ## 📡 Observing State
//!
//! Every mutation replaces the record in a copy-on-write map and broadcasts a
//! [`QueryEvent`] holding the new record and the full store snapshot. Events for one key
//! are sent in mutation order; events of different keys interleave freely.
//!
//! ## ⚠️ Known Limitation
//!
//! A producer that never resolves keeps its key fetching forever, and every later
//! `invoke` for that key is deduplicated against it. There is no cancellation or timeout.

use crate::cache::{self, CachePlugin, CacheValue, registry::PluginRegistry};
use crate::error::{QueryError, QueryResult};
use crate::key::QueryKey;
use crate::producer::Producer;
use crate::state::{QueryState, QueryStatus};
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock, RwLockWriteGuard, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument, warn};

/// Immutable view of every record in a store
pub type Snapshot<T, E> = Arc<HashMap<QueryKey, QueryState<T, E>>>;

/// Default capacity of the change event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Published after every state mutation
#[derive(Clone)]
pub struct QueryEvent<T, E> {
    /// Key whose record changed
    pub key: QueryKey,
    /// The new record
    pub state: QueryState<T, E>,
    /// The whole store right after the change
    pub snapshot: Snapshot<T, E>,
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for QueryEvent<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryEvent")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("snapshot_len", &self.snapshot.len())
            .finish()
    }
}

/// Outcome of an `invoke` call
///
/// Dropping an `Invocation` does not cancel anything; the producer keeps running
/// and its result still lands in the store.
#[derive(Debug)]
pub enum Invocation {
    /// A producer call was already outstanding, nothing was started
    Deduplicated,
    /// A producer call was started on this task
    Started(JoinHandle<QueryResult<()>>),
}

impl Invocation {
    /// Whether this call was suppressed by deduplication
    pub fn is_deduplicated(&self) -> bool {
        matches!(self, Invocation::Deduplicated)
    }

    /// Wait for the invocation to finish
    ///
    /// Returns `Ok(())` once the record reached its terminal state, including when the
    /// producer failed. Errors are reserved for cache plugin failures and panics.
    pub async fn wait(self) -> QueryResult<()> {
        match self {
            Invocation::Deduplicated => Ok(()),
            Invocation::Started(handle) => handle
                .await
                .map_err(|e| QueryError::generic(format!("Invocation task failed: {e}")))?,
        }
    }
}

/// Handle that re-invokes a key with the producer last bound to it
///
/// Holds only a weak reference to its store, so a handle kept around after the store
/// is dropped reports [`QueryError::Detached`] instead of keeping the store alive.
pub struct Refetch<T, E> {
    key: QueryKey,
    producer: Option<Producer<T, E>>,
    store: Weak<Inner<T, E>>,
}

impl<T, E> Refetch<T, E> {
    pub(crate) fn unbound(key: QueryKey) -> Self {
        Self {
            key,
            producer: None,
            store: Weak::new(),
        }
    }

    /// Key this handle invokes
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Whether a producer is bound
    pub fn is_bound(&self) -> bool {
        self.producer.is_some()
    }
}

impl<T, E> Refetch<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Invoke the key again, subject to the usual deduplication
    pub fn call(&self) -> QueryResult<Invocation> {
        let inner = self.store.upgrade().ok_or_else(|| {
            QueryError::detached(format!(
                "Refetch for key '{}' used after its store was dropped",
                self.key
            ))
        })?;
        let producer = self.producer.clone().ok_or_else(|| {
            QueryError::no_producer(format!(
                "Key '{}' has never been invoked, there is nothing to refetch",
                self.key
            ))
        })?;

        inner.invoke(self.key.clone(), producer)
    }
}

impl<T, E> Clone for Refetch<T, E> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            producer: self.producer.clone(),
            store: Weak::clone(&self.store),
        }
    }
}

impl<T, E> fmt::Debug for Refetch<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refetch")
            .field("key", &self.key)
            .field("bound", &self.is_bound())
            .finish()
    }
}

struct Inner<T, E> {
    records: RwLock<Snapshot<T, E>>,
    cache: Option<Arc<dyn CachePlugin>>,
    events: broadcast::Sender<QueryEvent<T, E>>,
}

impl<T, E> Inner<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn read(&self) -> QueryResult<Snapshot<T, E>> {
        self.records
            .read()
            .map(|records| Arc::clone(&records))
            .map_err(|_| QueryError::lock("Failed to acquire read lock on query store"))
    }

    fn write(&self) -> QueryResult<RwLockWriteGuard<'_, Snapshot<T, E>>> {
        self.records
            .write()
            .map_err(|_| QueryError::lock("Failed to acquire write lock on query store"))
    }

    fn default_state(self: &Arc<Self>, key: QueryKey) -> QueryState<T, E> {
        QueryState::idle(Refetch {
            key,
            producer: None,
            store: Arc::downgrade(self),
        })
    }

    /// Replace the record for `key` and broadcast the change
    ///
    /// Runs under the write lock so events for a key go out in mutation order.
    fn publish(
        &self,
        records: &mut RwLockWriteGuard<'_, Snapshot<T, E>>,
        key: &QueryKey,
        state: QueryState<T, E>,
    ) {
        Arc::make_mut(&mut **records).insert(key.clone(), state.clone());
        let snapshot = Arc::clone(&**records);

        // No receivers is fine
        let _ = self.events.send(QueryEvent {
            key: key.clone(),
            state,
            snapshot,
        });
    }

    fn update<F>(self: &Arc<Self>, key: &QueryKey, apply: F) -> QueryResult<()>
    where
        F: FnOnce(&mut QueryState<T, E>),
    {
        let mut records = self.write()?;
        let mut state = records
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.default_state(key.clone()));
        apply(&mut state);
        self.publish(&mut records, key, state);
        Ok(())
    }

    /// Mark the key as fetching unless it already is
    ///
    /// Returns `None` when deduplicated, otherwise whether the key had no record yet.
    fn claim(self: &Arc<Self>, key: &QueryKey, producer: &Producer<T, E>) -> QueryResult<Option<bool>> {
        let mut records = self.write()?;

        let (mut state, first) = match records.get(key) {
            Some(existing) if existing.is_fetching => return Ok(None),
            Some(existing) => (existing.clone(), false),
            None => (self.default_state(key.clone()), true),
        };

        state.status = QueryStatus::Loading;
        state.is_fetching = true;
        state.fetch_count += 1;
        state.refetch = Refetch {
            key: key.clone(),
            producer: Some(producer.clone()),
            store: Arc::downgrade(self),
        };

        self.publish(&mut records, key, state);
        Ok(Some(first))
    }

    /// Leave the record loading but no longer fetching so it can be invoked again
    fn release(self: &Arc<Self>, key: &QueryKey) -> QueryResult<()> {
        self.update(key, |state| state.is_fetching = false)
    }

    fn invoke(self: &Arc<Self>, key: QueryKey, producer: Producer<T, E>) -> QueryResult<Invocation> {
        if key.is_empty() {
            return Err(QueryError::invalid_key("Query keys must not be empty"));
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            QueryError::no_runtime(format!(
                "invoke('{key}') must be called from within a tokio runtime"
            ))
        })?;

        let Some(first) = self.claim(&key, &producer)? else {
            #[cfg(feature = "tracing")]
            debug!(key = %key, "Invocation deduplicated, producer already in flight");

            return Ok(Invocation::Deduplicated);
        };

        #[cfg(feature = "tracing")]
        debug!(key = %key, first, "Claimed key, starting invocation");

        let inner = Arc::clone(self);
        let handle = runtime.spawn(async move { inner.run(key, producer, first).await });
        Ok(Invocation::Started(handle))
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, producer, key), fields(key = %key)))]
    async fn run(self: Arc<Self>, key: QueryKey, producer: Producer<T, E>, first: bool) -> QueryResult<()> {
        if first {
            if let Some(cache) = &self.cache {
                self.hydrate_from_cache(cache.as_ref(), &key).await?;
            }
        }

        // The closure itself may panic before handing back a future
        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| producer.call())) {
            Ok(fetch) => AssertUnwindSafe(fetch).catch_unwind().await,
            Err(panic) => Err(panic),
        };

        match outcome {
            Ok(Ok(data)) => {
                #[cfg(feature = "tracing")]
                info!("Producer resolved");

                // Write through while the key is still claimed, so a later fetch
                // cannot be overwritten in the cache by this one
                let written = match &self.cache {
                    Some(cache) => {
                        let value: CacheValue = Arc::new(data.clone());
                        cache.set(key.as_str(), value).await.inspect_err(|_e| {
                            #[cfg(feature = "tracing")]
                            warn!(error = %_e, "Cache write-through failed");
                        })
                    }
                    None => Ok(()),
                };

                self.update(&key, |state| state.resolve_success(data))?;
                written.map_err(QueryError::from)
            }
            Ok(Err(error)) => {
                #[cfg(feature = "tracing")]
                info!("Producer failed");

                self.update(&key, |state| state.resolve_error(error))
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                warn!("Producer panicked, releasing key");

                self.release(&key)?;
                Err(QueryError::generic(format!(
                    "Producer for key '{key}' panicked"
                )))
            }
        }
    }

    async fn hydrate_from_cache(self: &Arc<Self>, cache: &dyn CachePlugin, key: &QueryKey) -> QueryResult<()> {
        let cached = match cache.get(key.as_str()).await {
            Ok(Some(value)) => cache::downcast_value::<T>(key.as_str(), &value),
            Ok(None) => {
                #[cfg(feature = "tracing")]
                debug!("Cache miss");
                return Ok(());
            }
            Err(e) => Err(e),
        };

        match cached {
            Ok(data) => {
                #[cfg(feature = "tracing")]
                debug!("Cache hit, publishing interim success");

                self.update(key, |state| {
                    state.status = QueryStatus::Success;
                    state.data = Some(data);
                    state.error = None;
                })?;
                self.update(key, |state| state.status = QueryStatus::Loading)
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                warn!(error = %e, "Cache read failed, releasing key");

                self.release(key)?;
                Err(e.into())
            }
        }
    }
}

/// The query engine
///
/// Cloning a `QueryStore` yields another handle to the same records, cache and
/// event channel.
///
/// ```rust
/// use querent::{Producer, QueryStore};
///
/// #[tokio::main]
/// async fn main() -> querent::QueryResult<()> {
///     let store: QueryStore<String, String> = QueryStore::new();
///     let producer = Producer::new(|| async { Ok("hello".to_string()) });
///
///     store.invoke("greeting", producer)?.wait().await?;
///     assert_eq!(store.state("greeting")?.data.as_deref(), Some("hello"));
///     Ok(())
/// }
/// ```
pub struct QueryStore<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> QueryStore<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a store without a cache plugin
    pub fn new() -> Self {
        Self::from_parts(None, DEFAULT_EVENT_CAPACITY)
    }

    /// Start configuring a store
    pub fn builder() -> QueryStoreBuilder<T, E> {
        QueryStoreBuilder::new()
    }

    fn from_parts(cache: Option<Arc<dyn CachePlugin>>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            inner: Arc::new(Inner {
                records: RwLock::new(Arc::new(HashMap::new())),
                cache,
                events,
            }),
        }
    }

    /// Invoke `producer` for `key` unless a call for `key` is already in flight
    ///
    /// Returns immediately; the result is observed through [`QueryStore::state`],
    /// [`QueryStore::subscribe`] or by awaiting [`Invocation::wait`].
    pub fn invoke<K: Into<QueryKey>>(&self, key: K, producer: Producer<T, E>) -> QueryResult<Invocation> {
        self.inner.invoke(key.into(), producer)
    }

    /// Invoke with an async closure, see [`QueryStore::invoke`]
    pub fn invoke_with<K, F, Fut>(&self, key: K, f: F) -> QueryResult<Invocation>
    where
        K: Into<QueryKey>,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.invoke(key, Producer::new(f))
    }

    /// Current record for `key`, or the default idle record if it was never invoked
    pub fn state<K: Into<QueryKey>>(&self, key: K) -> QueryResult<QueryState<T, E>> {
        let key = key.into();
        let records = self.inner.read()?;
        Ok(records
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.inner.default_state(key)))
    }

    /// Immutable view of every record
    pub fn snapshot(&self) -> QueryResult<Snapshot<T, E>> {
        self.inner.read()
    }

    /// Receive an event for every future state change
    pub fn subscribe(&self) -> broadcast::Receiver<QueryEvent<T, E>> {
        self.inner.events.subscribe()
    }

    /// Keys that have been invoked at least once
    pub fn keys(&self) -> QueryResult<Vec<QueryKey>> {
        Ok(self.inner.read()?.keys().cloned().collect())
    }

    /// Number of records
    pub fn len(&self) -> QueryResult<usize> {
        Ok(self.inner.read()?.len())
    }

    /// Whether no key has been invoked yet
    pub fn is_empty(&self) -> QueryResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// The configured cache plugin, for external cache management
    pub fn cache(&self) -> Option<Arc<dyn CachePlugin>> {
        self.inner.cache.clone()
    }
}

impl<T, E> Default for QueryStore<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for QueryStore<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Builder for [`QueryStore`]
pub struct QueryStoreBuilder<T, E> {
    cache: Option<Arc<dyn CachePlugin>>,
    event_capacity: usize,
    _types: PhantomData<fn() -> (T, E)>,
}

impl<T, E> QueryStoreBuilder<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            cache: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            _types: PhantomData,
        }
    }

    /// Use `plugin` as the side cache
    pub fn cache(mut self, plugin: Arc<dyn CachePlugin>) -> Self {
        self.cache = Some(plugin);
        self
    }

    /// Use a fresh plugin created from the factory registered as `name`
    pub fn cache_from_registry(self, registry: &PluginRegistry, name: &str) -> QueryResult<Self> {
        let plugin = registry.create(name)?;
        Ok(self.cache(plugin))
    }

    /// Capacity of the change event channel
    ///
    /// Subscribers that fall further behind than this skip the oldest events.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn build(self) -> QueryResult<QueryStore<T, E>> {
        if self.event_capacity == 0 {
            return Err(QueryError::configuration(
                "Event channel capacity must be greater than zero",
            ));
        }

        Ok(QueryStore::from_parts(self.cache, self.event_capacity))
    }
}

impl<T, E> Default for QueryStoreBuilder<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
