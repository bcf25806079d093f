//! # Binding Adapter
//!
//! [`QueryBinding`] is the thin piece that ties a consumer (a UI component, a
//! request handler, a CLI view) to one key of a [`QueryStore`]. It decides when to
//! invoke; the store does everything else.
//!
//! The rule is the one from [`QueryState::needs_fetch`]: invoke when the key is first
//! observed, whenever its record is `idle`, and whenever it is `loading` with no producer
//! call outstanding.

use crate::error::{QueryError, QueryResult};
use crate::key::QueryKey;
use crate::producer::Producer;
use crate::state::QueryState;
use crate::store::{Invocation, QueryEvent, QueryStore};
use tokio::sync::broadcast::{self, error::RecvError};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Subscription of one consumer to one query key
pub struct QueryBinding<T, E> {
    store: QueryStore<T, E>,
    key: QueryKey,
    producer: Producer<T, E>,
    events: broadcast::Receiver<QueryEvent<T, E>>,
}

impl<T, E> QueryBinding<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Bind to `key`; nothing is invoked until [`QueryBinding::mount`]
    pub fn new<K: Into<QueryKey>>(store: QueryStore<T, E>, key: K, producer: Producer<T, E>) -> Self {
        let events = store.subscribe();
        Self {
            store,
            key: key.into(),
            producer,
            events,
        }
    }

    /// Key currently bound
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current record for the bound key
    pub fn state(&self) -> QueryResult<QueryState<T, E>> {
        self.store.state(&self.key)
    }

    /// Invoke if the current record needs a fetch
    ///
    /// Returns `None` when the record is already fetching or settled.
    pub fn mount(&self) -> QueryResult<Option<Invocation>> {
        let state = self.state()?;
        if !state.needs_fetch() {
            return Ok(None);
        }

        #[cfg(feature = "tracing")]
        debug!(key = %self.key, status = %state.status, "Binding invoking producer");

        self.store
            .invoke(self.key.clone(), self.producer.clone())
            .map(Some)
    }

    /// Switch to another key (and its producer), then apply the mount rule
    pub fn set_key<K: Into<QueryKey>>(
        &mut self,
        key: K,
        producer: Producer<T, E>,
    ) -> QueryResult<Option<Invocation>> {
        self.key = key.into();
        self.producer = producer;
        self.mount()
    }

    /// Replace the producer used by future invocations from this binding
    ///
    /// Does not invoke; records keep replaying their previously bound producer
    /// through their own refetch handle until the next invocation.
    pub fn set_producer(&mut self, producer: Producer<T, E>) {
        self.producer = producer;
    }

    /// Invoke unconditionally (subject to deduplication)
    pub fn refetch(&self) -> QueryResult<Invocation> {
        self.store.invoke(self.key.clone(), self.producer.clone())
    }

    /// Wait for the next change of the bound key and re-apply the mount rule
    ///
    /// Events of other keys are skipped. A subscriber that fell behind resumes from
    /// the current record instead of the missed events.
    pub async fn changed(&mut self) -> QueryResult<QueryState<T, E>> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.key == self.key => {
                    if event.state.needs_fetch() {
                        self.mount()?;
                    }
                    return Ok(event.state);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(_skipped)) => {
                    #[cfg(feature = "tracing")]
                    warn!(key = %self.key, skipped = _skipped, "Binding lagged behind store events");

                    let state = self.state()?;
                    if state.needs_fetch() {
                        self.mount()?;
                    }
                    return Ok(state);
                }
                Err(RecvError::Closed) => {
                    return Err(QueryError::detached(format!(
                        "Store for key '{}' is gone",
                        self.key
                    )));
                }
            }
        }
    }
}
