//! # Querent: In-Process Async Query Cache
//!
//! Querent tracks the lifecycle of named asynchronous operations ("queries"),
//! deduplicates concurrent invocations of the same query, and optionally keeps
//! successful results in a pluggable cache.
//!
//! ## 🚀 Quick Start
//!
//! Create a [`QueryStore`], wrap your async fetch in a [`Producer`], and call
//! [`QueryStore::invoke`] with a key. Read the outcome with [`QueryStore::state`] or
//! follow every change through [`QueryStore::subscribe`].
//!
//! ```rust
//! use querent::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> QueryResult<()> {
//!     let store: QueryStore<String, String> = QueryStore::new();
//!
//!     let user = store.invoke_with("user:1", || async { Ok("Ada".to_string()) })?;
//!     // A second call while the first is in flight starts nothing
//!     assert!(store.invoke_with("user:1", || async { Ok("Ada".to_string()) })?.is_deduplicated());
//!
//!     user.wait().await?;
//!     let state = store.state("user:1")?;
//!     assert_eq!(state.status, QueryStatus::Success);
//!     assert_eq!(state.data.as_deref(), Some("Ada"));
//!     Ok(())
//! }
//! ```
//!
//! ## 🎯 Core Concepts
//!
//! ### Query State
//!
//! Each key owns a [`QueryState`]: `idle → loading → success | error`, plus an
//! `is_fetching` flag that is independent of the status. Previous data or errors stay
//! visible while a refetch is loading.
//!
//! ### Deduplication
//!
//! At most one producer call is outstanding per key. Extra `invoke` calls made while one
//! is running are dropped, not queued.
//!
//! ### Cache Plugins
//!
//! A [`CachePlugin`] is consulted before the first invocation of a key and written after
//! every success. [`MemoryCache`] is included; [`PluginRegistry`] maps names to plugin
//! factories.
//!
//! ## 📚 Module Overview
//!
//! - **[`store`]**: the [`QueryStore`] engine, [`Invocation`] and [`Refetch`] handles
//! - **[`state`]**: [`QueryState`] and [`QueryStatus`]
//! - **[`cache`]**: the [`CachePlugin`] contract, [`MemoryCache`], [`PluginRegistry`]
//! - **[`binding`]**: [`QueryBinding`], a subscription-driven invoke adapter
//! - **[`poller`]**: [`Poller`] for interval and cron based background refetching
//! - **[`error`]**: [`QueryError`] and [`QueryResult`]
//!
//! ## 🔍 Tracing
//!
//! Enable the `tracing` feature to get `tracing` events and spans for claims,
//! deduplication, cache hits and misses, resolutions and poller activity.

pub mod binding;
pub mod cache;
pub mod error;
pub mod key;
pub mod poller;
pub mod producer;
pub mod state;
pub mod store;


pub use binding::QueryBinding;
pub use cache::{CacheError, CachePlugin, CachePluginExt, CacheValue, MemoryCache, PluginRegistry};
pub use error::{QueryError, QueryResult};
pub use key::QueryKey;
pub use poller::{PollInfo, PollSchedule, Poller};
pub use producer::Producer;
pub use state::{QueryState, QueryStatus};
pub use store::{Invocation, QueryEvent, QueryStore, QueryStoreBuilder, Refetch, Snapshot};

pub mod prelude {
    //! Simplified imports for common usage patterns
    //!
    //! Use `use querent::prelude::*;` to import the most commonly used types and traits.

    pub use crate::{
        CachePlugin, CachePluginExt, Invocation, MemoryCache, PluginRegistry, Poller, Producer,
        QueryBinding, QueryError, QueryKey, QueryResult, QueryState, QueryStatus, QueryStore,
    };

    // Re-export async_trait for custom cache plugins
    pub use async_trait::async_trait;
}
