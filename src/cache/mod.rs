//! # Cache Plugins
//!
//! A cache plugin is an external key-value store the query engine consults around
//! producer invocations:
//!
//! - **Before** the first invocation of a key, a cached value (if any) is published as an
//!   interim `success` so consumers can render something while the live fetch runs.
//! - **After** every successful invocation, the fresh value is written through.
//!
//! The engine never deletes entries and never expires them. Consistency and expiry are
//! the plugin's own business. `delete` is part of the contract so that external code
//! can manage the cache through the same handle.
//!
//! ## 🔧 Available Plugins
//!
//! ### MemoryCache (Included)
//!
//! A thread-safe `HashMap` behind `Arc<RwLock<_>>`. Clones share storage.
//!
//! ### Custom Plugins
//!
//! Implement [`CachePlugin`] for any backend. Values cross the trait boundary
//! type-erased as [`CacheValue`] so a single plugin object can serve stores of
//! different value types. [`CachePluginExt`] adds typed accessors on top.
//!
//! ### Registry
//!
//! [`PluginRegistry`] maps plugin names to factories. Plugins are registered
//! explicitly at startup; nothing is discovered at runtime.

pub mod error;
pub mod memory;
pub mod registry;

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Type-erased cached value
pub type CacheValue = Arc<dyn Any + Send + Sync>;

/// Type alias for cache operation results
pub type CacheResult<T> = Result<T, error::CacheError>;

/// Capability contract for cache backends
///
/// Implementations must be safe to call concurrently for different keys; the engine
/// performs no locking around plugin calls.
///
/// | Method | Purpose |
/// |--------|---------|
/// | `get` | Look up a value, `None` when absent |
/// | `set` | Store or replace a value |
/// | `delete` | Remove a value, absent keys are not an error |
#[async_trait]
pub trait CachePlugin: Send + Sync {
    /// Look up the value stored under `key`
    async fn get(&self, key: &str) -> CacheResult<Option<CacheValue>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: CacheValue) -> CacheResult<()>;

    /// Remove the value stored under `key`
    async fn delete(&self, key: &str) -> CacheResult<()>;
}

/// Typed helpers for any [`CachePlugin`]
#[async_trait]
pub trait CachePluginExt: CachePlugin {
    /// Get a value and downcast it to `T`
    ///
    /// Returns `Ok(None)` for a missing key and [`error::CacheError::TypeMismatch`]
    /// when the stored value is not a `T`.
    async fn get_as<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.get(key).await? {
            Some(value) => downcast_value(key, &value).map(Some),
            None => Ok(None),
        }
    }

    /// Store a typed value
    async fn set_as<T>(&self, key: &str, value: T) -> CacheResult<()>
    where
        T: Send + Sync + 'static,
    {
        self.set(key, Arc::new(value)).await
    }
}

impl<P: CachePlugin + ?Sized> CachePluginExt for P {}

/// Clone the concrete `T` out of a type-erased cache value
pub(crate) fn downcast_value<T>(key: &str, value: &CacheValue) -> CacheResult<T>
where
    T: Clone + 'static,
{
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| error::CacheError::type_mismatch(key))
}

pub use error::CacheError;
pub use memory::MemoryCache;
pub use registry::{PluginFactory, PluginRegistry};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_typed_helpers_round_trip_through_plugin_object() {
        let plugin: Arc<dyn CachePlugin> = Arc::new(MemoryCache::new());

        plugin.set_as("count", 7u32).await.unwrap();
        assert_eq!(plugin.get_as::<u32>("count").await.unwrap(), Some(7));
        assert_eq!(plugin.get_as::<u32>("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_typed_get_reports_type_mismatch() {
        let plugin = MemoryCache::new();
        plugin.set_as("name", "ada".to_string()).await.unwrap();

        let result = plugin.get_as::<u64>("name").await;
        assert_eq!(result, Err(CacheError::type_mismatch("name")));
    }
}
