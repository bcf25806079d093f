//! Static registry of cache plugin factories.

use super::{CachePlugin, CacheResult, error::CacheError, memory::MemoryCache};
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor for a cache plugin instance
pub type PluginFactory = Arc<dyn Fn() -> Arc<dyn CachePlugin> + Send + Sync>;

/// Name → factory mapping for cache plugins
///
/// Plugins are registered with explicit `register` calls at startup, so the set of
/// available backends is visible in code. A store picks one by name through
/// [`crate::QueryStoreBuilder::cache_from_registry`].
#[derive(Default, Clone)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the built-in plugins registered
    ///
    /// Currently that is `"memory"` → [`MemoryCache`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            "memory".to_string(),
            Arc::new(|| Arc::new(MemoryCache::new()) as Arc<dyn CachePlugin>),
        );
        registry
    }

    /// Register a factory under `name`
    pub fn register<F>(&mut self, name: &str, factory: F) -> CacheResult<()>
    where
        F: Fn() -> Arc<dyn CachePlugin> + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(CacheError::already_registered(name));
        }

        self.factories.insert(name.to_string(), Arc::new(factory));
        Ok(())
    }

    /// Build a new plugin instance from the factory registered under `name`
    pub fn create(&self, name: &str) -> CacheResult<Arc<dyn CachePlugin>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| CacheError::unknown_plugin(name))
    }

    /// Whether a factory is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered plugin names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}
