//! # Cache Error Types
//!
//! Errors raised by cache plugins and by the plugin registry.

use std::fmt;

/// Error type for cache plugin operations
///
/// ## Error Categories
///
/// - `TypeMismatch`: A cached value can't be cast to the requested type
/// - `LockError`: Failed to acquire a lock inside the plugin
/// - `UnknownPlugin`: No factory registered under the requested name
/// - `AlreadyRegistered`: A factory with the same name already exists
/// - `Backend`: Any other failure reported by a plugin backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Cached value has a different type than the one requested
    ///
    /// Usually means two query stores with different value types share a cache
    /// and use overlapping keys.
    TypeMismatch(String),

    /// Failed to acquire a lock on plugin storage
    LockError(String),

    /// The registry has no plugin with this name
    UnknownPlugin(String),

    /// The registry already has a plugin with this name
    AlreadyRegistered(String),

    /// Backend specific failure
    Backend(String),
}

impl CacheError {
    /// Create a new type mismatch error for a key
    pub fn type_mismatch<S: Into<String>>(key: S) -> Self {
        CacheError::TypeMismatch(format!(
            "Cached value for key '{}' has an unexpected type",
            key.into()
        ))
    }

    /// Create a new lock error
    pub fn lock_error<S: Into<String>>(msg: S) -> Self {
        CacheError::LockError(msg.into())
    }

    /// Create a new unknown plugin error
    pub fn unknown_plugin<S: Into<String>>(name: S) -> Self {
        CacheError::UnknownPlugin(format!("No cache plugin registered as '{}'", name.into()))
    }

    /// Create a new duplicate registration error
    pub fn already_registered<S: Into<String>>(name: S) -> Self {
        CacheError::AlreadyRegistered(format!(
            "Cache plugin '{}' is already registered",
            name.into()
        ))
    }

    /// Create a new backend error
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        CacheError::Backend(msg.into())
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::TypeMismatch(msg) => write!(f, "Type mismatch: {msg}"),
            CacheError::LockError(msg) => write!(f, "Lock error: {msg}"),
            CacheError::UnknownPlugin(msg) => write!(f, "Unknown plugin: {msg}"),
            CacheError::AlreadyRegistered(msg) => write!(f, "Already registered: {msg}"),
            CacheError::Backend(msg) => write!(f, "Backend error: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}
