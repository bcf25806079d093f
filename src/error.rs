//! # Error Handling
//!
//! This module defines the errors the query engine itself can raise.
//!
//! ## 🎯 What Is (and Isn't) an Error
//!
//! A producer that fails is **not** an engine error. Its failure value is captured
//! verbatim in [`crate::QueryState::error`] and the key moves to the `error` status.
//! The engine only returns a [`QueryError`] for:
//!
//! - **Usage errors**: invoking with an empty key, invoking outside a tokio runtime,
//!   calling a refetch handle whose store is gone, or refetching a key that never had
//!   a producer. These are programmer mistakes and are reported immediately.
//! - **Cache plugin failures**: surfaced through [`crate::Invocation::wait`], never
//!   turned into a query state.
//!
//! ## 📊 Error Categories
//!
//! | Error Type | When It Occurs | How to Fix |
//! |------------|----------------|------------|
//! | `InvalidKey` | `invoke` with an empty key | Derive keys from a stable, non-empty id |
//! | `NoRuntime` | `invoke` outside a tokio runtime | Call from within `#[tokio::main]` or a runtime handle |
//! | `Detached` | Refetch handle outlived its store | Keep the `QueryStore` alive while refetching |
//! | `NoProducer` | Refetch on a never-invoked key | Call `invoke` with a producer first |
//! | `Cache` | A cache plugin failed | Check the plugin backend |
//! | `Lock` | Internal lock poisoned | A thread panicked while mutating the store |
//! | `Configuration` | Invalid builder or poller setup | Check the supplied settings |
//! | `Generic` | Anything else | Check the message |

use crate::cache::error::CacheError;

/// Error type for query engine operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The query key is empty
    InvalidKey(String),

    /// `invoke` was called without a tokio runtime to drive the producer
    NoRuntime(String),

    /// A refetch handle was used after its store was dropped
    Detached(String),

    /// A refetch handle has no producer bound to it
    NoProducer(String),

    /// A cache plugin operation failed
    Cache(String),

    /// An internal lock was poisoned
    Lock(String),

    /// Invalid store, binding or poller configuration
    Configuration(String),

    /// General-purpose error
    Generic(String),
}

impl QueryError {
    /// Create a new invalid key error
    pub fn invalid_key<S: Into<String>>(msg: S) -> Self {
        QueryError::InvalidKey(msg.into())
    }

    /// Create a new missing runtime error
    pub fn no_runtime<S: Into<String>>(msg: S) -> Self {
        QueryError::NoRuntime(msg.into())
    }

    /// Create a new detached handle error
    pub fn detached<S: Into<String>>(msg: S) -> Self {
        QueryError::Detached(msg.into())
    }

    /// Create a new missing producer error
    pub fn no_producer<S: Into<String>>(msg: S) -> Self {
        QueryError::NoProducer(msg.into())
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(msg: S) -> Self {
        QueryError::Cache(msg.into())
    }

    /// Create a new lock error
    pub fn lock<S: Into<String>>(msg: S) -> Self {
        QueryError::Lock(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        QueryError::Configuration(msg.into())
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        QueryError::Generic(msg.into())
    }

    /// Get the error message as a string slice
    pub fn message(&self) -> &str {
        match self {
            QueryError::InvalidKey(msg) => msg,
            QueryError::NoRuntime(msg) => msg,
            QueryError::Detached(msg) => msg,
            QueryError::NoProducer(msg) => msg,
            QueryError::Cache(msg) => msg,
            QueryError::Lock(msg) => msg,
            QueryError::Configuration(msg) => msg,
            QueryError::Generic(msg) => msg,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            QueryError::InvalidKey(_) => "invalid_key",
            QueryError::NoRuntime(_) => "no_runtime",
            QueryError::Detached(_) => "detached",
            QueryError::NoProducer(_) => "no_producer",
            QueryError::Cache(_) => "cache",
            QueryError::Lock(_) => "lock",
            QueryError::Configuration(_) => "configuration",
            QueryError::Generic(_) => "generic",
        }
    }

    /// Whether this error is a programmer usage error rather than a runtime failure
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidKey(_)
                | QueryError::NoRuntime(_)
                | QueryError::Detached(_)
                | QueryError::NoProducer(_)
        )
    }
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidKey(msg) => write!(f, "Invalid query key: {msg}"),
            QueryError::NoRuntime(msg) => write!(f, "No async runtime: {msg}"),
            QueryError::Detached(msg) => write!(f, "Detached handle: {msg}"),
            QueryError::NoProducer(msg) => write!(f, "No producer: {msg}"),
            QueryError::Cache(msg) => write!(f, "Cache error: {msg}"),
            QueryError::Lock(msg) => write!(f, "Lock error: {msg}"),
            QueryError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            QueryError::Generic(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<CacheError> for QueryError {
    fn from(err: CacheError) -> Self {
        QueryError::cache(err.to_string())
    }
}

impl From<&str> for QueryError {
    fn from(err: &str) -> Self {
        QueryError::Generic(err.to_string())
    }
}

impl From<String> for QueryError {
    fn from(err: String) -> Self {
        QueryError::Generic(err)
    }
}

/// Convenient Result type alias for query engine operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = QueryError::invalid_key("key must not be empty");
        assert_eq!(error.message(), "key must not be empty");
        assert_eq!(error.category(), "invalid_key");
        assert!(error.is_usage_error());
    }

    #[test]
    fn test_error_display() {
        let error = QueryError::Detached("store dropped".to_string());
        assert_eq!(format!("{error}"), "Detached handle: store dropped");
    }

    #[test]
    fn test_error_conversions() {
        let error1: QueryError = "boom".into();
        let error2: QueryError = "boom".to_string().into();
        assert_eq!(error1, error2);
        assert_eq!(error1.category(), "generic");
    }

    #[test]
    fn test_cache_error_conversion() {
        let cache_error = CacheError::type_mismatch("user:1");
        let error: QueryError = cache_error.into();

        match &error {
            QueryError::Cache(msg) => {
                assert!(msg.contains("user:1"));
                assert!(msg.contains("unexpected type"));
            }
            _ => panic!("Expected cache error variant"),
        }
        assert!(!error.is_usage_error());
    }
}
