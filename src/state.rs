//! # Query State Model
//!
//! Every key in a [`crate::QueryStore`] owns one [`QueryState`] record. Records move
//! through a small state machine:
//!
//! ```text
//!   idle ──invoke──▶ loading ──Ok──▶ success ─┐
//!                       │                     │
//!                       └──Err──▶ error ──────┤
//!                       ▲                     │
//!                       └──────invoke─────────┘
//! ```
//!
//! `status` and `is_fetching` are tracked separately: a key can show `success` from a
//! previous run while a refetch is underway. When a new invocation starts, the previous
//! `data` or `error` stays on the record until the new result replaces it.
//!
//! `data` and `error` are never populated at the same time.

use crate::key::QueryKey;
use crate::store::Refetch;
use chrono::{DateTime, Utc};
use std::fmt;

/// Lifecycle status of a query key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryStatus {
    /// Never invoked
    #[default]
    Idle,
    /// An invocation started and has not resolved yet
    Loading,
    /// The last resolved invocation produced a value
    Success,
    /// The last resolved invocation failed
    Error,
}

impl QueryStatus {
    /// Whether the status is `success` or `error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryStatus::Success | QueryStatus::Error)
    }

    /// Lowercase name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Idle => "idle",
            QueryStatus::Loading => "loading",
            QueryStatus::Success => "success",
            QueryStatus::Error => "error",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one query key
///
/// Records handed out by the store are immutable copies; changing one has no
/// effect on the store.
#[derive(Clone)]
pub struct QueryState<T, E> {
    /// Current lifecycle status
    pub status: QueryStatus,
    /// Value of the last successful invocation (or cache hit)
    pub data: Option<T>,
    /// Failure of the last failed invocation
    pub error: Option<E>,
    /// Whether a producer call is outstanding for this key
    pub is_fetching: bool,
    /// When the last producer call resolved
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of producer calls started for this key
    pub fetch_count: u64,
    /// Replays the producer last associated with this key
    pub refetch: Refetch<T, E>,
}

impl<T, E> QueryState<T, E> {
    pub(crate) fn idle(refetch: Refetch<T, E>) -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            updated_at: None,
            fetch_count: 0,
            refetch,
        }
    }

    /// The key this record belongs to
    pub fn key(&self) -> &QueryKey {
        self.refetch.key()
    }

    pub fn is_idle(&self) -> bool {
        self.status == QueryStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Whether a binding should invoke the producer for this record
    ///
    /// True for `idle`, and for `loading` with no producer call outstanding. The
    /// latter happens when an invocation was abandoned before it could resolve
    /// (cache read failure, panicking producer) and must be treated as re-fetchable.
    pub fn needs_fetch(&self) -> bool {
        match self.status {
            QueryStatus::Idle => true,
            QueryStatus::Loading => !self.is_fetching,
            QueryStatus::Success | QueryStatus::Error => false,
        }
    }

    pub(crate) fn resolve_success(&mut self, data: T) {
        self.status = QueryStatus::Success;
        self.data = Some(data);
        self.error = None;
        self.is_fetching = false;
        self.updated_at = Some(Utc::now());
    }

    pub(crate) fn resolve_error(&mut self, error: E) {
        self.status = QueryStatus::Error;
        self.data = None;
        self.error = Some(error);
        self.is_fetching = false;
        self.updated_at = Some(Utc::now());
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for QueryState<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("key", self.key())
            .field("status", &self.status)
            .field("data", &self.data)
            .field("error", &self.error)
            .field("is_fetching", &self.is_fetching)
            .field("updated_at", &self.updated_at)
            .field("fetch_count", &self.fetch_count)
            .finish()
    }
}
