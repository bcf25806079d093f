//! # Background Refetching
//!
//! [`Poller`] re-invokes registered keys on a schedule so their records stay fresh
//! without a consumer asking. Every poll goes through [`QueryStore::invoke`], so it is
//! deduplicated like any other call: a key whose previous fetch is still running is
//! simply skipped for that tick.
//!
//! ```rust
//! use querent::prelude::*;
//! use tokio::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> QueryResult<()> {
//!     let store: QueryStore<u64, String> = QueryStore::new();
//!     let mut poller = Poller::new(store.clone());
//!
//!     poller.every("stats", Producer::new(|| async { Ok(1) }), Duration::from_millis(500))?;
//!     poller.every_minutes("report", Producer::new(|| async { Ok(2) }), 5)?;
//!     poller.cron("nightly", Producer::new(|| async { Ok(3) }), "0 0 3 * * *")?;
//!
//!     poller.start().await?;
//!     poller.stop().await?;
//!     Ok(())
//! }
//! ```

use crate::error::{QueryError, QueryResult};
use crate::key::QueryKey;
use crate::producer::Producer;
use crate::store::{Invocation, QueryStore};
use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::time::Duration;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// When a key is polled
#[derive(Debug, Clone)]
pub enum PollSchedule {
    /// Every fixed interval
    Every(Duration),
    /// Cron expression (seconds field first)
    Cron(String),
}

/// Polling statistics for one key
#[derive(Debug, Clone)]
pub struct PollInfo {
    pub key: QueryKey,
    /// Polls that started a producer call
    pub run_count: u64,
    /// Polls skipped because a call was already in flight
    pub skipped_count: u64,
    pub last_run: Option<DateTime<Utc>>,
}

type PollEntry<T, E> = (Producer<T, E>, PollSchedule, Arc<RwLock<PollInfo>>);

/// Schedules periodic refetches against a [`QueryStore`]
pub struct Poller<T, E> {
    store: QueryStore<T, E>,
    entries: HashMap<QueryKey, PollEntry<T, E>>,
    command_tx: Option<mpsc::UnboundedSender<QueryKey>>,
    running: Arc<RwLock<bool>>,
    tick: Duration,
}

impl<T, E> Poller<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a poller that checks its schedules once per second
    pub fn new(store: QueryStore<T, E>) -> Self {
        Self {
            store,
            entries: HashMap::new(),
            command_tx: None,
            running: Arc::new(RwLock::new(false)),
            tick: Duration::from_secs(1),
        }
    }

    /// Check schedules every `tick` instead of every second
    ///
    /// Intervals shorter than the tick are rounded up to it.
    pub fn with_tick(mut self, tick: Duration) -> QueryResult<Self> {
        if tick.is_zero() {
            return Err(QueryError::configuration("Poll tick must be greater than zero"));
        }
        self.tick = tick;
        Ok(self)
    }

    /// Poll `key` every `interval`
    pub fn every<K: Into<QueryKey>>(
        &mut self,
        key: K,
        producer: Producer<T, E>,
        interval: Duration,
    ) -> QueryResult<()> {
        if interval.is_zero() {
            return Err(QueryError::configuration("Poll interval must be greater than zero"));
        }
        self.add_entry(key.into(), producer, PollSchedule::Every(interval))
    }

    /// Poll `key` every N seconds
    pub fn every_seconds<K: Into<QueryKey>>(
        &mut self,
        key: K,
        producer: Producer<T, E>,
        seconds: u64,
    ) -> QueryResult<()> {
        self.every(key, producer, Duration::from_secs(seconds))
    }

    /// Poll `key` every N minutes
    pub fn every_minutes<K: Into<QueryKey>>(
        &mut self,
        key: K,
        producer: Producer<T, E>,
        minutes: u64,
    ) -> QueryResult<()> {
        let seconds = minutes
            .checked_mul(60)
            .ok_or_else(|| QueryError::configuration("Poll interval in minutes is too large"))?;
        self.every(key, producer, Duration::from_secs(seconds))
    }

    /// Poll `key` on a cron schedule
    pub fn cron<K: Into<QueryKey>>(
        &mut self,
        key: K,
        producer: Producer<T, E>,
        expr: &str,
    ) -> QueryResult<()> {
        CronSchedule::from_str(expr)
            .map_err(|e| QueryError::configuration(format!("Invalid cron expression: {e}")))?;
        self.add_entry(key.into(), producer, PollSchedule::Cron(expr.to_string()))
    }

    fn add_entry(
        &mut self,
        key: QueryKey,
        producer: Producer<T, E>,
        schedule: PollSchedule,
    ) -> QueryResult<()> {
        if key.is_empty() {
            return Err(QueryError::invalid_key("Query keys must not be empty"));
        }
        if self.entries.contains_key(&key) {
            return Err(QueryError::configuration(format!(
                "Key '{key}' is already being polled"
            )));
        }

        let info = PollInfo {
            key: key.clone(),
            run_count: 0,
            skipped_count: 0,
            last_run: None,
        };

        self.entries
            .insert(key, (producer, schedule, Arc::new(RwLock::new(info))));
        Ok(())
    }

    /// Start the polling loop on the current tokio runtime
    pub async fn start(&mut self) -> QueryResult<()> {
        if *self.running.read().await {
            return Err(QueryError::configuration("Poller already running"));
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.command_tx = Some(tx);
        *self.running.write().await = true;

        let entries = self.entries.clone();
        let store = self.store.clone();
        let running = Arc::clone(&self.running);
        let tick = self.tick;

        tokio::spawn(async move {
            let mut last_check = HashMap::new();
            let mut interval = tokio::time::interval(tick);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !*running.read().await {
                            break;
                        }

                        let now = Utc::now();
                        for (key, (producer, schedule, info)) in &entries {
                            if should_poll(schedule, &mut last_check, key, now) {
                                poll_entry(&store, key, producer, info).await;
                            }
                        }
                    }

                    command = rx.recv() => {
                        match command {
                            Some(key) => {
                                if let Some((producer, _, info)) = entries.get(&key) {
                                    poll_entry(&store, &key, producer, info).await;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }

            #[cfg(feature = "tracing")]
            debug!("Poller loop stopped");
        });

        Ok(())
    }

    /// Poll `key` right away, outside its schedule
    pub async fn trigger<K: Into<QueryKey>>(&self, key: K) -> QueryResult<()> {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            return Err(QueryError::configuration(format!(
                "Key '{key}' is not registered with the poller"
            )));
        }

        match &self.command_tx {
            Some(tx) => tx
                .send(key)
                .map_err(|_| QueryError::generic("Failed to trigger poll")),
            None => Err(QueryError::configuration("Poller not running")),
        }
    }

    /// Stop polling; fetches already started keep running
    pub async fn stop(&mut self) -> QueryResult<()> {
        *self.running.write().await = false;
        self.command_tx = None;
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Polling statistics for `key`
    pub async fn status<K: Into<QueryKey>>(&self, key: K) -> Option<PollInfo> {
        match self.entries.get(&key.into()) {
            Some((_, _, info)) => Some(info.read().await.clone()),
            None => None,
        }
    }

    /// Polling statistics for every registered key
    pub async fn list(&self) -> Vec<PollInfo> {
        let mut result = Vec::new();
        for (_, _, info) in self.entries.values() {
            result.push(info.read().await.clone());
        }
        result
    }
}

/// Check if a key is due
fn should_poll(
    schedule: &PollSchedule,
    last_check: &mut HashMap<QueryKey, DateTime<Utc>>,
    key: &QueryKey,
    now: DateTime<Utc>,
) -> bool {
    match schedule {
        PollSchedule::Every(interval) => {
            let duration =
                chrono::Duration::from_std(*interval).unwrap_or(chrono::Duration::seconds(60));
            match last_check.get(key) {
                Some(last) if now < *last + duration => false,
                _ => {
                    last_check.insert(key.clone(), now);
                    true
                }
            }
        }
        PollSchedule::Cron(expr) => {
            let Ok(schedule) = CronSchedule::from_str(expr) else {
                return false;
            };
            let last = last_check
                .get(key)
                .copied()
                .unwrap_or_else(|| now - chrono::Duration::seconds(1));

            match schedule.after(&last).next() {
                Some(upcoming) if upcoming <= now => {
                    last_check.insert(key.clone(), now);
                    true
                }
                _ => false,
            }
        }
    }
}

/// Invoke one entry and record the outcome
async fn poll_entry<T, E>(
    store: &QueryStore<T, E>,
    key: &QueryKey,
    producer: &Producer<T, E>,
    info: &RwLock<PollInfo>,
) where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    match store.invoke(key.clone(), producer.clone()) {
        Ok(Invocation::Started(_)) => {
            let mut info = info.write().await;
            info.run_count += 1;
            info.last_run = Some(Utc::now());
        }
        Ok(Invocation::Deduplicated) => {
            #[cfg(feature = "tracing")]
            debug!(key = %key, "Poll skipped, fetch still in flight");

            info.write().await.skipped_count += 1;
        }
        Err(_e) => {
            #[cfg(feature = "tracing")]
            warn!(key = %key, error = %_e, "Poll failed to invoke");
        }
    }
}
