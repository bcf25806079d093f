#![cfg(feature = "tracing")]
//! # Tracing Demo Example
//!
//! Shows the events emitted by the engine when the `tracing` feature is on:
//! claims, deduplication, cache hits, resolutions and cache failures.
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run --example tracing_demo --features tracing
//! ```

use querent::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, info, info_span};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> QueryResult<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cache = MemoryCache::new();
    cache.set_as("report", "yesterday".to_string()).await?;

    let store: QueryStore<String, String> = QueryStore::builder()
        .cache(Arc::new(cache))
        .build()?;

    async {
        let first = store.invoke_with("report", || async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok("today".to_string())
        })?;
        let second = store.invoke_with("report", || async { Ok("ignored".to_string()) })?;
        info!(deduplicated = second.is_deduplicated(), "Second invoke returned");
        first.wait().await
    }
    .instrument(info_span!("load_report"))
    .await?;

    store
        .invoke_with("broken", || async { Err("upstream timeout".to_string()) })?
        .wait()
        .await?;

    info!(
        report = ?store.state("report")?.data,
        broken = ?store.state("broken")?.error,
        "Done"
    );
    Ok(())
}
