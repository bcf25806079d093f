//! # Cached Query Example
//!
//! Demonstrates the cache plugin integration:
//! - A registry provides the `memory` plugin by name
//! - A value already in the cache is shown as an interim `success`
//! - The live producer still runs and its result is written through
//!
//! Run with:
//! ```bash
//! cargo run --example cached_query
//! ```

use querent::prelude::*;
use std::time::Duration;

#[tokio::main]
async fn main() -> QueryResult<()> {
    let registry = PluginRegistry::with_defaults();
    println!("🧩 Registered cache plugins: {:?}", registry.names());

    let store: QueryStore<Vec<String>, String> = QueryStore::builder()
        .cache_from_registry(&registry, "memory")?
        .build()?;

    let cache = store
        .cache()
        .ok_or_else(|| QueryError::configuration("store has no cache"))?;

    // Pretend an earlier run left a value behind
    cache
        .set_as("todos", vec!["stale: buy milk".to_string()])
        .await?;

    let mut events = store.subscribe();
    let invocation = store.invoke_with("todos", || async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(vec!["buy milk".to_string(), "write docs".to_string()])
    })?;
    invocation.wait().await?;

    while let Ok(event) = events.try_recv() {
        println!(
            "📡 {} (fetching: {}) data = {:?}",
            event.state.status, event.state.is_fetching, event.state.data
        );
    }

    let cached: Option<Vec<String>> = cache.get_as("todos").await?;
    println!("💾 Cache now holds: {cached:?}");

    cache.delete("todos").await?;
    println!("🗑️  Deleted cache entry, store still shows: {:?}", store.state("todos")?.data);
    Ok(())
}
