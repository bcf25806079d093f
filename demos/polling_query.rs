//! # Polling Query Example
//!
//! Keeps a query fresh with the [`Poller`]:
//! - `every` polls on a fixed interval
//! - `trigger` forces an immediate poll
//! - a [`QueryBinding`] follows the key like a UI component would
//!
//! Run with:
//! ```bash
//! cargo run --example polling_query
//! ```

use querent::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Duration;

#[tokio::main]
async fn main() -> QueryResult<()> {
    let store: QueryStore<u64, String> = QueryStore::new();

    let ticks = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&ticks);
    let read_counter = Producer::new(move || {
        let counter = Arc::clone(&counter);
        async move { Ok(counter.fetch_add(1, Ordering::SeqCst) * 10) }
    });

    let mut binding = QueryBinding::new(store.clone(), "metrics", read_counter.clone());
    if let Some(invocation) = binding.mount()? {
        invocation.wait().await?;
    }
    println!("🖥️  Mounted: {:?}", binding.state()?.data);

    let mut poller = Poller::new(store.clone()).with_tick(Duration::from_millis(50))?;
    poller.every("metrics", read_counter, Duration::from_millis(200))?;
    poller.start().await?;

    for _ in 0..6 {
        let state = binding.changed().await?;
        println!("🔄 {} → {:?}", state.status, state.data);
    }

    poller.trigger("metrics").await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    poller.stop().await?;

    if let Some(info) = poller.status("metrics").await {
        println!(
            "📊 Polled {} times, skipped {}, last run {:?}",
            info.run_count, info.skipped_count, info.last_run
        );
    }
    Ok(())
}
