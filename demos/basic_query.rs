//! # Basic Query Example
//!
//! Shows the query lifecycle for a single key:
//! 1. `idle` before the first invocation
//! 2. `loading` while the producer runs, with duplicate calls suppressed
//! 3. `success` (or `error`) once it resolves
//! 4. `refetch` replaying the same producer
//!
//! Run with:
//! ```bash
//! cargo run --example basic_query
//! ```

use querent::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Profile {
    id: u32,
    name: String,
    visits: u32,
}

#[tokio::main]
async fn main() -> QueryResult<()> {
    let store: QueryStore<Profile, String> = QueryStore::new();
    let mut events = store.subscribe();

    // Print every state change in the background
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!(
                "📡 {} → {} (fetching: {}, data: {:?}, error: {:?})",
                event.key,
                event.state.status,
                event.state.is_fetching,
                event.state.data.as_ref().map(|p| p.visits),
                event.state.error
            );
        }
    });

    let visits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&visits);
    let fetch_profile = Producer::new(move || {
        let counter = Arc::clone(&counter);
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(Profile {
                id: 1,
                name: "Ada".to_string(),
                visits: counter.fetch_add(1, Ordering::SeqCst) + 1,
            })
        }
    });

    println!("🔎 Before invoke: {}", store.state("profile:1")?.status);

    let first = store.invoke("profile:1", fetch_profile.clone())?;
    let duplicate = store.invoke("profile:1", fetch_profile)?;
    println!("🚦 Second invoke deduplicated: {}", duplicate.is_deduplicated());
    first.wait().await?;

    let state = store.state("profile:1")?;
    if let Some(profile) = &state.data {
        println!("✅ Loaded #{} {} (visit {})", profile.id, profile.name, profile.visits);
    }

    println!("🔁 Refetching...");
    state.refetch.call()?.wait().await?;
    println!(
        "✅ After refetch: visit {:?}",
        store.state("profile:1")?.data.map(|p| p.visits)
    );

    store
        .invoke_with("profile:404", || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err("profile not found".to_string())
        })?
        .wait()
        .await?;
    println!("❌ Missing profile: {:?}", store.state("profile:404")?.error);

    drop(store);
    printer.await.ok();
    Ok(())
}
