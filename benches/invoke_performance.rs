use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use querent::{Producer, QueryStore};

fn bench_invoke(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke");

    let key_counts = vec![10, 100, 1000];

    for &key_count in &key_counts {
        group.bench_with_input(
            BenchmarkId::new("distinct_keys", key_count),
            &key_count,
            |b, &key_count| {
                b.to_async(tokio::runtime::Runtime::new().unwrap())
                    .iter(|| async move {
                        let store: QueryStore<usize, String> = QueryStore::new();
                        let mut invocations = Vec::with_capacity(key_count);
                        for i in 0..key_count {
                            invocations.push(
                                store
                                    .invoke_with(format!("key_{i}"), move || async move { Ok(i) })
                                    .unwrap(),
                            );
                        }
                        for invocation in invocations {
                            invocation.wait().await.unwrap();
                        }
                        assert_eq!(store.len().unwrap(), key_count);
                    });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("deduplicated_same_key", key_count),
            &key_count,
            |b, &key_count| {
                b.to_async(tokio::runtime::Runtime::new().unwrap())
                    .iter(|| async move {
                        let store: QueryStore<usize, String> = QueryStore::new();
                        let producer = Producer::new(|| async {
                            tokio::task::yield_now().await;
                            Ok(1)
                        });
                        let first = store.invoke("shared", producer.clone()).unwrap();
                        for _ in 1..key_count {
                            let again = store.invoke("shared", producer.clone()).unwrap();
                            assert!(again.is_deduplicated());
                        }
                        first.wait().await.unwrap();
                    });
            },
        );
    }

    group.finish();
}

fn bench_state_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_reads");

    group.bench_function("state_1000_keys", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store: QueryStore<usize, String> = QueryStore::new();
        runtime.block_on(async {
            for i in 0..1000 {
                store
                    .invoke_with(format!("key_{i}"), move || async move { Ok(i) })
                    .unwrap()
                    .wait()
                    .await
                    .unwrap();
            }
        });

        b.iter(|| {
            for i in 0..1000 {
                let state = store.state(format!("key_{i}")).unwrap();
                assert!(state.is_success());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_invoke, bench_state_reads);
criterion_main!(benches);
