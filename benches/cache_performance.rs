use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use querent::{CachePluginExt, MemoryCache};

fn bench_cache_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_operations");

    let operation_counts = vec![10, 100];

    for count in operation_counts {
        group.bench_with_input(
            BenchmarkId::new("set_operations", count),
            &count,
            |b, &count| {
                b.to_async(tokio::runtime::Runtime::new().unwrap())
                    .iter(|| async move {
                        let cache = MemoryCache::new();
                        for i in 0..count {
                            cache
                                .set_as(&format!("key_{i}"), format!("value_{i}"))
                                .await
                                .unwrap();
                        }
                    });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("get_operations", count),
            &count,
            |b, &count| {
                let runtime = tokio::runtime::Runtime::new().unwrap();
                let cache = MemoryCache::new();
                runtime.block_on(async {
                    for i in 0..count {
                        cache
                            .set_as(&format!("key_{i}"), format!("value_{i}"))
                            .await
                            .unwrap();
                    }
                });

                b.to_async(runtime).iter(|| {
                    let cache = cache.clone();
                    async move {
                        for i in 0..count {
                            let _: Option<String> =
                                cache.get_as(&format!("key_{i}")).await.unwrap();
                        }
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_cache_operations);
criterion_main!(benches);
