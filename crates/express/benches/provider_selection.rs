//! Express Benchmark Suite
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p express
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use express::manager::selection::{aggregate_failure, best_provider, select_provider, status_for};
use express::{ExpressError, ExpressManager, ExpressProviderUpdateSource, ManagerConfig, ProviderPool};
use express_testing::{fixtures, StubFeeProvider, StubQuoteProvider};
use express_traits::{
    Amount, ExpressAvailableProvider, ExpressFee, ExpressFeeOption, ExpressQuote, Fee, ProviderQuote,
};
use std::sync::Arc;

fn snapshot(count: usize) -> Vec<ExpressAvailableProvider> {
    (0..count)
        .map(|i| {
            let provider = fixtures::cex(&format!("provider-{}", i)).with_priority((i % 7) as u32);
            let result = if i % 5 == 4 {
                Err(ExpressError::AmountTooSmall {
                    minimum: 1_000 + i as u128,
                })
            } else {
                Ok(ProviderQuote {
                    quote: ExpressQuote::new(fixtures::one_eth(), fixtures::usdt_units((i as u128 * 7919) % 1_000)),
                    fee: ExpressFee::Double {
                        market: Fee::new(fixtures::wei(21_000)),
                        fast: Fee::new(fixtures::wei(42_000)),
                    },
                    approve: None,
                })
            };
            ExpressAvailableProvider {
                provider,
                result,
                is_best: false,
            }
        })
        .collect()
}

// ============================================================================
// Selection Benchmarks
// ============================================================================

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("Provider Selection");

    for count in [4usize, 16, 64] {
        let providers = snapshot(count);

        group.bench_with_input(BenchmarkId::new("best_provider", count), &providers, |b, providers| {
            b.iter(|| best_provider(black_box(providers)))
        });

        group.bench_with_input(BenchmarkId::new("select_with_previous", count), &providers, |b, providers| {
            b.iter_batched(
                || providers.clone(),
                |mut providers| select_provider(black_box(&mut providers), Some("provider-1")),
                criterion::BatchSize::SmallInput,
            )
        });
    }

    let failures: Vec<_> = snapshot(20).into_iter().filter(|p| !p.is_available()).collect();
    group.bench_function("aggregate_failure", |b| b.iter(|| aggregate_failure(black_box(&failures), 18)));

    let entry = snapshot(1).remove(0);
    group.bench_function("status_for", |b| {
        b.iter(|| status_for(black_box(&entry), black_box(ExpressFeeOption::Fast)))
    });

    group.finish();
}

// ============================================================================
// Manager Round Trip Benchmarks
// ============================================================================

fn bench_manager(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let manager = runtime.block_on(async {
        let mut pool = ProviderPool::new();
        for i in 0..8u128 {
            let provider = StubQuoteProvider::new(fixtures::cex(&format!("cex-{}", i)))
                .with_expect_amount(fixtures::usdt_units(1_000 + i));
            pool.register(Arc::new(provider)).unwrap();
        }
        let manager = ExpressManager::new(pool, Arc::new(StubFeeProvider::new()), ManagerConfig::default());
        manager.update_pair(fixtures::eth_to_usdt()).await.unwrap();
        manager
    });

    let mut group = c.benchmark_group("Manager");
    let mut value = 1u128;
    group.bench_function("update_amount_8_providers", |b| {
        b.iter(|| {
            value += 1;
            runtime.block_on(manager.update_amount(
                Some(Amount::from_smallest_unit(value, 18)),
                ExpressProviderUpdateSource::AmountChange,
            ))
        })
    });
    group.bench_function("update_fee_option", |b| {
        b.iter(|| runtime.block_on(manager.update_fee_option(black_box(ExpressFeeOption::Fast))))
    });
    group.finish();
}

criterion_group!(benches, bench_selection, bench_manager);
criterion_main!(benches);
