//! Shared setup for manager integration tests

#![allow(dead_code)]

use express::{ExpressManager, ExpressManagerState, ExpressProviderUpdateSource, ManagerConfig, ProviderPool};
use express_testing::{StubFeeProvider, StubQuoteProvider};
use express_traits::{Amount, ExpressManagerSwappingPair};
use std::sync::Arc;

/// A manager plus the stubs behind it
pub struct Harness {
    pub manager: ExpressManager,
    pub providers: Vec<Arc<StubQuoteProvider>>,
    pub fees: Arc<StubFeeProvider>,
}

impl Harness {
    pub fn new(providers: Vec<StubQuoteProvider>) -> Self {
        Self::with_config(providers, StubFeeProvider::new(), ManagerConfig::default())
    }

    pub fn with_config(providers: Vec<StubQuoteProvider>, fees: StubFeeProvider, config: ManagerConfig) -> Self {
        let providers: Vec<Arc<StubQuoteProvider>> = providers.into_iter().map(Arc::new).collect();
        let fees = Arc::new(fees);

        let mut pool = ProviderPool::new();
        for provider in &providers {
            pool.register(provider.clone()).unwrap();
        }
        let manager = ExpressManager::new(pool, fees.clone(), config);

        Self {
            manager,
            providers,
            fees,
        }
    }

    pub fn provider(&self, id: &str) -> &Arc<StubQuoteProvider> {
        self.providers
            .iter()
            .find(|p| express_traits::QuoteProvider::id(p.as_ref()) == id)
            .unwrap()
    }

    pub fn total_quote_calls(&self) -> usize {
        self.providers.iter().map(|p| p.quote_calls()).sum()
    }

    /// Sets pair then amount and returns the committed state
    pub async fn resolve(&self, pair: ExpressManagerSwappingPair, amount: Amount) -> ExpressManagerState {
        self.manager.update_pair(pair).await.unwrap();
        self.manager
            .update_amount(Some(amount), ExpressProviderUpdateSource::AmountChange)
            .await
            .unwrap()
    }
}

/// Yields until `condition` holds, without letting paused time advance
pub async fn until(mut condition: impl FnMut() -> bool) {
    while !condition() {
        tokio::task::yield_now().await;
    }
}
