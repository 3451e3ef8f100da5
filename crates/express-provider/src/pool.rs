//! Provider pool
//!
//! Registered quote providers in registration order. The order is part of
//! the contract: `get_all_providers` and tie-breaking both depend on it.

use express_error::{ExpressError, Result};
use express_traits::{ExpressManagerSwappingPair, ExpressProvider, QuoteProvider};
use std::sync::Arc;
use tracing::debug;

/// Ordered set of quote providers with unique ids
#[derive(Debug, Default, Clone)]
pub struct ProviderPool {
    providers: Vec<Arc<dyn QuoteProvider>>,
}

impl ProviderPool {
    /// Creates an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider at the end of the registration order.
    ///
    /// Fails with [`ExpressError::Config`] if the id is already registered.
    pub fn register(&mut self, provider: Arc<dyn QuoteProvider>) -> Result<()> {
        if self.contains(provider.id()) {
            return Err(ExpressError::Config(format!(
                "provider {} is already registered",
                provider.id()
            )));
        }
        debug!(
            provider_id = provider.id(),
            provider_type = %provider.provider().provider_type,
            "registered quote provider"
        );
        self.providers.push(provider);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_provider(mut self, provider: Arc<dyn QuoteProvider>) -> Result<Self> {
        self.register(provider)?;
        Ok(self)
    }

    /// Removes a provider, keeping the order of the rest
    pub fn remove(&mut self, id: &str) -> Option<Arc<dyn QuoteProvider>> {
        let index = self.providers.iter().position(|p| p.id() == id)?;
        Some(self.providers.remove(index))
    }

    /// Gets a provider by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn QuoteProvider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    /// Returns true if `id` is registered
    pub fn contains(&self, id: &str) -> bool {
        self.providers.iter().any(|p| p.id() == id)
    }

    /// Providers able to quote `pair`, in registration order
    pub fn eligible(&self, pair: &ExpressManagerSwappingPair) -> Vec<Arc<dyn QuoteProvider>> {
        self.providers
            .iter()
            .filter(|p| p.supports(pair))
            .cloned()
            .collect()
    }

    /// Identities of all providers, in registration order
    pub fn providers(&self) -> Vec<ExpressProvider> {
        self.providers.iter().map(|p| p.provider().clone()).collect()
    }

    /// Registration index of `id`
    pub fn position(&self, id: &str) -> Option<usize> {
        self.providers.iter().position(|p| p.id() == id)
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no provider is registered
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
