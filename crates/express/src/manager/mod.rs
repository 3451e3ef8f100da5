//! Express manager
//!
//! One session of the swap screen: the user picks a pair and an amount, the
//! manager asks every eligible provider for a quote, resolves fees and keeps
//! the best (or user-selected) provider ready to execute.
//!
//! All mutable state lives in a single task. [`ExpressManager`] is a cheap,
//! cloneable handle: updates are commands answered once the resulting state
//! is committed, reads return the last published snapshot without waiting.
//!
//! A newer update always wins. When an update arrives while a resolution is
//! running, the running one is cancelled and its caller receives
//! [`ExpressError::Superseded`]; its results can never be published.
//!
//! ```rust,ignore
//! let manager = ExpressManager::new(pool, fee_provider, ManagerConfig::default());
//! manager.update_pair(pair).await?;
//! let state = manager
//!     .update_amount(Some(amount), ExpressProviderUpdateSource::AmountChange)
//!     .await?;
//! if let Some(ready) = state.status.ready() {
//!     println!("{} offers {}", ready.provider.name, ready.quote.expect_amount);
//! }
//! ```

mod actor;
mod resolution;
pub mod selection;
mod state;

pub use state::{ExpressManagerState, ExpressProviderUpdateSource, ExpressReadyQuote, ExpressStatus};

use crate::config::ExpressConfig;
use crate::fee::{FeeResolver, DEFAULT_GAS_LIMIT};
use actor::{Actor, Command, Reply};
use express_error::{ExpressError, Result};
use express_provider::ProviderPool;
use express_resilience::TimeoutConfig;
use express_traits::{
    Amount, ExpressApprovePolicy, ExpressAvailableProvider, ExpressFeeOption,
    ExpressManagerSwappingPair, ExpressProvider, ExpressTransactionData, FeeProvider,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Manager tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Budgets for quote, fee and trade-data calls
    pub timeouts: TimeoutConfig,
    /// Gas limit for DEX quotes that carry no estimate
    pub default_gas_limit: u64,
    /// Commands queued before callers wait
    pub command_buffer: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            default_gas_limit: DEFAULT_GAS_LIMIT,
            command_buffer: 32,
        }
    }
}

impl ManagerConfig {
    /// Sets the per-call timeouts
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the fallback DEX gas limit
    pub fn with_default_gas_limit(mut self, gas_limit: u64) -> Self {
        self.default_gas_limit = gas_limit;
        self
    }
}

impl From<&ExpressConfig> for ManagerConfig {
    fn from(config: &ExpressConfig) -> Self {
        Self {
            timeouts: config.timeouts.clone(),
            default_gas_limit: config.default_gas_limit,
            command_buffer: config.command_buffer,
        }
    }
}

/// Handle to a running manager session
#[derive(Debug, Clone)]
pub struct ExpressManager {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ExpressManagerState>,
}

impl ExpressManager {
    /// Starts a session over `pool`.
    ///
    /// Must be called from within a Tokio runtime. The session ends on
    /// [`shutdown`](Self::shutdown) or when the last handle is dropped.
    pub fn new(pool: ProviderPool, fee_provider: Arc<dyn FeeProvider>, config: ManagerConfig) -> Self {
        let fees = FeeResolver::new(fee_provider)
            .with_timeout(config.timeouts.fee)
            .with_default_gas_limit(config.default_gas_limit);
        let (commands, receiver) = mpsc::channel(config.command_buffer.max(1));
        let (publisher, state) = watch::channel(ExpressManagerState::default());

        let actor = Actor::new(Arc::new(pool), fees, config, publisher, receiver);
        tokio::spawn(actor.run());

        Self { commands, state }
    }

    /// Replaces the pair and resolves quotes for it
    pub async fn update_pair(&self, pair: ExpressManagerSwappingPair) -> Result<ExpressManagerState> {
        self.call(|reply| Command::UpdatePair { pair, reply }).await
    }

    /// Replaces the amount and resolves quotes for it.
    ///
    /// `None` clears the amount and leaves the manager idle.
    pub async fn update_amount(
        &self,
        amount: Option<Amount>,
        source: ExpressProviderUpdateSource,
    ) -> Result<ExpressManagerState> {
        self.call(|reply| Command::UpdateAmount { amount, source, reply })
            .await
    }

    /// Changes the allowance strategy.
    ///
    /// Only providers whose quote needs an allowance get a new fee estimate.
    pub async fn update_approve_policy(&self, policy: ExpressApprovePolicy) -> Result<ExpressManagerState> {
        self.call(|reply| Command::UpdateApprovePolicy { policy, reply })
            .await
    }

    /// Picks the fee rate. Never makes a network call.
    pub async fn update_fee_option(&self, option: ExpressFeeOption) -> Result<ExpressManagerState> {
        self.call(|reply| Command::UpdateFeeOption { option, reply })
            .await
    }

    /// Selects a provider from the last resolved set without re-quoting.
    ///
    /// # Errors
    ///
    /// [`ExpressError::ProviderNotEligible`] if the id is not in the set; the
    /// state is left untouched.
    pub async fn update_selected_provider(&self, provider_id: impl Into<String>) -> Result<ExpressManagerState> {
        let provider_id = provider_id.into();
        self.call(|reply| Command::UpdateSelectedProvider { provider_id, reply })
            .await
    }

    /// Re-runs resolution for the current inputs
    pub async fn refresh(&self, source: ExpressProviderUpdateSource) -> Result<ExpressManagerState> {
        self.call(|reply| Command::Refresh { source, reply }).await
    }

    /// Asks the selected CEX provider for deposit details of the ready quote.
    ///
    /// # Errors
    ///
    /// [`ExpressError::InvalidState`] unless a CEX quote is ready, and
    /// [`ExpressError::Superseded`] if the inputs change before it answers.
    pub async fn request_data(&self) -> Result<ExpressTransactionData> {
        self.call(|reply| Command::RequestData { reply }).await
    }

    /// Cancels outstanding work and closes the session
    pub async fn shutdown(&self) -> Result<()> {
        self.call(|reply| Command::Shutdown { reply }).await
    }

    /// Current pair
    pub fn get_pair(&self) -> Option<ExpressManagerSwappingPair> {
        self.state.borrow().pair.clone()
    }

    /// Current amount
    pub fn get_amount(&self) -> Option<Amount> {
        self.state.borrow().amount
    }

    /// Selected provider
    pub fn get_selected_provider(&self) -> Option<ExpressProvider> {
        self.state.borrow().selected_provider.clone()
    }

    /// Last resolved providers in registration order
    pub fn get_all_providers(&self) -> Vec<ExpressAvailableProvider> {
        self.state.borrow().providers.clone()
    }

    /// Last published snapshot
    pub fn state(&self) -> ExpressManagerState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<ExpressManagerState> {
        self.state.clone()
    }

    /// Returns true once the session has ended
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| ExpressError::ManagerClosed)?;
        response.await.map_err(|_| ExpressError::ManagerClosed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use express_testing::{fixtures, StubFeeProvider, StubQuoteProvider};
    use std::time::Duration;

    fn manager(providers: Vec<StubQuoteProvider>) -> ExpressManager {
        let mut pool = ProviderPool::new();
        for provider in providers {
            pool.register(Arc::new(provider)).unwrap();
        }
        ExpressManager::new(pool, Arc::new(StubFeeProvider::new()), ManagerConfig::default())
    }

    #[test]
    fn test_config_from_express_config() {
        let config = ExpressConfig::default();
        let manager_config = ManagerConfig::from(&config);
        assert_eq!(manager_config.timeouts, config.timeouts);
        assert_eq!(manager_config.default_gas_limit, DEFAULT_GAS_LIMIT);
    }

    #[tokio::test]
    async fn test_new_manager_is_idle() {
        let manager = manager(vec![StubQuoteProvider::new(fixtures::cex("a"))]);
        assert_eq!(manager.state(), ExpressManagerState::default());
        assert!(manager.get_pair().is_none());
        assert!(!manager.is_closed());
    }

    #[tokio::test]
    async fn test_pair_without_amount_is_idle() {
        let manager = manager(vec![StubQuoteProvider::new(fixtures::cex("a"))]);
        let state = manager.update_pair(fixtures::eth_to_usdt()).await.unwrap();
        assert_eq!(state.status, ExpressStatus::Idle);
        assert_eq!(manager.get_pair(), Some(fixtures::eth_to_usdt()));
    }

    #[tokio::test]
    async fn test_subscriber_sees_resolving_then_ready() {
        let manager = manager(vec![StubQuoteProvider::new(fixtures::cex("a")).with_delay(Duration::from_millis(20))]);
        let mut updates = manager.subscribe();
        manager.update_pair(fixtures::eth_to_usdt()).await.unwrap();
        updates.borrow_and_update();

        let handle = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .update_amount(Some(fixtures::one_eth()), ExpressProviderUpdateSource::AmountChange)
                    .await
            })
        };

        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().status.is_resolving());
        let state = handle.await.unwrap().unwrap();
        assert!(state.status.ready().is_some());
        assert_eq!(*updates.borrow(), state);
    }

    #[tokio::test]
    async fn test_dropping_last_handle_closes_session() {
        let manager = manager(vec![StubQuoteProvider::new(fixtures::cex("a"))]);
        let mut updates = manager.subscribe();
        drop(manager);
        assert!(updates.changed().await.is_err());
    }
}
