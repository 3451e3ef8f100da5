//! Timing-controlled collaborator stubs
//!
//! Every stub records its calls so tests can assert which network
//! requests a manager operation made (or did not make).

use crate::fixtures;
use async_trait::async_trait;
use express_error::{ExpressError, Result};
use express_traits::{
    Amount, ExchangeDataRequest, ExpressApprovePolicy, ExpressAsset, ExpressFee,
    ExpressManagerSwappingPair, ExpressProvider, ExpressProviderType, ExpressQuote,
    ExpressTransactionData, Fee, FeeProvider, OnrampCurrency, OnrampPair, OnrampPaymentMethod,
    OnrampRepository, PaymentCapability, QuoteProvider,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared call counter
#[derive(Debug, Clone, Default)]
pub struct CallTracker {
    calls: Arc<AtomicUsize>,
}

impl CallTracker {
    /// Creates a tracker at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call
    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Calls recorded so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Resets the count to zero
    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

// ============================================================================
// Quote provider
// ============================================================================

#[derive(Debug, Clone, Default)]
struct QuoteBehavior {
    expect_amount: Option<Amount>,
    failure: Option<ExpressError>,
    allowance: Option<String>,
    gas_limit: Option<u64>,
    delay: Duration,
}

/// Quote provider that answers after a configurable delay.
///
/// Without an explicit expect amount it quotes 1:1 in smallest units,
/// scaled to the destination's decimals.
#[derive(Debug)]
pub struct StubQuoteProvider {
    provider: ExpressProvider,
    behavior: Mutex<QuoteBehavior>,
    supported_pairs: Option<Vec<ExpressManagerSwappingPair>>,
    exchange_result: Mutex<Option<Result<ExpressTransactionData>>>,
    exchange_delay: Duration,
    last_policy: Mutex<Option<ExpressApprovePolicy>>,
    quote_calls: CallTracker,
    completed_quotes: CallTracker,
    exchange_calls: CallTracker,
}

impl StubQuoteProvider {
    /// Creates an instantly answering provider
    pub fn new(provider: ExpressProvider) -> Self {
        Self {
            provider,
            behavior: Mutex::new(QuoteBehavior::default()),
            supported_pairs: None,
            exchange_result: Mutex::new(None),
            exchange_delay: Duration::ZERO,
            last_policy: Mutex::new(None),
            quote_calls: CallTracker::new(),
            completed_quotes: CallTracker::new(),
            exchange_calls: CallTracker::new(),
        }
    }

    /// Always quotes `amount`
    pub fn with_expect_amount(self, amount: Amount) -> Self {
        self.set_expect_amount(amount);
        self
    }

    /// Always fails with `error`
    pub fn with_failure(self, error: ExpressError) -> Self {
        self.set_failure(Some(error));
        self
    }

    /// Quotes carry an allowance requirement for `spender`
    pub fn with_allowance(self, spender: impl Into<String>) -> Self {
        lock(&self.behavior).allowance = Some(spender.into());
        self
    }

    /// Quotes carry a gas estimate
    pub fn with_gas_limit(self, gas_limit: u64) -> Self {
        lock(&self.behavior).gas_limit = Some(gas_limit);
        self
    }

    /// Waits `delay` before answering a quote
    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    /// Only `pairs` are eligible
    pub fn with_supported_pairs(mut self, pairs: Vec<ExpressManagerSwappingPair>) -> Self {
        self.supported_pairs = Some(pairs);
        self
    }

    /// Trade initiation answers with `result`
    pub fn with_exchange_result(self, result: Result<ExpressTransactionData>) -> Self {
        *lock(&self.exchange_result) = Some(result);
        self
    }

    /// Waits `delay` before answering trade initiation
    pub fn with_exchange_delay(mut self, delay: Duration) -> Self {
        self.exchange_delay = delay;
        self
    }

    /// Changes the quoted amount for later calls
    pub fn set_expect_amount(&self, amount: Amount) {
        lock(&self.behavior).expect_amount = Some(amount);
    }

    /// Changes the failure for later calls; `None` makes the provider succeed
    pub fn set_failure(&self, error: Option<ExpressError>) {
        lock(&self.behavior).failure = error;
    }

    /// Changes the delay for later calls
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.behavior).delay = delay;
    }

    /// Quote calls started
    pub fn quote_calls(&self) -> usize {
        self.quote_calls.call_count()
    }

    /// Quote calls that ran to the end instead of being dropped
    pub fn completed_quotes(&self) -> usize {
        self.completed_quotes.call_count()
    }

    /// Trade initiation calls started
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.call_count()
    }

    /// Approve policy of the latest quote call
    pub fn last_policy(&self) -> Option<ExpressApprovePolicy> {
        *lock(&self.last_policy)
    }
}

#[async_trait]
impl QuoteProvider for StubQuoteProvider {
    fn provider(&self) -> &ExpressProvider {
        &self.provider
    }

    fn supports(&self, pair: &ExpressManagerSwappingPair) -> bool {
        match &self.supported_pairs {
            Some(pairs) => pairs.contains(pair),
            None => true,
        }
    }

    async fn quote(
        &self,
        pair: &ExpressManagerSwappingPair,
        amount: Amount,
        approve_policy: ExpressApprovePolicy,
    ) -> Result<ExpressQuote> {
        self.quote_calls.record_call();
        *lock(&self.last_policy) = Some(approve_policy);

        let behavior = lock(&self.behavior).clone();
        if !behavior.delay.is_zero() {
            tokio::time::sleep(behavior.delay).await;
        }
        self.completed_quotes.record_call();

        if let Some(error) = behavior.failure {
            return Err(error);
        }

        let expect_amount = behavior.expect_amount.unwrap_or_else(|| {
            Amount::from_smallest_unit(amount.value, pair.destination.currency.decimals)
        });
        let mut quote = ExpressQuote::new(amount, expect_amount);
        if let Some(spender) = behavior.allowance {
            quote = quote.with_allowance(spender);
        }
        if let Some(gas_limit) = behavior.gas_limit {
            quote = quote.with_gas_limit(gas_limit);
        }
        Ok(quote)
    }

    async fn exchange_data(&self, request: &ExchangeDataRequest) -> Result<ExpressTransactionData> {
        self.exchange_calls.record_call();
        if !self.exchange_delay.is_zero() {
            tokio::time::sleep(self.exchange_delay).await;
        }

        if let Some(result) = lock(&self.exchange_result).clone() {
            return result;
        }
        match self.provider.provider_type {
            ExpressProviderType::Cex => Ok(fixtures::transaction_data(
                &self.provider.id,
                &request.pair,
                request.amount,
            )),
            _ => Err(ExpressError::NotSupported(format!(
                "exchange_data for provider {}",
                self.provider.id
            ))),
        }
    }
}

// ============================================================================
// Fee provider
// ============================================================================

/// Gas price used by [`StubFeeProvider`] for contract calls (20 gwei)
pub const STUB_GAS_PRICE: u128 = 20_000_000_000;

/// Fee provider with fixed answers and per-method call counts
#[derive(Debug)]
pub struct StubFeeProvider {
    fee: Mutex<ExpressFee>,
    approve_fee: Mutex<Option<ExpressFee>>,
    failure: Mutex<Option<ExpressError>>,
    delay: Duration,
    get_fee_requests: Mutex<Vec<(Amount, String)>>,
    estimated_fee_calls: CallTracker,
    gas_limit_calls: CallTracker,
    get_fee_calls: CallTracker,
}

impl Default for StubFeeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StubFeeProvider {
    /// Market 21000 gas at 20 gwei, fast at 30 gwei
    pub fn new() -> Self {
        Self::with_fee(ExpressFee::Double {
            market: Fee::new(fixtures::wei(21_000 * STUB_GAS_PRICE)),
            fast: Fee::new(fixtures::wei(21_000 * 30_000_000_000)),
        })
    }

    /// Answers every estimate with `fee`
    pub fn with_fee(fee: ExpressFee) -> Self {
        Self {
            fee: Mutex::new(fee),
            approve_fee: Mutex::new(None),
            failure: Mutex::new(None),
            delay: Duration::ZERO,
            get_fee_requests: Mutex::new(Vec::new()),
            estimated_fee_calls: CallTracker::new(),
            gas_limit_calls: CallTracker::new(),
            get_fee_calls: CallTracker::new(),
        }
    }

    /// `get_fee` answers with `fee` instead of the transfer fee
    pub fn with_approve_fee(self, fee: ExpressFee) -> Self {
        *lock(&self.approve_fee) = Some(fee);
        self
    }

    /// Every estimate fails with `error`
    pub fn with_failure(self, error: ExpressError) -> Self {
        self.set_failure(Some(error));
        self
    }

    /// Waits `delay` before every answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Changes the failure for later calls
    pub fn set_failure(&self, error: Option<ExpressError>) {
        *lock(&self.failure) = error;
    }

    /// Changes the transfer fee for later calls
    pub fn set_fee(&self, fee: ExpressFee) {
        *lock(&self.fee) = fee;
    }

    /// `estimated_fee` calls
    pub fn estimated_fee_calls(&self) -> usize {
        self.estimated_fee_calls.call_count()
    }

    /// `estimated_fee_for_gas_limit` calls
    pub fn gas_limit_calls(&self) -> usize {
        self.gas_limit_calls.call_count()
    }

    /// `get_fee` calls
    pub fn get_fee_calls(&self) -> usize {
        self.get_fee_calls.call_count()
    }

    /// Calls across all three methods
    pub fn total_calls(&self) -> usize {
        self.estimated_fee_calls() + self.gas_limit_calls() + self.get_fee_calls()
    }

    /// Arguments of every `get_fee` call, oldest first
    pub fn get_fee_requests(&self) -> Vec<(Amount, String)> {
        lock(&self.get_fee_requests).clone()
    }

    async fn answer(&self) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match lock(&self.failure).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FeeProvider for StubFeeProvider {
    async fn estimated_fee(&self, _amount: Amount) -> Result<ExpressFee> {
        self.estimated_fee_calls.record_call();
        self.answer().await?;
        Ok(*lock(&self.fee))
    }

    async fn estimated_fee_for_gas_limit(&self, gas_limit: u64) -> Result<Fee> {
        self.gas_limit_calls.record_call();
        self.answer().await?;
        Ok(Fee::new(fixtures::wei(gas_limit as u128 * STUB_GAS_PRICE)).with_gas_limit(gas_limit))
    }

    async fn get_fee(&self, amount: Amount, destination: &str) -> Result<ExpressFee> {
        self.get_fee_calls.record_call();
        lock(&self.get_fee_requests).push((amount, destination.to_string()));
        self.answer().await?;
        let approve_fee = *lock(&self.approve_fee);
        Ok(approve_fee.unwrap_or_else(|| *lock(&self.fee)))
    }
}

// ============================================================================
// On-ramp
// ============================================================================

/// On-ramp catalog held in memory
#[derive(Debug, Default)]
pub struct StubOnrampRepository {
    methods: Vec<OnrampPaymentMethod>,
    currencies: Vec<OnrampCurrency>,
    failure: Option<ExpressError>,
    calls: CallTracker,
}

impl StubOnrampRepository {
    /// Catalog offering `methods`
    pub fn new(methods: Vec<OnrampPaymentMethod>) -> Self {
        Self {
            methods,
            ..Default::default()
        }
    }

    /// Adds accepted fiat currencies
    pub fn with_currencies(mut self, currencies: Vec<OnrampCurrency>) -> Self {
        self.currencies = currencies;
        self
    }

    /// Every call fails with `error`
    pub fn with_failure(mut self, error: ExpressError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Calls across all methods
    pub fn call_count(&self) -> usize {
        self.calls.call_count()
    }

    fn answer(&self) -> Result<()> {
        self.calls.record_call();
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OnrampRepository for StubOnrampRepository {
    async fn payment_methods(&self) -> Result<Vec<OnrampPaymentMethod>> {
        self.answer()?;
        Ok(self.methods.clone())
    }

    async fn currencies(&self) -> Result<Vec<OnrampCurrency>> {
        self.answer()?;
        Ok(self.currencies.clone())
    }

    async fn pairs(&self, fiat: &OnrampCurrency, assets: &[ExpressAsset]) -> Result<Vec<OnrampPair>> {
        self.answer()?;
        if !self.currencies.contains(fiat) {
            return Ok(Vec::new());
        }
        Ok(assets
            .iter()
            .map(|asset| OnrampPair {
                fiat: fiat.clone(),
                asset: asset.clone(),
            })
            .collect())
    }
}

/// Platform payment capability with a fixed answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaticPaymentCapability(pub bool);

impl PaymentCapability for StaticPaymentCapability {
    fn can_make_payments(&self) -> bool {
        self.0
    }
}
