//! Network fees and the fee provider seam.

use crate::Amount;
use async_trait::async_trait;
use express_error::Result;
use serde::{Deserialize, Serialize};

/// A single network fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Fee amount in the fee currency
    pub amount: Amount,
    /// Gas limit the fee was computed for (contract calls only)
    pub gas_limit: Option<u64>,
}

impl Fee {
    /// Creates a fee for a plain transfer
    pub fn new(amount: Amount) -> Self {
        Self {
            amount,
            gas_limit: None,
        }
    }

    /// Sets the gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// Which rate of a dual-rate fee the user picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExpressFeeOption {
    /// Regular confirmation speed
    #[default]
    Market,
    /// Priority confirmation speed
    Fast,
}

/// A fee estimate that carries one or two rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpressFee {
    /// Only one rate exists
    Single(Fee),
    /// Market and fast rates
    Double {
        /// Regular rate
        market: Fee,
        /// Priority rate
        fast: Fee,
    },
}

impl ExpressFee {
    /// Returns the fee for `option`.
    ///
    /// Total: a single-rate fee answers every option with its one value.
    pub fn fee(&self, option: ExpressFeeOption) -> &Fee {
        match (self, option) {
            (ExpressFee::Single(fee), _) => fee,
            (ExpressFee::Double { market, .. }, ExpressFeeOption::Market) => market,
            (ExpressFee::Double { fast, .. }, ExpressFeeOption::Fast) => fast,
        }
    }

    /// Options a user can meaningfully choose between
    pub fn options(&self) -> Vec<ExpressFeeOption> {
        match self {
            ExpressFee::Single(_) => vec![ExpressFeeOption::Market],
            ExpressFee::Double { .. } => vec![ExpressFeeOption::Market, ExpressFeeOption::Fast],
        }
    }
}

/// Estimates network fees for the source wallet.
///
/// Implementations wrap a blockchain SDK; failures surface as
/// `NetworkError`, `InsufficientFunds` or `Timeout`.
#[async_trait]
pub trait FeeProvider: Send + Sync {
    /// Fee for a plain transfer of `amount`
    async fn estimated_fee(&self, amount: Amount) -> Result<ExpressFee>;

    /// Fee for a contract call with the given gas limit
    async fn estimated_fee_for_gas_limit(&self, gas_limit: u64) -> Result<Fee>;

    /// Fee for sending `amount` to `destination` (deposit address or allowance spender)
    async fn get_fee(&self, amount: Amount, destination: &str) -> Result<ExpressFee>;
}
