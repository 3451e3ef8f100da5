//! Fee resolution per provider type
//!
//! | provider | allowance | fee |
//! |---|---|---|
//! | CEX | - | `estimated_fee(from_amount)` |
//! | DEX / bridge | required | approval fee from `get_fee(approve_amount, spender)` |
//! | DEX / bridge | none | `estimated_fee_for_gas_limit(gas_limit)` |

use express_error::Result;
use express_resilience::with_timeout;
use express_traits::{
    Amount, ApproveRequirement, ExpressApprovePolicy, ExpressFee, ExpressProvider,
    ExpressProviderType, ExpressQuote, FeeProvider, ProviderQuote,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Gas limit assumed for a swap when the provider gives no estimate
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

/// Allowance amount for `amount` under `policy`
pub fn approve_amount(amount: Amount, policy: ExpressApprovePolicy) -> Amount {
    match policy {
        ExpressApprovePolicy::Specified => amount,
        ExpressApprovePolicy::Unlimited => Amount::max(amount.decimals),
    }
}

/// Returns true if the quote's fee changes with the approve policy
pub fn depends_on_allowance(provider: &ExpressProvider, quote: &ExpressQuote) -> bool {
    provider.provider_type.is_on_chain() && quote.allowance.is_some()
}

/// Turns quotes into [`ProviderQuote`]s by asking the fee provider
#[derive(Clone)]
pub struct FeeResolver {
    fee_provider: Arc<dyn FeeProvider>,
    timeout: Duration,
    default_gas_limit: u64,
}

impl fmt::Debug for FeeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeeResolver")
            .field("timeout", &self.timeout)
            .field("default_gas_limit", &self.default_gas_limit)
            .finish()
    }
}

impl FeeResolver {
    /// Creates a resolver with a 10 second budget per estimate
    pub fn new(fee_provider: Arc<dyn FeeProvider>) -> Self {
        Self {
            fee_provider,
            timeout: Duration::from_secs(10),
            default_gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    /// Sets the budget for one fee estimate
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the gas limit used when a quote carries none
    pub fn with_default_gas_limit(mut self, gas_limit: u64) -> Self {
        self.default_gas_limit = gas_limit;
        self
    }

    /// Resolves the fee for `quote` from `provider`
    pub async fn resolve(
        &self,
        provider: &ExpressProvider,
        quote: ExpressQuote,
        policy: ExpressApprovePolicy,
    ) -> Result<ProviderQuote> {
        match provider.provider_type {
            ExpressProviderType::Cex => {
                let fee = with_timeout(
                    self.timeout,
                    "estimated_fee",
                    self.fee_provider.estimated_fee(quote.from_amount),
                )
                .await?;
                Ok(ProviderQuote {
                    quote,
                    fee,
                    approve: None,
                })
            }
            ExpressProviderType::Dex | ExpressProviderType::DexBridge => match &quote.allowance {
                Some(allowance) => {
                    let approve = self
                        .approve_requirement(&allowance.spender, quote.from_amount, policy)
                        .await?;
                    Ok(ProviderQuote {
                        fee: approve.fee,
                        approve: Some(approve),
                        quote,
                    })
                }
                None => {
                    let gas_limit = quote.estimated_gas_limit.unwrap_or(self.default_gas_limit);
                    let fee = with_timeout(
                        self.timeout,
                        "estimated_fee_for_gas_limit",
                        self.fee_provider.estimated_fee_for_gas_limit(gas_limit),
                    )
                    .await?;
                    Ok(ProviderQuote {
                        quote,
                        fee: ExpressFee::Single(fee),
                        approve: None,
                    })
                }
            },
        }
    }

    /// Estimates the approval transaction for `amount` under `policy`
    pub async fn approve_requirement(
        &self,
        spender: &str,
        amount: Amount,
        policy: ExpressApprovePolicy,
    ) -> Result<ApproveRequirement> {
        let amount = approve_amount(amount, policy);
        let fee = with_timeout(
            self.timeout,
            "approve_fee",
            self.fee_provider.get_fee(amount, spender),
        )
        .await?;

        Ok(ApproveRequirement {
            spender: spender.to_string(),
            policy,
            amount,
            fee,
        })
    }
}
