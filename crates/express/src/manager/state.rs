//! Observable manager state

use express_error::ExpressError;
use express_traits::{
    Amount, ApproveRequirement, ExpressApprovePolicy, ExpressAvailableProvider, ExpressFee,
    ExpressFeeOption, ExpressManagerSwappingPair, ExpressProvider, ExpressQuote, Fee,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What triggered a state change. Recorded for logs and callers only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressProviderUpdateSource {
    /// The user edited the amount
    AmountChange,
    /// The pair was replaced
    PairChange,
    /// The user picked another provider
    ProviderSwitch,
    /// The allowance strategy changed
    ApprovePolicyChange,
    /// The user picked another fee rate
    FeeOptionChange,
    /// Explicit refresh, e.g. on quote expiry
    ManualRefresh,
}

impl fmt::Display for ExpressProviderUpdateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpressProviderUpdateSource::AmountChange => "amount_change",
            ExpressProviderUpdateSource::PairChange => "pair_change",
            ExpressProviderUpdateSource::ProviderSwitch => "provider_switch",
            ExpressProviderUpdateSource::ApprovePolicyChange => "approve_policy_change",
            ExpressProviderUpdateSource::FeeOptionChange => "fee_option_change",
            ExpressProviderUpdateSource::ManualRefresh => "manual_refresh",
        };
        f.write_str(name)
    }
}

/// The selected provider's quote with its fee resolved for the chosen option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressReadyQuote {
    /// Selected provider
    pub provider: ExpressProvider,
    /// Its quote
    pub quote: ExpressQuote,
    /// All fee rates for executing the quote
    pub fee: ExpressFee,
    /// `fee.fee(fee_option)` for the current option
    pub selected_fee: Fee,
    /// Approval required first, if any
    pub approve: Option<ApproveRequirement>,
}

/// Resolution status
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExpressStatus {
    /// Waiting for a pair and an amount
    #[default]
    Idle,
    /// Quotes or fees are being fetched
    Resolving,
    /// A quote is ready to execute
    Ready(ExpressReadyQuote),
    /// Resolution ended with a typed failure
    Failed(ExpressError),
}

impl ExpressStatus {
    /// Returns true while network work is in flight
    pub fn is_resolving(&self) -> bool {
        matches!(self, ExpressStatus::Resolving)
    }

    /// The ready quote, if any
    pub fn ready(&self) -> Option<&ExpressReadyQuote> {
        match self {
            ExpressStatus::Ready(ready) => Some(ready),
            _ => None,
        }
    }

    /// The failure, if any
    pub fn error(&self) -> Option<&ExpressError> {
        match self {
            ExpressStatus::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Short name for logs
    pub fn label(&self) -> &'static str {
        match self {
            ExpressStatus::Idle => "idle",
            ExpressStatus::Resolving => "resolving",
            ExpressStatus::Ready(_) => "ready",
            ExpressStatus::Failed(_) => "failed",
        }
    }
}

/// Immutable snapshot of a manager session.
///
/// A new value is published for every accepted change; holders of an older
/// snapshot keep seeing exactly what was committed at that time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpressManagerState {
    /// Current pair
    pub pair: Option<ExpressManagerSwappingPair>,
    /// Current amount in the source currency
    pub amount: Option<Amount>,
    /// Allowance strategy for DEX providers
    pub approve_policy: ExpressApprovePolicy,
    /// Chosen fee rate
    pub fee_option: ExpressFeeOption,
    /// Chosen provider
    pub selected_provider: Option<ExpressProvider>,
    /// Last resolved providers in registration order
    pub providers: Vec<ExpressAvailableProvider>,
    /// What caused the latest change
    pub update_source: Option<ExpressProviderUpdateSource>,
    /// Resolution status
    pub status: ExpressStatus,
}

impl ExpressManagerState {
    /// Entry for `provider_id` in the last resolved set
    pub fn provider(&self, provider_id: &str) -> Option<&ExpressAvailableProvider> {
        self.providers.iter().find(|p| p.provider.id == provider_id)
    }

    /// The best-rate entry, if any provider succeeded
    pub fn best_provider(&self) -> Option<&ExpressAvailableProvider> {
        self.providers.iter().find(|p| p.is_best)
    }
}
