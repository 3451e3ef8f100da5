//! Exchange providers, their quotes and the quote provider seam.

use crate::{Amount, ExpressFee, ExpressManagerSwappingPair, Fee};
use async_trait::async_trait;
use express_error::{ExpressError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Provider back-end family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressProviderType {
    /// Custodial exchange: user sends funds to a deposit address
    Cex,
    /// On-chain swap on a single network
    Dex,
    /// On-chain swap that bridges networks
    DexBridge,
}

impl ExpressProviderType {
    /// Returns true for providers executed through a contract call
    pub fn is_on_chain(&self) -> bool {
        matches!(self, ExpressProviderType::Dex | ExpressProviderType::DexBridge)
    }
}

impl fmt::Display for ExpressProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpressProviderType::Cex => "cex",
            ExpressProviderType::Dex => "dex",
            ExpressProviderType::DexBridge => "dex-bridge",
        };
        f.write_str(name)
    }
}

/// Identity of an exchange provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpressProvider {
    /// Unique provider identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Back-end family
    pub provider_type: ExpressProviderType,
    /// Tie-break rank, lower wins
    pub priority: u32,
}

impl ExpressProvider {
    /// Creates a provider identity with default priority
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        provider_type: ExpressProviderType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider_type,
            priority: 100,
        }
    }

    /// Sets the priority
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// On-chain allowance strategy for DEX providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExpressApprovePolicy {
    /// Approve exactly the swap amount
    Specified,
    /// Approve the maximum amount once
    #[default]
    Unlimited,
}

/// The quote needs a token allowance granted to `spender`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceRequirement {
    /// Contract that must be allowed to spend the source token
    pub spender: String,
}

/// A provider's price for the current pair and amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressQuote {
    /// Amount sent, in the source currency
    pub from_amount: Amount,
    /// Amount expected, in the destination currency
    pub expect_amount: Amount,
    /// Set when an approval transaction must precede the swap
    pub allowance: Option<AllowanceRequirement>,
    /// Gas estimate for the swap transaction (on-chain providers)
    pub estimated_gas_limit: Option<u64>,
}

impl ExpressQuote {
    /// Creates a quote without allowance or gas data
    pub fn new(from_amount: Amount, expect_amount: Amount) -> Self {
        Self {
            from_amount,
            expect_amount,
            allowance: None,
            estimated_gas_limit: None,
        }
    }

    /// Marks the quote as requiring an allowance for `spender`
    pub fn with_allowance(mut self, spender: impl Into<String>) -> Self {
        self.allowance = Some(AllowanceRequirement {
            spender: spender.into(),
        });
        self
    }

    /// Sets the gas estimate
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.estimated_gas_limit = Some(gas_limit);
        self
    }
}

/// Approval transaction the user must sign before swapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRequirement {
    /// Allowance spender
    pub spender: String,
    /// Policy the approval was estimated with
    pub policy: ExpressApprovePolicy,
    /// Allowance amount
    pub amount: Amount,
    /// Fee of the approval transaction
    pub fee: ExpressFee,
}

/// A successful quote with its resolved fee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderQuote {
    /// The provider's quote
    pub quote: ExpressQuote,
    /// Fee the user pays to execute it
    pub fee: ExpressFee,
    /// Approval needed before executing, if any
    pub approve: Option<ApproveRequirement>,
}

/// A provider and its latest result for the current pair and amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressAvailableProvider {
    /// Provider identity
    pub provider: ExpressProvider,
    /// Quote with fee, or the typed failure this provider reported
    pub result: std::result::Result<ProviderQuote, ExpressError>,
    /// Best rate among the successful providers
    pub is_best: bool,
}

impl ExpressAvailableProvider {
    /// Returns true if the provider produced a quote
    pub fn is_available(&self) -> bool {
        self.result.is_ok()
    }

    /// The quote, if any
    pub fn quote(&self) -> Option<&ProviderQuote> {
        self.result.as_ref().ok()
    }

    /// The failure, if any
    pub fn error(&self) -> Option<&ExpressError> {
        self.result.as_ref().err()
    }
}

/// Request for CEX trade initiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeDataRequest {
    /// Provider to trade with
    pub provider_id: String,
    /// Pair being swapped
    pub pair: ExpressManagerSwappingPair,
    /// Amount sent
    pub amount: Amount,
    /// Amount the user saw when confirming
    pub expect_amount: Amount,
}

/// Transaction data returned by trade initiation, ready for signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressTransactionData {
    /// Provider-side exchange identifier
    pub request_id: String,
    /// Provider that issued the data
    pub provider_id: String,
    /// Wallet funds leave from
    pub source_address: String,
    /// Deposit or contract address to send to
    pub destination_address: String,
    /// Amount to send
    pub value: Amount,
    /// Memo / destination tag, if the network needs one
    pub extra_destination_id: Option<String>,
    /// Contract call data, if any
    pub tx_data: Option<String>,
    /// Fee chosen by the user, filled in by the manager
    pub fee: Option<Fee>,
}

/// Quote source for one exchange provider.
///
/// Implementations are read-only collaborators: the manager may call them
/// concurrently and may drop an in-flight future when the request is superseded.
#[async_trait]
pub trait QuoteProvider: Send + Sync + Debug {
    /// Provider identity
    fn provider(&self) -> &ExpressProvider;

    /// Provider identifier
    fn id(&self) -> &str {
        &self.provider().id
    }

    /// Whether this provider can quote `pair` at all
    fn supports(&self, _pair: &ExpressManagerSwappingPair) -> bool {
        true
    }

    /// Quote `amount` of the pair's source currency
    async fn quote(
        &self,
        pair: &ExpressManagerSwappingPair,
        amount: Amount,
        approve_policy: ExpressApprovePolicy,
    ) -> Result<ExpressQuote>;

    /// Initiate the trade and return the transaction to sign.
    ///
    /// Default implementation returns NotSupported error.
    async fn exchange_data(&self, _request: &ExchangeDataRequest) -> Result<ExpressTransactionData> {
        Err(ExpressError::NotSupported(format!(
            "exchange_data for provider {}",
            self.id()
        )))
    }
}
