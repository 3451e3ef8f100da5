//! On-ramp (fiat purchase) catalog types and data sources.

use crate::ExpressAsset;
use async_trait::async_trait;
use express_error::Result;
use serde::{Deserialize, Serialize};

/// A fiat currency accepted for purchases
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OnrampCurrency {
    /// ISO 4217 code
    pub code: String,
    /// Display name
    pub name: String,
    /// Decimal places shown to the user
    pub precision: u8,
}

/// A wallet asset purchasable with a fiat currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnrampPair {
    /// Fiat currency paid
    pub fiat: OnrampCurrency,
    /// Asset received
    pub asset: ExpressAsset,
}

/// Payment method family
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnrampPaymentMethodType {
    /// Debit or credit card
    Card,
    /// Apple Pay
    ApplePay,
    /// Google Pay
    GooglePay,
    /// Bank transfer
    BankTransfer,
    /// SEPA transfer
    Sepa,
    /// Anything the catalog adds later
    Other(String),
}

impl OnrampPaymentMethodType {
    /// Maps a catalog identifier to a method type
    pub fn from_id(id: &str) -> Self {
        match id {
            "card" => OnrampPaymentMethodType::Card,
            "apple-pay" => OnrampPaymentMethodType::ApplePay,
            "google-pay" => OnrampPaymentMethodType::GooglePay,
            "bank-transfer" => OnrampPaymentMethodType::BankTransfer,
            "sepa" => OnrampPaymentMethodType::Sepa,
            other => OnrampPaymentMethodType::Other(other.to_string()),
        }
    }
}

/// A payment method from the remote catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnrampPaymentMethod {
    /// Catalog identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Method family
    pub method_type: OnrampPaymentMethodType,
}

impl OnrampPaymentMethod {
    /// Creates a method whose type is derived from its catalog id
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            method_type: OnrampPaymentMethodType::from_id(&id),
            id,
            name: name.into(),
        }
    }
}

/// Remote on-ramp catalog
#[async_trait]
pub trait OnrampRepository: Send + Sync {
    /// All payment methods the on-ramp back-end offers
    async fn payment_methods(&self) -> Result<Vec<OnrampPaymentMethod>>;

    /// Fiat currencies accepted for purchases
    async fn currencies(&self) -> Result<Vec<OnrampCurrency>>;

    /// Which of `assets` can be bought with `fiat`
    async fn pairs(&self, fiat: &OnrampCurrency, assets: &[ExpressAsset]) -> Result<Vec<OnrampPair>>;
}

/// Platform wallet payment capability (Apple Pay and similar)
pub trait PaymentCapability: Send + Sync {
    /// Whether the device can complete a platform wallet payment
    fn can_make_payments(&self) -> bool;
}
