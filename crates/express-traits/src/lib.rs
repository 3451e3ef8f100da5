//! # Express Traits
//!
//! Domain types and collaborator traits for the Express quote aggregation SDK.
//! The manager in the `express` crate only ever talks to the traits defined
//! here, so provider back-ends, fee estimation and the on-ramp catalog can be
//! swapped for HTTP clients, chain SDKs or test stubs.
//!
//! ## Core Traits
//!
//! - [`QuoteProvider`] - Quotes and trade initiation for one exchange provider
//! - [`FeeProvider`] - Network fee estimation for the source wallet
//! - [`OnrampRepository`] - Remote on-ramp catalog (payment methods, currencies, pairs)
//! - [`PaymentCapability`] - Platform wallet payment support
//!
//! ## Example
//!
//! ```ignore
//! use express_traits::prelude::*;
//!
//! async fn best_rate<P: QuoteProvider>(
//!     provider: &P,
//!     pair: &ExpressManagerSwappingPair,
//!     amount: Amount,
//! ) -> Result<Amount, ExpressError> {
//!     let quote = provider.quote(pair, amount, ExpressApprovePolicy::Unlimited).await?;
//!     Ok(quote.expect_amount)
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod amount;
mod currency;
mod fee;
mod onramp;
mod provider;

pub use amount::Amount;
pub use currency::{
    ExpressAsset, ExpressCurrency, ExpressManagerSwappingPair, NATIVE_CONTRACT_ADDRESS,
};
pub use express_error::{ExpressError, Result};
pub use fee::{ExpressFee, ExpressFeeOption, Fee, FeeProvider};
pub use onramp::{
    OnrampCurrency, OnrampPair, OnrampPaymentMethod, OnrampPaymentMethodType, OnrampRepository,
    PaymentCapability,
};
pub use provider::{
    AllowanceRequirement, ApproveRequirement, ExchangeDataRequest, ExpressApprovePolicy,
    ExpressAvailableProvider, ExpressProvider, ExpressProviderType, ExpressQuote,
    ExpressTransactionData, ProviderQuote, QuoteProvider,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Amount, ExpressApprovePolicy, ExpressAsset, ExpressAvailableProvider, ExpressCurrency,
        ExpressError, ExpressFee, ExpressFeeOption, ExpressManagerSwappingPair, ExpressProvider,
        ExpressProviderType, ExpressQuote, Fee, FeeProvider, OnrampPaymentMethod,
        OnrampRepository, PaymentCapability, QuoteProvider, Result,
    };
}
