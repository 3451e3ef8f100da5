//! # Express Testing Infrastructure
//!
//! Test doubles and generators for the Express SDK:
//! - Timing-controlled quote providers with call tracking
//! - Fee provider and on-ramp repository stubs
//! - Currency, pair and provider fixtures
//! - Property-based testing strategies
//!
//! ## Usage
//!
//! ```rust,ignore
//! use express_testing::{fixtures, StubQuoteProvider};
//! use std::time::Duration;
//!
//! let slow = StubQuoteProvider::new(fixtures::cex("slow"))
//!     .with_delay(Duration::from_millis(500))
//!     .with_expect_amount(fixtures::usdt_units(2_500_000_000));
//!
//! proptest! {
//!     #[test]
//!     fn fee_is_total(fee in strategies::express_fee(), option in strategies::fee_option()) {
//!         let _ = fee.fee(option);
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod strategies;
mod stubs;

pub use stubs::{
    CallTracker, StaticPaymentCapability, StubFeeProvider, StubOnrampRepository,
    StubQuoteProvider, STUB_GAS_PRICE,
};
