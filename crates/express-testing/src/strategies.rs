//! Proptest strategies for Express domain values

use express_traits::{
    Amount, ExpressFee, ExpressFeeOption, ExpressProviderType, Fee, OnrampPaymentMethod,
};
use proptest::prelude::*;

/// Decimals used by real currencies
pub fn decimals() -> impl Strategy<Value = u8> {
    prop_oneof![Just(0u8), Just(2u8), Just(6u8), Just(8u8), Just(9u8), Just(18u8)]
}

/// Any amount, zero included
pub fn amount() -> impl Strategy<Value = Amount> {
    (any::<u64>(), decimals()).prop_map(|(value, decimals)| Amount::from_smallest_unit(value as u128, decimals))
}

/// Strictly positive amount with the given decimals
pub fn nonzero_amount(decimals: u8) -> impl Strategy<Value = Amount> {
    (1u128..=u64::MAX as u128).prop_map(move |value| Amount::from_smallest_unit(value, decimals))
}

/// A fee in 18-decimal units, optionally with a gas limit
pub fn fee() -> impl Strategy<Value = Fee> {
    (0u128..1_000_000_000_000_000_000u128, proptest::option::of(21_000u64..2_000_000)).prop_map(
        |(value, gas_limit)| Fee {
            amount: Amount::from_smallest_unit(value, 18),
            gas_limit,
        },
    )
}

/// Single- or dual-rate fee
pub fn express_fee() -> impl Strategy<Value = ExpressFee> {
    prop_oneof![
        fee().prop_map(ExpressFee::Single),
        (fee(), fee()).prop_map(|(market, fast)| ExpressFee::Double { market, fast }),
    ]
}

/// Either fee option
pub fn fee_option() -> impl Strategy<Value = ExpressFeeOption> {
    prop_oneof![Just(ExpressFeeOption::Market), Just(ExpressFeeOption::Fast)]
}

/// Any provider type
pub fn provider_type() -> impl Strategy<Value = ExpressProviderType> {
    prop_oneof![
        Just(ExpressProviderType::Cex),
        Just(ExpressProviderType::Dex),
        Just(ExpressProviderType::DexBridge),
    ]
}

/// A payment method from a mix of known and unknown catalog ids
pub fn payment_method() -> impl Strategy<Value = OnrampPaymentMethod> {
    prop_oneof![
        Just("card"),
        Just("apple-pay"),
        Just("google-pay"),
        Just("bank-transfer"),
        Just("sepa"),
        Just("pix"),
        Just("ideal"),
    ]
    .prop_map(|id| OnrampPaymentMethod::new(id, id.to_uppercase()))
}

/// Catalog of up to eight payment methods, duplicates allowed
pub fn payment_methods() -> impl Strategy<Value = Vec<OnrampPaymentMethod>> {
    proptest::collection::vec(payment_method(), 0..8)
}

/// Quoted amounts for `count` providers, ties likely
pub fn expect_amounts(count: usize) -> impl Strategy<Value = Vec<u128>> {
    proptest::collection::vec(0u128..5, count)
}
