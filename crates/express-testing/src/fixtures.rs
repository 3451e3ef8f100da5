//! Ready-made currencies, pairs, providers and payment methods

use express_traits::{
    Amount, ExpressAsset, ExpressCurrency, ExpressManagerSwappingPair, ExpressProvider,
    ExpressProviderType, OnrampPaymentMethod, ExpressTransactionData,
};

/// Wallet address used for every Ethereum fixture asset
pub const ETH_WALLET: &str = "0x742d35Cc6634C0532925a3b8D2a27F79c5a85b03";

/// Wallet address used for the Bitcoin fixture asset
pub const BTC_WALLET: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";

/// USDT contract on Ethereum
pub const USDT_CONTRACT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

/// Ether
pub fn eth() -> ExpressCurrency {
    ExpressCurrency::coin("ethereum", "ETH", 18)
}

/// Tether on Ethereum
pub fn usdt() -> ExpressCurrency {
    ExpressCurrency::token(USDT_CONTRACT, "ethereum", "USDT", 6)
}

/// Bitcoin
pub fn btc() -> ExpressCurrency {
    ExpressCurrency::coin("bitcoin", "BTC", 8)
}

/// ETH -> USDT on Ethereum
pub fn eth_to_usdt() -> ExpressManagerSwappingPair {
    ExpressManagerSwappingPair::new(
        ExpressAsset::new(eth(), ETH_WALLET),
        ExpressAsset::new(usdt(), ETH_WALLET),
    )
}

/// USDT -> ETH on Ethereum (token source, needs allowance on DEXes)
pub fn usdt_to_eth() -> ExpressManagerSwappingPair {
    ExpressManagerSwappingPair::new(
        ExpressAsset::new(usdt(), ETH_WALLET),
        ExpressAsset::new(eth(), ETH_WALLET),
    )
}

/// BTC -> ETH across networks
pub fn btc_to_eth() -> ExpressManagerSwappingPair {
    ExpressManagerSwappingPair::new(
        ExpressAsset::new(btc(), BTC_WALLET),
        ExpressAsset::new(eth(), ETH_WALLET),
    )
}

/// 1 ETH
pub fn one_eth() -> Amount {
    Amount::from_smallest_unit(1_000_000_000_000_000_000, 18)
}

/// `value` smallest units of ETH
pub fn wei(value: u128) -> Amount {
    Amount::from_smallest_unit(value, 18)
}

/// `value` smallest units of USDT
pub fn usdt_units(value: u128) -> Amount {
    Amount::from_smallest_unit(value, 6)
}

/// Custodial exchange provider
pub fn cex(id: &str) -> ExpressProvider {
    ExpressProvider::new(id, format!("{} exchange", id), ExpressProviderType::Cex)
}

/// On-chain swap provider
pub fn dex(id: &str) -> ExpressProvider {
    ExpressProvider::new(id, format!("{} swap", id), ExpressProviderType::Dex)
}

/// Cross-chain swap provider
pub fn dex_bridge(id: &str) -> ExpressProvider {
    ExpressProvider::new(id, format!("{} bridge", id), ExpressProviderType::DexBridge)
}

/// Card payment method
pub fn card() -> OnrampPaymentMethod {
    OnrampPaymentMethod::new("card", "Card")
}

/// Apple Pay payment method
pub fn apple_pay() -> OnrampPaymentMethod {
    OnrampPaymentMethod::new("apple-pay", "Apple Pay")
}

/// Google Pay payment method
pub fn google_pay() -> OnrampPaymentMethod {
    OnrampPaymentMethod::new("google-pay", "Google Pay")
}

/// Bank transfer payment method
pub fn bank_transfer() -> OnrampPaymentMethod {
    OnrampPaymentMethod::new("bank-transfer", "Bank transfer")
}

/// SEPA transfer payment method
pub fn sepa() -> OnrampPaymentMethod {
    OnrampPaymentMethod::new("sepa", "SEPA")
}

/// Trade data as a CEX would return it for `pair` and `amount`
pub fn transaction_data(
    provider_id: &str,
    pair: &ExpressManagerSwappingPair,
    amount: Amount,
) -> ExpressTransactionData {
    ExpressTransactionData {
        request_id: format!("{}-exchange", provider_id),
        provider_id: provider_id.to_string(),
        source_address: pair.source.address.clone(),
        destination_address: format!("deposit-{}", provider_id),
        value: amount,
        extra_destination_id: None,
        tx_data: None,
        fee: None,
    }
}
