//! Currencies, wallet assets and swapping pairs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Contract address used for a network's native coin
pub const NATIVE_CONTRACT_ADDRESS: &str = "0";

/// A currency on a specific network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpressCurrency {
    /// Token contract address, or [`NATIVE_CONTRACT_ADDRESS`] for the native coin
    pub contract_address: String,
    /// Network identifier (e.g., "ethereum", "bitcoin")
    pub network: String,
    /// Ticker symbol
    pub symbol: String,
    /// Number of decimal places
    pub decimals: u8,
}

impl ExpressCurrency {
    /// Creates a token currency
    pub fn token(
        contract_address: impl Into<String>,
        network: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
    ) -> Self {
        Self {
            contract_address: contract_address.into(),
            network: network.into(),
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Creates the native coin of a network
    pub fn coin(network: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self::token(NATIVE_CONTRACT_ADDRESS, network, symbol, decimals)
    }

    /// Returns true for a network's native coin
    pub fn is_native(&self) -> bool {
        self.contract_address == NATIVE_CONTRACT_ADDRESS
    }
}

impl fmt::Display for ExpressCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.network)
    }
}

/// A wallet holding a currency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpressAsset {
    /// The currency held
    pub currency: ExpressCurrency,
    /// Wallet address holding it
    pub address: String,
}

impl ExpressAsset {
    /// Creates a new asset
    pub fn new(currency: ExpressCurrency, address: impl Into<String>) -> Self {
        Self {
            currency,
            address: address.into(),
        }
    }
}

/// Source and destination of a swap.
///
/// Immutable: replacing the pair invalidates any in-flight quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpressManagerSwappingPair {
    /// Asset being sold
    pub source: ExpressAsset,
    /// Asset being bought
    pub destination: ExpressAsset,
}

impl ExpressManagerSwappingPair {
    /// Creates a new pair
    pub fn new(source: ExpressAsset, destination: ExpressAsset) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Returns true when both sides live on the same network
    pub fn is_same_network(&self) -> bool {
        self.source.currency.network == self.destination.currency.network
    }
}

impl fmt::Display for ExpressManagerSwappingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source.currency, self.destination.currency)
    }
}
