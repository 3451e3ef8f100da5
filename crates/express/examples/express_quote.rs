//! Quote an ETH -> USDT swap against an Express API
//!
//! ```bash
//! EXPRESS_API_URL=https://express.example.com/v1/ cargo run -p express --example express_quote
//! ```

use anyhow::Context;
use async_trait::async_trait;
use express::prelude::*;
use express::{ExpressApiClient, HttpQuoteProvider};
use std::sync::Arc;

/// Flat fees, standing in for a wallet's chain SDK
struct FixedFees;

#[async_trait]
impl FeeProvider for FixedFees {
    async fn estimated_fee(&self, _amount: Amount) -> express::Result<ExpressFee> {
        Ok(ExpressFee::Double {
            market: Fee::new(Amount::from_smallest_unit(420_000_000_000_000, 18)),
            fast: Fee::new(Amount::from_smallest_unit(630_000_000_000_000, 18)),
        })
    }

    async fn estimated_fee_for_gas_limit(&self, gas_limit: u64) -> express::Result<Fee> {
        let wei = u128::from(gas_limit) * 20_000_000_000;
        Ok(Fee::new(Amount::from_smallest_unit(wei, 18)).with_gas_limit(gas_limit))
    }

    async fn get_fee(&self, amount: Amount, _destination: &str) -> express::Result<ExpressFee> {
        self.estimated_fee(amount).await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ExpressConfig::load_with_env("express.json").context("loading express.json")?;
    config.validate()?;
    init_tracing(&config.logging)?;

    let client = Arc::new(ExpressApiClient::new(config.api_client_config())?);
    let mut pool = ProviderPool::new();
    pool.register(Arc::new(HttpQuoteProvider::new(
        ExpressProvider::new("changenow", "ChangeNOW", ExpressProviderType::Cex),
        client.clone(),
    )))?;
    pool.register(Arc::new(
        HttpQuoteProvider::new(
            ExpressProvider::new("1inch", "1inch", ExpressProviderType::Dex).with_priority(10),
            client,
        )
        .with_networks(["ethereum"]),
    ))?;

    let manager = ExpressManager::new(pool, Arc::new(FixedFees), ManagerConfig::from(&config));

    let pair = ExpressManagerSwappingPair::new(
        ExpressAsset::new(ExpressCurrency::coin("ethereum", "ETH", 18), "0x0000000000000000000000000000000000000001"),
        ExpressAsset::new(
            ExpressCurrency::token("0xdac17f958d2ee523a2206206994597c13d831ec7", "ethereum", "USDT", 6),
            "0x0000000000000000000000000000000000000001",
        ),
    );
    manager.update_pair(pair).await?;

    let amount = Amount::from_decimal_str("0.5", 18)?;
    let state = manager
        .update_amount(Some(amount), ExpressProviderUpdateSource::AmountChange)
        .await?;

    for entry in &state.providers {
        match &entry.result {
            Ok(quote) => println!(
                "{:<12} {:>14.4} USDT{}",
                entry.provider.id,
                quote.quote.expect_amount.human_readable(),
                if entry.is_best { "  (best)" } else { "" }
            ),
            Err(error) => println!("{:<12} unavailable: {}", entry.provider.id, error),
        }
    }

    match &state.status {
        ExpressStatus::Ready(ready) => {
            println!("selected {} with fee {:?}", ready.provider.id, ready.selected_fee);
            if ready.provider.provider_type == ExpressProviderType::Cex {
                let data = manager.request_data().await?;
                println!("send {} to {}", data.value.human_readable(), data.destination_address);
            }
        }
        ExpressStatus::Failed(error) => println!("no quote: {}", error),
        other => println!("status: {:?}", other),
    }

    manager.shutdown().await?;
    Ok(())
}
