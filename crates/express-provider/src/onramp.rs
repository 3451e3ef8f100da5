//! On-ramp catalog backed by the Express HTTP API

use crate::client::ExpressApiClient;
use async_trait::async_trait;
use dashmap::DashMap;
use express_error::Result;
use express_traits::{
    ExpressAsset, OnrampCurrency, OnrampPair, OnrampPaymentMethod, OnrampRepository,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const PAYMENT_METHODS_PATH: &str = "onramp-payment-methods";
const CURRENCIES_PATH: &str = "onramp-currencies";
const PAIRS_PATH: &str = "onramp-pairs";

#[derive(Debug, Clone, Deserialize)]
struct PaymentMethodDto {
    id: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairAssetDto {
    network: String,
    contract_address: String,
}

/// A cached response
#[derive(Debug, Clone)]
struct CachedResponse {
    data: Vec<u8>,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedResponse {
    fn is_valid(&self) -> bool {
        self.cached_at.elapsed() < self.ttl
    }
}

/// Remote on-ramp catalog with a TTL cache for the slow-changing lists
#[derive(Debug)]
pub struct HttpOnrampRepository {
    client: Arc<ExpressApiClient>,
    cache: DashMap<String, CachedResponse>,
    cache_ttl: Duration,
}

impl HttpOnrampRepository {
    /// Creates a repository caching for five minutes
    pub fn new(client: Arc<ExpressApiClient>) -> Self {
        Self {
            client,
            cache: DashMap::new(),
            cache_ttl: Duration::from_secs(300),
        }
    }

    /// Sets the cache TTL; zero disables caching
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Drops expired cache entries
    pub fn clear_expired_cache(&self) {
        self.cache.retain(|_, v| v.is_valid());
    }

    /// Drops every cache entry
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    fn get_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.cache.get(key)?;
        if !entry.is_valid() {
            return None;
        }
        serde_json::from_slice(&entry.data).ok()
    }

    fn cache_response<T: Serialize>(&self, key: &str, value: &T) {
        if self.cache_ttl.is_zero() {
            return;
        }
        if let Ok(data) = serde_json::to_vec(value) {
            self.cache.insert(
                key.to_string(),
                CachedResponse {
                    data,
                    cached_at: Instant::now(),
                    ttl: self.cache_ttl,
                },
            );
        }
    }
}

#[async_trait]
impl OnrampRepository for HttpOnrampRepository {
    async fn payment_methods(&self) -> Result<Vec<OnrampPaymentMethod>> {
        if let Some(methods) = self.get_cached(PAYMENT_METHODS_PATH) {
            return Ok(methods);
        }

        let dtos: Vec<PaymentMethodDto> = self.client.get_json(PAYMENT_METHODS_PATH, &[]).await?;
        let methods: Vec<_> = dtos
            .into_iter()
            .map(|dto| OnrampPaymentMethod::new(dto.id, dto.name))
            .collect();

        debug!(count = methods.len(), "loaded on-ramp payment methods");
        self.cache_response(PAYMENT_METHODS_PATH, &methods);
        Ok(methods)
    }

    async fn currencies(&self) -> Result<Vec<OnrampCurrency>> {
        if let Some(currencies) = self.get_cached(CURRENCIES_PATH) {
            return Ok(currencies);
        }

        let currencies: Vec<OnrampCurrency> = self.client.get_json(CURRENCIES_PATH, &[]).await?;
        self.cache_response(CURRENCIES_PATH, &currencies);
        Ok(currencies)
    }

    async fn pairs(&self, fiat: &OnrampCurrency, assets: &[ExpressAsset]) -> Result<Vec<OnrampPair>> {
        if assets.is_empty() {
            return Ok(Vec::new());
        }

        let requested = assets
            .iter()
            .map(|a| format!("{}:{}", a.currency.network, a.currency.contract_address))
            .collect::<Vec<_>>()
            .join(",");
        let query = [("fiat", fiat.code.clone()), ("assets", requested)];
        let available: Vec<PairAssetDto> = self.client.get_json(PAIRS_PATH, &query).await?;

        // Keep the caller's asset order; the back-end answer is a set.
        let pairs = assets
            .iter()
            .filter(|asset| {
                available.iter().any(|dto| {
                    dto.network == asset.currency.network
                        && dto.contract_address == asset.currency.contract_address
                })
            })
            .map(|asset| OnrampPair {
                fiat: fiat.clone(),
                asset: asset.clone(),
            })
            .collect();
        Ok(pairs)
    }
}
