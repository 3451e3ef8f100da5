//! Quote provider backed by the Express HTTP API

use crate::client::ExpressApiClient;
use async_trait::async_trait;
use express_error::{ExpressError, Result};
use express_traits::{
    Amount, ExchangeDataRequest, ExpressApprovePolicy, ExpressManagerSwappingPair,
    ExpressProvider, ExpressQuote, ExpressTransactionData, QuoteProvider,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

const QUOTE_PATH: &str = "exchange-quote";
const EXCHANGE_DATA_PATH: &str = "exchange-data";

/// `exchange-quote` response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    from_amount: String,
    from_decimals: u8,
    to_amount: String,
    to_decimals: u8,
    #[serde(default)]
    allowance_contract: Option<String>,
    #[serde(default)]
    estimated_gas_limit: Option<u64>,
}

/// `exchange-data` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeDataBody<'a> {
    provider_id: &'a str,
    from_contract_address: &'a str,
    from_network: &'a str,
    from_address: &'a str,
    from_amount: String,
    from_decimals: u8,
    to_contract_address: &'a str,
    to_network: &'a str,
    to_address: &'a str,
    to_amount: String,
    to_decimals: u8,
}

/// `exchange-data` response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeDataResponse {
    tx_id: String,
    tx_from: Option<String>,
    tx_to: String,
    tx_value: String,
    #[serde(default)]
    tx_extra_id: Option<String>,
    #[serde(default)]
    tx_data: Option<String>,
}

fn parse_units(value: &str, field: &str) -> Result<u128> {
    value
        .parse::<u128>()
        .map_err(|e| ExpressError::Json(format!("invalid {}: {} ({})", field, value, e)))
}

/// One exchange provider reached through the Express back-end.
///
/// Several instances share one [`ExpressApiClient`]; the provider id is sent
/// with every request so the back-end routes it.
#[derive(Debug, Clone)]
pub struct HttpQuoteProvider {
    provider: ExpressProvider,
    client: Arc<ExpressApiClient>,
    networks: Option<HashSet<String>>,
}

impl HttpQuoteProvider {
    /// Creates a provider that accepts every pair
    pub fn new(provider: ExpressProvider, client: Arc<ExpressApiClient>) -> Self {
        Self {
            provider,
            client,
            networks: None,
        }
    }

    /// Restricts the provider to pairs whose both sides are on `networks`
    pub fn with_networks<I, S>(mut self, networks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.networks = Some(networks.into_iter().map(Into::into).collect());
        self
    }

    fn quote_query(
        &self,
        pair: &ExpressManagerSwappingPair,
        amount: Amount,
        approve_policy: ExpressApprovePolicy,
    ) -> Vec<(&'static str, String)> {
        let source = &pair.source.currency;
        let destination = &pair.destination.currency;
        let policy = match approve_policy {
            ExpressApprovePolicy::Specified => "specified",
            ExpressApprovePolicy::Unlimited => "unlimited",
        };
        vec![
            ("providerId", self.provider.id.clone()),
            ("fromContractAddress", source.contract_address.clone()),
            ("fromNetwork", source.network.clone()),
            ("toContractAddress", destination.contract_address.clone()),
            ("toNetwork", destination.network.clone()),
            ("fromAmount", amount.value.to_string()),
            ("fromDecimals", amount.decimals.to_string()),
            ("toDecimals", destination.decimals.to_string()),
            ("approvePolicy", policy.to_string()),
        ]
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteProvider {
    fn provider(&self) -> &ExpressProvider {
        &self.provider
    }

    fn supports(&self, pair: &ExpressManagerSwappingPair) -> bool {
        match &self.networks {
            Some(networks) => {
                networks.contains(&pair.source.currency.network)
                    && networks.contains(&pair.destination.currency.network)
            }
            None => true,
        }
    }

    async fn quote(
        &self,
        pair: &ExpressManagerSwappingPair,
        amount: Amount,
        approve_policy: ExpressApprovePolicy,
    ) -> Result<ExpressQuote> {
        let query = self.quote_query(pair, amount, approve_policy);
        let response: QuoteResponse = self.client.get_json(QUOTE_PATH, &query).await?;

        let from_amount = Amount::from_smallest_unit(
            parse_units(&response.from_amount, "fromAmount")?,
            response.from_decimals,
        );
        let expect_amount = Amount::from_smallest_unit(
            parse_units(&response.to_amount, "toAmount")?,
            response.to_decimals,
        );

        let mut quote = ExpressQuote::new(from_amount, expect_amount);
        if let Some(spender) = response.allowance_contract {
            quote = quote.with_allowance(spender);
        }
        if let Some(gas_limit) = response.estimated_gas_limit {
            quote = quote.with_gas_limit(gas_limit);
        }

        trace!(
            provider_id = %self.provider.id,
            pair = %pair,
            expect_amount = %quote.expect_amount,
            "received quote"
        );
        Ok(quote)
    }

    async fn exchange_data(&self, request: &ExchangeDataRequest) -> Result<ExpressTransactionData> {
        let source = &request.pair.source;
        let destination = &request.pair.destination;
        let body = ExchangeDataBody {
            provider_id: &self.provider.id,
            from_contract_address: &source.currency.contract_address,
            from_network: &source.currency.network,
            from_address: &source.address,
            from_amount: request.amount.value.to_string(),
            from_decimals: request.amount.decimals,
            to_contract_address: &destination.currency.contract_address,
            to_network: &destination.currency.network,
            to_address: &destination.address,
            to_amount: request.expect_amount.value.to_string(),
            to_decimals: request.expect_amount.decimals,
        };

        let response: ExchangeDataResponse =
            self.client.post_json(EXCHANGE_DATA_PATH, &body).await?;

        debug!(
            provider_id = %self.provider.id,
            request_id = %response.tx_id,
            "exchange data received"
        );

        Ok(ExpressTransactionData {
            request_id: response.tx_id,
            provider_id: self.provider.id.clone(),
            source_address: response.tx_from.unwrap_or_else(|| source.address.clone()),
            destination_address: response.tx_to,
            value: Amount::from_smallest_unit(
                parse_units(&response.tx_value, "txValue")?,
                request.amount.decimals,
            ),
            extra_destination_id: response.tx_extra_id,
            tx_data: response.tx_data,
            fee: None,
        })
    }
}
