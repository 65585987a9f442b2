use crate::error::PriceFeedError;
use crate::PriceSource;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, PriceFeedError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, PriceFeedError> {
    let response = client.get(url).query(query).send().await?.error_for_status()?;
    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| PriceFeedError::Deserialization(format!("{}. Original text: {}", e, text)))
}

fn to_decimal(symbol: &str, price: f64) -> Option<Decimal> {
    match Decimal::from_f64(price) {
        None => {
            tracing::debug!(symbol, price, "dropping non-finite price");
            None
        }
        Some(value) if value <= Decimal::ZERO => {
            tracing::debug!(symbol, price, "dropping non-positive price");
            None
        }
        Some(value) => Some(value),
    }
}

// --- Coinstats ---

#[derive(Debug, Deserialize)]
struct CoinstatsResponse {
    coins: Vec<CoinstatsCoin>,
}

#[derive(Debug, Deserialize)]
struct CoinstatsCoin {
    symbol: String,
    price: f64,
}

/// The Coinstats public coin list. One request returns the top `limit` coins,
/// so every listed symbol is returned regardless of what was asked for.
pub struct CoinstatsSource {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
    currency: String,
}

impl CoinstatsSource {
    pub fn new(
        base_url: &str,
        limit: u32,
        currency: &str,
        timeout_secs: u64,
    ) -> Result<Self, PriceFeedError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
            currency: currency.to_string(),
        })
    }
}

#[async_trait]
impl PriceSource for CoinstatsSource {
    async fn fetch(&self, _symbols: &[String]) -> Result<HashMap<String, Decimal>, PriceFeedError> {
        let url = format!("{}/public/v1/coins", self.base_url);
        let query = [
            ("skip", "0".to_string()),
            ("limit", self.limit.to_string()),
            ("currency", self.currency.clone()),
        ];
        let body: CoinstatsResponse = get_json(&self.client, &url, &query).await?;
        Ok(body
            .coins
            .into_iter()
            .filter_map(|c| to_decimal(&c.symbol, c.price).map(|p| (c.symbol, p)))
            .collect())
    }

    fn name(&self) -> &'static str {
        "coinstats"
    }
}

// --- CryptoCompare ---

/// CryptoCompare's `pricemulti` endpoint: `{"ETH": {"USD": 1234.5}, ...}`.
pub struct CryptoCompareSource {
    client: reqwest::Client,
    base_url: String,
    currency: String,
}

impl CryptoCompareSource {
    pub fn new(base_url: &str, currency: &str, timeout_secs: u64) -> Result<Self, PriceFeedError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            currency: currency.to_string(),
        })
    }
}

#[async_trait]
impl PriceSource for CryptoCompareSource {
    async fn fetch(&self, symbols: &[String]) -> Result<HashMap<String, Decimal>, PriceFeedError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let url = format!("{}/data/pricemulti", self.base_url);
        let query = [("fsyms", symbols.join(",")), ("tsyms", self.currency.clone())];
        let body: HashMap<String, HashMap<String, f64>> =
            get_json(&self.client, &url, &query).await?;
        Ok(body
            .into_iter()
            .filter_map(|(symbol, quotes)| {
                let price = quotes.get(&self.currency).copied()?;
                to_decimal(&symbol, price).map(|p| (symbol, p))
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "cryptocompare"
    }
}

// --- Fixed ---

/// Serves a constant table. Used for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedPriceSource {
    prices: HashMap<String, Decimal>,
}

impl FixedPriceSource {
    pub fn new(prices: HashMap<String, Decimal>) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl PriceSource for FixedPriceSource {
    async fn fetch(&self, symbols: &[String]) -> Result<HashMap<String, Decimal>, PriceFeedError> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.prices.get(s).map(|p| (s.clone(), *p)))
            .collect())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
