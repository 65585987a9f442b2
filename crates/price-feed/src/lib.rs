use async_trait::async_trait;
use configuration::{PriceBackend, PriceFeedConfig};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub mod cache;
pub mod error;
pub mod sources;

// --- Public API ---
pub use cache::PriceCache;
pub use error::PriceFeedError;
pub use sources::{CoinstatsSource, CryptoCompareSource, FixedPriceSource};

/// An external source of current prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetches current prices for `symbols`. Sources that return a fixed
    /// listing may include symbols that were not asked for.
    async fn fetch(&self, symbols: &[String]) -> Result<HashMap<String, Decimal>, PriceFeedError>;

    fn name(&self) -> &'static str;
}

/// Builds the source selected by `config.backend`.
pub fn build_source(config: &PriceFeedConfig) -> Result<Box<dyn PriceSource>, PriceFeedError> {
    let source: Box<dyn PriceSource> = match config.backend {
        PriceBackend::Coinstats => Box::new(CoinstatsSource::new(
            &config.url,
            config.limit,
            &config.currency,
            config.request_timeout_secs,
        )?),
        PriceBackend::CryptoCompare => Box::new(CryptoCompareSource::new(
            &config.url,
            &config.currency,
            config.request_timeout_secs,
        )?),
        PriceBackend::Fixed => Box::new(FixedPriceSource::new(config.fixed.clone())),
    };
    tracing::info!(backend = source.name(), url = %config.url, "price source ready");
    Ok(source)
}
