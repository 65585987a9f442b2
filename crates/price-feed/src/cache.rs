use crate::error::PriceFeedError;
use crate::PriceSource;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Last known price per symbol.
///
/// Entries are overwritten by each successful refresh and otherwise never
/// expire: a stale price is still served.
#[derive(Debug, Clone, Default)]
pub struct PriceCache {
    prices: HashMap<String, Decimal>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a known table, e.g. a test fixture.
    pub fn with_prices(prices: HashMap<String, Decimal>) -> Self {
        Self { prices }
    }

    /// Polls `source` and merges the result in. A failed poll is logged and
    /// leaves the cache untouched; the returned count is the number of prices
    /// written.
    pub async fn refresh(&mut self, source: &dyn PriceSource, symbols: &[String]) -> usize {
        match self.try_refresh(source, symbols).await {
            Ok(updated) => {
                tracing::debug!(source = source.name(), updated, "price cache refreshed");
                updated
            }
            Err(e) => {
                tracing::warn!(source = source.name(), error = %e, "price refresh failed, keeping cached prices");
                0
            }
        }
    }

    async fn try_refresh(
        &mut self,
        source: &dyn PriceSource,
        symbols: &[String],
    ) -> Result<usize, PriceFeedError> {
        let fresh = source.fetch(symbols).await?;
        if fresh.is_empty() {
            return Err(PriceFeedError::EmptyResponse(symbols.join(",")));
        }
        let updated = fresh.len();
        self.prices.extend(fresh);
        Ok(updated)
    }

    pub fn get(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }
}
