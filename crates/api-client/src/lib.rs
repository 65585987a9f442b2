use crate::error::ApiError;
use async_trait::async_trait;
use core_types::{
    AccountRef, AssetInfo, Balances, Depth, MarketInfo, MarketSummary, Order, OrderRequest,
};
use rust_decimal::Decimal;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod error;
pub mod http;
pub mod responses;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

// --- Public API ---
pub use http::HttpExchangeClient;
pub use responses::ApiErrorResponse;

/// Business tag the exchange records for deposits made by the harness.
pub const DEPOSIT_BUSINESS: &str = "deposit";

/// The generic, abstract interface to the exchange under test.
///
/// The scenario sequencer and the market-making bot both drive the exchange
/// exclusively through this trait, so either can run against the HTTP gateway
/// or an in-memory stand-in.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Verifies the exchange is reachable.
    async fn connect(&self) -> Result<(), ApiError>;

    /// Registers an account together with its L1 address and L2 public key.
    async fn register_account(
        &self,
        account: &AccountRef,
        l1_address: &str,
        l2_pubkey: &str,
    ) -> Result<(), ApiError>;

    /// Applies a signed balance change tagged with a business name and id.
    async fn balance_update(
        &self,
        account: &AccountRef,
        asset: &str,
        business: &str,
        business_id: u64,
        delta: Decimal,
    ) -> Result<(), ApiError>;

    async fn place_order(&self, order: &OrderRequest) -> Result<Order, ApiError>;

    async fn cancel_order(
        &self,
        account: &AccountRef,
        market: &str,
        order_id: u64,
    ) -> Result<Order, ApiError>;

    async fn cancel_all_orders(&self, account: &AccountRef, market: &str) -> Result<(), ApiError>;

    /// Fails with `ApiError::UnknownOrder` once the order is fully filled or canceled.
    async fn get_order(&self, market: &str, order_id: u64) -> Result<Order, ApiError>;

    async fn get_balance(&self, account: &AccountRef) -> Result<Balances, ApiError>;

    async fn get_market_summary(&self, market: &str) -> Result<MarketSummary, ApiError>;

    /// `merge_precision` of `"0"` disables price-level merging.
    async fn get_depth(
        &self,
        market: &str,
        limit: u32,
        merge_precision: &str,
    ) -> Result<Depth, ApiError>;

    /// Wipes all exchange state. Test deployments only.
    async fn reset_state(&self) -> Result<(), ApiError>;

    /// Forces the exchange to rebuild its state from persistence.
    async fn reload_state(&self) -> Result<(), ApiError>;

    async fn list_assets(&self) -> Result<Vec<AssetInfo>, ApiError>;

    async fn list_markets(&self) -> Result<Vec<MarketInfo>, ApiError>;
}

/// Next deposit business id. Seeded from wall-clock millis so ids do not
/// collide with earlier runs against the same exchange.
pub fn next_business_id() -> u64 {
    static NEXT: OnceLock<AtomicU64> = OnceLock::new();
    NEXT.get_or_init(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        AtomicU64::new(seed)
    })
    .fetch_add(1, Ordering::Relaxed)
}

/// Deposits each `(asset, amount)` pair into `account`, one balance update per asset.
pub async fn deposit_assets<C>(
    client: &C,
    account: &AccountRef,
    assets: &[(&str, Decimal)],
) -> Result<(), ApiError>
where
    C: ExchangeClient + ?Sized,
{
    for (asset, amount) in assets {
        client
            .balance_update(account, asset, DEPOSIT_BUSINESS, next_business_id(), *amount)
            .await?;
        tracing::debug!(%account, asset, %amount, "deposited");
    }
    Ok(())
}
