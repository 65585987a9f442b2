use crate::error::ApiError;
use crate::responses::{
    ApiErrorResponse, AssetListResponse, BalanceQueryResponse, Empty, MarketListResponse,
    MarketSummaryResponse,
};
use crate::ExchangeClient;
use async_trait::async_trait;
use configuration::ExchangeConfig;
use core_types::{
    AccountRef, AssetInfo, Balances, Depth, MarketInfo, MarketSummary, Order, OrderRequest,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Substring the matching engine uses when an order id is not in its book.
const UNKNOWN_ORDER_MESSAGE: &str = "invalid order_id";

/// An `ExchangeClient` speaking the exchange's JSON gateway.
///
/// Every RPC is a `POST {base_url}/{Method}` with a JSON body; failures come
/// back as a non-2xx status with `{ "code", "message" }`.
#[derive(Clone)]
pub struct HttpExchangeClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExchangeClient {
    pub fn new(config: &ExchangeConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call<Req, Resp>(&self, method: &str, body: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        tracing::trace!(%url, "exchange call");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<Resp>(&text).map_err(|e| {
                ApiError::Deserialization(format!("{} response: {}. Original text: {}", method, e, text))
            })
        } else {
            let api_error: ApiErrorResponse = serde_json::from_str(&text).map_err(|e| {
                ApiError::Deserialization(format!(
                    "Failed to deserialize {} error response ({}): {}. Original text: {}",
                    method, status, e, text
                ))
            })?;
            Err(ApiError::Exchange {
                code: api_error.code,
                message: api_error.message,
            })
        }
    }
}

#[derive(Serialize)]
struct AccountBody<'a> {
    #[serde(flatten)]
    account: &'a AccountRef,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    #[serde(flatten)]
    account: &'a AccountRef,
    l1_address: &'a str,
    l2_pubkey: &'a str,
}

#[derive(Serialize)]
struct BalanceUpdateBody<'a> {
    #[serde(flatten)]
    account: &'a AccountRef,
    asset: &'a str,
    business: &'a str,
    business_id: u64,
    delta: Decimal,
    detail: &'a str,
}

#[derive(Serialize)]
struct CancelBody<'a> {
    #[serde(flatten)]
    account: &'a AccountRef,
    market: &'a str,
    order_id: u64,
}

#[derive(Serialize)]
struct CancelAllBody<'a> {
    #[serde(flatten)]
    account: &'a AccountRef,
    market: &'a str,
}

#[derive(Serialize)]
struct OrderDetailBody<'a> {
    market: &'a str,
    order_id: u64,
}

#[derive(Serialize)]
struct MarketsBody<'a> {
    markets: [&'a str; 1],
}

#[derive(Serialize)]
struct DepthBody<'a> {
    market: &'a str,
    limit: u32,
    precision: &'a str,
}

#[async_trait]
impl ExchangeClient for HttpExchangeClient {
    async fn connect(&self) -> Result<(), ApiError> {
        let assets = self.list_assets().await?;
        tracing::info!(base_url = %self.base_url, assets = assets.len(), "connected to exchange");
        Ok(())
    }

    async fn register_account(
        &self,
        account: &AccountRef,
        l1_address: &str,
        l2_pubkey: &str,
    ) -> Result<(), ApiError> {
        let body = RegisterBody {
            account,
            l1_address,
            l2_pubkey,
        };
        self.call::<_, Empty>("RegisterUser", &body).await?;
        Ok(())
    }

    async fn balance_update(
        &self,
        account: &AccountRef,
        asset: &str,
        business: &str,
        business_id: u64,
        delta: Decimal,
    ) -> Result<(), ApiError> {
        let body = BalanceUpdateBody {
            account,
            asset,
            business,
            business_id,
            delta,
            detail: "{}",
        };
        self.call::<_, Empty>("BalanceUpdate", &body).await?;
        Ok(())
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<Order, ApiError> {
        self.call("OrderPut", order).await
    }

    async fn cancel_order(
        &self,
        account: &AccountRef,
        market: &str,
        order_id: u64,
    ) -> Result<Order, ApiError> {
        let body = CancelBody {
            account,
            market,
            order_id,
        };
        self.call("OrderCancel", &body)
            .await
            .map_err(|e| classify_unknown_order(e, market, order_id))
    }

    async fn cancel_all_orders(&self, account: &AccountRef, market: &str) -> Result<(), ApiError> {
        let body = CancelAllBody { account, market };
        self.call::<_, Empty>("OrderCancelAll", &body).await?;
        Ok(())
    }

    async fn get_order(&self, market: &str, order_id: u64) -> Result<Order, ApiError> {
        let body = OrderDetailBody { market, order_id };
        self.call("OrderDetail", &body)
            .await
            .map_err(|e| classify_unknown_order(e, market, order_id))
    }

    async fn get_balance(&self, account: &AccountRef) -> Result<Balances, ApiError> {
        let resp: BalanceQueryResponse = self.call("BalanceQuery", &AccountBody { account }).await?;
        Ok(resp.into())
    }

    async fn get_market_summary(&self, market: &str) -> Result<MarketSummary, ApiError> {
        let resp: MarketSummaryResponse = self
            .call("MarketSummary", &MarketsBody { markets: [market] })
            .await?;
        resp.market_summaries
            .into_iter()
            .find(|s| s.name == market)
            .ok_or_else(|| ApiError::UnknownMarket(market.to_string()))
    }

    async fn get_depth(
        &self,
        market: &str,
        limit: u32,
        merge_precision: &str,
    ) -> Result<Depth, ApiError> {
        let body = DepthBody {
            market,
            limit,
            precision: merge_precision,
        };
        self.call("OrderBookDepth", &body).await
    }

    async fn reset_state(&self) -> Result<(), ApiError> {
        self.call::<_, Empty>("DebugReset", &Empty::default()).await?;
        tracing::info!("exchange state reset");
        Ok(())
    }

    async fn reload_state(&self) -> Result<(), ApiError> {
        self.call::<_, Empty>("DebugReload", &Empty::default()).await?;
        tracing::info!("exchange state reloaded");
        Ok(())
    }

    async fn list_assets(&self) -> Result<Vec<AssetInfo>, ApiError> {
        let resp: AssetListResponse = self.call("AssetList", &Empty::default()).await?;
        Ok(resp.asset_lists)
    }

    async fn list_markets(&self) -> Result<Vec<MarketInfo>, ApiError> {
        let resp: MarketListResponse = self.call("MarketList", &Empty::default()).await?;
        Ok(resp.markets)
    }
}

fn classify_unknown_order(err: ApiError, market: &str, order_id: u64) -> ApiError {
    match err {
        ApiError::Exchange { ref message, .. } if message.contains(UNKNOWN_ORDER_MESSAGE) => {
            ApiError::UnknownOrder {
                market: market.to_string(),
                order_id,
            }
        }
        other => other,
    }
}
