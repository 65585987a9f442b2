use core_types::{AssetInfo, BalanceEntry, Balances, MarketInfo, MarketSummary};
use serde::{Deserialize, Serialize};

/// Error body returned by the gateway alongside a non-2xx status.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: i32,
    pub message: String,
}

/// One row of `BalanceQuery`.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceRow {
    pub asset_id: String,
    pub available: String,
    pub frozen: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceQueryResponse {
    #[serde(default)]
    pub balances: Vec<BalanceRow>,
}

impl From<BalanceQueryResponse> for Balances {
    fn from(resp: BalanceQueryResponse) -> Self {
        Balances(
            resp.balances
                .into_iter()
                .map(|row| {
                    (
                        row.asset_id,
                        BalanceEntry {
                            available: row.available,
                            frozen: row.frozen,
                        },
                    )
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketSummaryResponse {
    #[serde(default)]
    pub market_summaries: Vec<MarketSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetListResponse {
    #[serde(default)]
    pub asset_lists: Vec<AssetInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketListResponse {
    #[serde(default)]
    pub markets: Vec<MarketInfo>,
}

/// Calls that return nothing useful still answer with a JSON object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}
