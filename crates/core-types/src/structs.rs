use crate::account::AccountRef;
use crate::enums::{OrderSide, OrderType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything `OrderPut` needs to place one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    #[serde(flatten)]
    pub account: AccountRef,
    pub market: String,
    pub order_side: OrderSide,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub price: Decimal,
    pub taker_fee: Decimal,
    pub maker_fee: Decimal,
}

impl OrderRequest {
    /// A limit order paying `fee` as both maker and taker.
    pub fn limit(
        account: AccountRef,
        market: impl Into<String>,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
        fee: Decimal,
    ) -> Self {
        Self {
            account,
            market: market.into(),
            order_side: side,
            order_type: OrderType::Limit,
            amount,
            price,
            taker_fee: fee,
            maker_fee: fee,
        }
    }
}

/// An order record as returned by `OrderPut` and `OrderDetail`.
///
/// Quantities stay as the exchange's decimal strings; compare them with
/// `numeric::assert_decimal_eq`, never with `==` on the fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub market: String,
    pub order_type: OrderType,
    pub order_side: OrderSide,
    pub user_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub create_time: f64,
    #[serde(default)]
    pub update_time: f64,
    pub price: String,
    pub amount: String,
    pub taker_fee: String,
    pub maker_fee: String,
    pub remain: String,
    #[serde(default)]
    pub finished_base: String,
    #[serde(default)]
    pub finished_quote: String,
    #[serde(default)]
    pub finished_fee: String,
}

/// `available` and `frozen` holdings of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub available: String,
    pub frozen: String,
}

impl BalanceEntry {
    pub fn zero() -> Self {
        Self {
            available: "0".to_string(),
            frozen: "0".to_string(),
        }
    }
}

/// Per-asset balances of one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(pub BTreeMap<String, BalanceEntry>);

impl Balances {
    pub fn get(&self, asset: &str) -> Option<&BalanceEntry> {
        self.0.get(asset)
    }

    /// An asset the account never touched reads as zero.
    pub fn get_or_zero(&self, asset: &str) -> BalanceEntry {
        self.0.get(asset).cloned().unwrap_or_else(BalanceEntry::zero)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub name: String,
    pub ask_count: u32,
    pub ask_amount: String,
    pub bid_count: u32,
    pub bid_amount: String,
    #[serde(default)]
    pub trade_count: u64,
}

/// One aggregated price level of a depth snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: String,
    pub amount: String,
}

/// Depth snapshot, best price first on each side. An empty side is an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depth {
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub name: String,
    pub base: String,
    pub quote: String,
    #[serde(default = "default_precision")]
    pub amount_precision: u32,
    #[serde(default = "default_precision")]
    pub price_precision: u32,
    #[serde(default)]
    pub min_amount: String,
}

fn default_precision() -> u32 {
    4
}

impl MarketInfo {
    /// The symbol a price feed knows this market by: its base asset.
    pub fn price_symbol(&self) -> &str {
        if self.base.is_empty() {
            self.name.split('_').next().unwrap_or(&self.name)
        } else {
            &self.base
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetInfo {
    pub symbol: String,
    pub prec_save: u32,
    pub prec_show: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_request_flattens_account() {
        let req = OrderRequest::limit(
            AccountRef::simple(1),
            "ETH_USDT",
            OrderSide::Bid,
            Decimal::from(10),
            Decimal::new(11, 1),
            Decimal::ZERO,
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["user_id"], 1);
        assert_eq!(json["order_side"], "BID");
        assert_eq!(json["order_type"], "LIMIT");
        assert_eq!(json["price"], "1.1");
    }

    #[test]
    fn depth_with_missing_side_is_empty_not_null() {
        let depth: Depth = serde_json::from_str(r#"{"bids":[{"price":"1.10","amount":"10.0000"}]}"#).unwrap();
        assert!(depth.asks.is_empty());
        assert_eq!(depth.bids.len(), 1);
    }

    #[test]
    fn price_symbol_falls_back_to_market_name() {
        let market = MarketInfo {
            name: "ETH_USDT".to_string(),
            base: String::new(),
            quote: "USDT".to_string(),
            amount_precision: 4,
            price_precision: 2,
            min_amount: "0.001".to_string(),
        };
        assert_eq!(market.price_symbol(), "ETH");
    }

    #[test]
    fn untouched_asset_reads_as_zero() {
        let balances = Balances::default();
        assert_eq!(balances.get_or_zero("ETH"), BalanceEntry::zero());
    }
}
