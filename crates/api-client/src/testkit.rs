//! An in-memory stand-in for the exchange, for tests of crates that drive
//! `ExchangeClient`.
//!
//! It keeps a balance ledger and a price-time book of limit orders per market,
//! enough to reproduce what the scenario asserts: freezing on placement,
//! release on cancel, maker-price fills with per-side fees, and fully filled
//! orders disappearing from the book. Market orders are rejected.

use crate::error::ApiError;
use crate::ExchangeClient;
use async_trait::async_trait;
use core_types::numeric::DEFAULT_PRECISION;
use core_types::{
    notional, round_to_precision, AccountRef, AssetInfo, BalanceEntry, Balances, Depth,
    MarketInfo, MarketSummary, Order, OrderRequest, OrderSide, OrderType, PriceLevel,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, Default)]
struct Ledger {
    available: Decimal,
    frozen: Decimal,
}

#[derive(Debug, Clone)]
struct Resting {
    id: u64,
    account: AccountRef,
    market: String,
    side: OrderSide,
    price: Decimal,
    amount: Decimal,
    remain: Decimal,
    taker_fee: Decimal,
    maker_fee: Decimal,
    /// What is still reserved for this order, in quote (bids) or base (asks).
    frozen_left: Decimal,
    finished_base: Decimal,
    finished_quote: Decimal,
    finished_fee: Decimal,
    create_time: f64,
    update_time: f64,
}

#[derive(Debug, Default)]
struct State {
    assets: BTreeMap<String, AssetInfo>,
    markets: BTreeMap<String, MarketInfo>,
    balances: HashMap<AccountRef, BTreeMap<String, Ledger>>,
    orders: BTreeMap<u64, Resting>,
    registered: HashSet<AccountRef>,
    next_order_id: u64,
    clock: f64,
}

impl State {
    fn tick(&mut self) -> f64 {
        self.clock += 1.0;
        self.clock
    }

    fn precision(&self, asset: &str) -> u32 {
        self.assets
            .get(asset)
            .map(|a| a.prec_save)
            .unwrap_or(DEFAULT_PRECISION)
    }

    fn ledger(&mut self, account: &AccountRef, asset: &str) -> &mut Ledger {
        self.balances
            .entry(account.clone())
            .or_default()
            .entry(asset.to_string())
            .or_default()
    }

    fn market(&self, name: &str) -> Result<MarketInfo, ApiError> {
        self.markets
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::UnknownMarket(name.to_string()))
    }

    fn freeze(&mut self, account: &AccountRef, asset: &str, amount: Decimal) -> Result<(), ApiError> {
        let ledger = self.ledger(account, asset);
        if ledger.available < amount {
            return Err(ApiError::Exchange {
                code: 10,
                message: "balance not enough".to_string(),
            });
        }
        ledger.available -= amount;
        ledger.frozen += amount;
        Ok(())
    }

    fn unfreeze(&mut self, account: &AccountRef, asset: &str, amount: Decimal) {
        let ledger = self.ledger(account, asset);
        ledger.frozen -= amount;
        ledger.available += amount;
    }

    /// Removes an order from the book and returns its reservation.
    fn release(&mut self, order_id: u64) -> Option<Resting> {
        let order = self.orders.remove(&order_id)?;
        let market = self.markets.get(&order.market).cloned()?;
        let asset = match order.side {
            OrderSide::Bid => market.quote,
            OrderSide::Ask => market.base,
        };
        self.unfreeze(&order.account, &asset, order.frozen_left);
        Some(order)
    }

    /// Best resting order on the opposite side that crosses `taker`.
    fn best_maker(&self, taker: &Resting) -> Option<u64> {
        let crossing = self.orders.values().filter(|o| {
            o.market == taker.market
                && o.side == taker.side.opposite()
                && match taker.side {
                    OrderSide::Bid => o.price <= taker.price,
                    OrderSide::Ask => o.price >= taker.price,
                }
        });
        match taker.side {
            OrderSide::Bid => crossing.min_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id))),
            OrderSide::Ask => crossing.min_by(|a, b| b.price.cmp(&a.price).then(a.id.cmp(&b.id))),
        }
        .map(|o| o.id)
    }

    /// Fills `traded` between `taker` and the resting order `maker_id` at the maker's price.
    fn settle(&mut self, taker: &mut Resting, maker_id: u64, traded: Decimal, market: &MarketInfo) {
        let quote_prec = self.precision(&market.quote);
        let base_prec = self.precision(&market.base);
        let Some(mut maker) = self.orders.remove(&maker_id) else {
            return;
        };
        let quote = round_to_precision(traded * maker.price, quote_prec);
        let now = self.tick();

        let (bidder, asker) = match taker.side {
            OrderSide::Bid => (&mut *taker, &mut maker),
            OrderSide::Ask => (&mut maker, &mut *taker),
        };
        let bid_fee_rate = if bidder.id == maker_id { bidder.maker_fee } else { bidder.taker_fee };
        let ask_fee_rate = if asker.id == maker_id { asker.maker_fee } else { asker.taker_fee };

        // Bidder spends quote out of its reservation and receives base minus fee.
        let bid_release = if bidder.remain == traded {
            bidder.frozen_left
        } else {
            notional(traded, bidder.price, quote_prec)
        };
        let base_fee = round_to_precision(traded * bid_fee_rate, base_prec);
        bidder.remain -= traded;
        bidder.frozen_left -= bid_release;
        bidder.finished_base += traded;
        bidder.finished_quote += quote;
        bidder.finished_fee += base_fee;
        bidder.update_time = now;
        let bidder_account = bidder.account.clone();

        // Asker delivers base out of its reservation and receives quote minus fee.
        let quote_fee = round_to_precision(quote * ask_fee_rate, quote_prec);
        asker.remain -= traded;
        asker.frozen_left -= traded;
        asker.finished_base += traded;
        asker.finished_quote += quote;
        asker.finished_fee += quote_fee;
        asker.update_time = now;
        let asker_account = asker.account.clone();

        {
            let ledger = self.ledger(&bidder_account, &market.quote);
            ledger.frozen -= bid_release;
            ledger.available += bid_release - quote;
        }
        self.ledger(&bidder_account, &market.base).available += traded - base_fee;
        self.ledger(&asker_account, &market.base).frozen -= traded;
        self.ledger(&asker_account, &market.quote).available += quote - quote_fee;

        if !maker.remain.is_zero() {
            self.orders.insert(maker.id, maker);
        }
    }

    fn to_order(&self, order: &Resting) -> Order {
        let (price_prec, amount_prec) = self
            .markets
            .get(&order.market)
            .map(|m| (m.price_precision, m.amount_precision))
            .unwrap_or((DEFAULT_PRECISION, DEFAULT_PRECISION));
        let (broker_id, account_id) = match &order.account {
            AccountRef::Composite {
                broker_id,
                account_id,
                ..
            } => (Some(broker_id.clone()), Some(account_id.clone())),
            AccountRef::Simple { .. } => (None, None),
        };
        Order {
            id: order.id,
            market: order.market.clone(),
            order_type: OrderType::Limit,
            order_side: order.side,
            user_id: order.account.user_id(),
            broker_id,
            account_id,
            create_time: order.create_time,
            update_time: order.update_time,
            price: fixed(order.price, price_prec),
            amount: fixed(order.amount, amount_prec),
            taker_fee: order.taker_fee.normalize().to_string(),
            maker_fee: order.maker_fee.normalize().to_string(),
            remain: fixed(order.remain, amount_prec),
            finished_base: order.finished_base.normalize().to_string(),
            finished_quote: order.finished_quote.normalize().to_string(),
            finished_fee: order.finished_fee.normalize().to_string(),
        }
    }
}

/// Formats `value` with exactly `precision` decimals, as the exchange displays book values.
fn fixed(value: Decimal, precision: u32) -> String {
    let mut v = round_to_precision(value, precision);
    v.rescale(precision);
    v.to_string()
}

fn unknown_order(market: &str, order_id: u64) -> ApiError {
    ApiError::UnknownOrder {
        market: market.to_string(),
        order_id,
    }
}

/// In-memory `ExchangeClient` with failure injection and call counters.
#[derive(Debug)]
pub struct InMemoryExchange {
    state: Mutex<State>,
    failing_orders: AtomicUsize,
    orders_placed: AtomicUsize,
    cancel_all_calls: AtomicUsize,
    resets: AtomicUsize,
    reloads: AtomicUsize,
    placed: Mutex<Vec<OrderRequest>>,
}

impl InMemoryExchange {
    pub fn new(assets: Vec<AssetInfo>, markets: Vec<MarketInfo>) -> Self {
        let state = State {
            assets: assets.into_iter().map(|a| (a.symbol.clone(), a)).collect(),
            markets: markets.into_iter().map(|m| (m.name.clone(), m)).collect(),
            next_order_id: 1,
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
            failing_orders: AtomicUsize::new(0),
            orders_placed: AtomicUsize::new(0),
            cancel_all_calls: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
            reloads: AtomicUsize::new(0),
            placed: Mutex::new(Vec::new()),
        }
    }

    /// One `ETH_USDT` market: prices at 2 decimals, amounts at 4.
    pub fn eth_usdt() -> Self {
        Self::new(
            vec![
                AssetInfo {
                    symbol: "ETH".to_string(),
                    prec_save: 8,
                    prec_show: 4,
                },
                AssetInfo {
                    symbol: "USDT".to_string(),
                    prec_save: 8,
                    prec_show: 2,
                },
            ],
            vec![MarketInfo {
                name: "ETH_USDT".to_string(),
                base: "ETH".to_string(),
                quote: "USDT".to_string(),
                amount_precision: 4,
                price_precision: 2,
                min_amount: "0.001".to_string(),
            }],
        )
    }

    /// The next `n` calls to `place_order` fail with an exchange error.
    pub fn fail_next_orders(&self, n: usize) {
        self.failing_orders.store(n, Ordering::SeqCst);
    }

    pub fn orders_placed(&self) -> usize {
        self.orders_placed.load(Ordering::SeqCst)
    }

    pub fn cancel_all_calls(&self) -> usize {
        self.cancel_all_calls.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    /// Every order request that was accepted, in arrival order.
    pub async fn placed_requests(&self) -> Vec<OrderRequest> {
        self.placed.lock().await.clone()
    }

    /// Credits `account` directly, bypassing `balance_update`.
    pub async fn credit(&self, account: &AccountRef, asset: &str, amount: Decimal) {
        self.state.lock().await.ledger(account, asset).available += amount;
    }
}

#[async_trait]
impl ExchangeClient for InMemoryExchange {
    async fn connect(&self) -> Result<(), ApiError> {
        Ok(())
    }

    async fn register_account(
        &self,
        account: &AccountRef,
        _l1_address: &str,
        _l2_pubkey: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        if !state.registered.insert(account.clone()) {
            return Err(ApiError::Exchange {
                code: 4,
                message: format!("{} already registered", account),
            });
        }
        Ok(())
    }

    async fn balance_update(
        &self,
        account: &AccountRef,
        asset: &str,
        _business: &str,
        _business_id: u64,
        delta: Decimal,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        if !state.assets.contains_key(asset) {
            return Err(ApiError::Exchange {
                code: 3,
                message: format!("invalid asset {}", asset),
            });
        }
        let ledger = state.ledger(account, asset);
        if ledger.available + delta < Decimal::ZERO {
            return Err(ApiError::Exchange {
                code: 10,
                message: "balance not enough".to_string(),
            });
        }
        ledger.available += delta;
        Ok(())
    }

    async fn place_order(&self, req: &OrderRequest) -> Result<Order, ApiError> {
        if self
            .failing_orders
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ApiError::Exchange {
                code: 500,
                message: "injected failure".to_string(),
            });
        }
        if req.order_type != OrderType::Limit {
            return Err(ApiError::Exchange {
                code: 11,
                message: "only limit orders are supported".to_string(),
            });
        }
        if req.amount <= Decimal::ZERO || req.price <= Decimal::ZERO {
            return Err(ApiError::Exchange {
                code: 3,
                message: "invalid amount or price".to_string(),
            });
        }

        let mut state = self.state.lock().await;
        let market = state.market(&req.market)?;
        let (asset, reserve) = match req.order_side {
            OrderSide::Bid => (
                market.quote.clone(),
                notional(req.amount, req.price, state.precision(&market.quote)),
            ),
            OrderSide::Ask => (market.base.clone(), req.amount),
        };
        state.freeze(&req.account, &asset, reserve)?;

        let now = state.tick();
        let id = state.next_order_id;
        state.next_order_id += 1;
        let mut taker = Resting {
            id,
            account: req.account.clone(),
            market: req.market.clone(),
            side: req.order_side,
            price: req.price,
            amount: req.amount,
            remain: req.amount,
            taker_fee: req.taker_fee,
            maker_fee: req.maker_fee,
            frozen_left: reserve,
            finished_base: Decimal::ZERO,
            finished_quote: Decimal::ZERO,
            finished_fee: Decimal::ZERO,
            create_time: now,
            update_time: now,
        };

        while !taker.remain.is_zero() {
            let Some(maker_id) = state.best_maker(&taker) else {
                break;
            };
            let maker_remain = state.orders[&maker_id].remain;
            let traded = taker.remain.min(maker_remain);
            state.settle(&mut taker, maker_id, traded, &market);
        }

        let order = state.to_order(&taker);
        if !taker.remain.is_zero() {
            state.orders.insert(id, taker);
        }
        drop(state);

        self.orders_placed.fetch_add(1, Ordering::SeqCst);
        self.placed.lock().await.push(req.clone());
        Ok(order)
    }

    async fn cancel_order(
        &self,
        account: &AccountRef,
        market: &str,
        order_id: u64,
    ) -> Result<Order, ApiError> {
        let mut state = self.state.lock().await;
        match state.orders.get(&order_id) {
            Some(o) if o.market == market && &o.account == account => {}
            _ => return Err(unknown_order(market, order_id)),
        }
        let order = state
            .release(order_id)
            .ok_or_else(|| unknown_order(market, order_id))?;
        Ok(state.to_order(&order))
    }

    async fn cancel_all_orders(&self, account: &AccountRef, market: &str) -> Result<(), ApiError> {
        self.cancel_all_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        state.market(market)?;
        let ids: Vec<u64> = state
            .orders
            .values()
            .filter(|o| o.market == market && &o.account == account)
            .map(|o| o.id)
            .collect();
        for id in ids {
            state.release(id);
        }
        Ok(())
    }

    async fn get_order(&self, market: &str, order_id: u64) -> Result<Order, ApiError> {
        let state = self.state.lock().await;
        state
            .orders
            .get(&order_id)
            .filter(|o| o.market == market)
            .map(|o| state.to_order(o))
            .ok_or_else(|| unknown_order(market, order_id))
    }

    async fn get_balance(&self, account: &AccountRef) -> Result<Balances, ApiError> {
        let state = self.state.lock().await;
        let balances: BTreeMap<String, BalanceEntry> = state
            .balances
            .get(account)
            .map(|assets| {
                assets
                    .iter()
                    .map(|(asset, l)| {
                        (
                            asset.clone(),
                            BalanceEntry {
                                available: l.available.normalize().to_string(),
                                frozen: l.frozen.normalize().to_string(),
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Balances(balances))
    }

    async fn get_market_summary(&self, market: &str) -> Result<MarketSummary, ApiError> {
        let state = self.state.lock().await;
        let info = state.market(market)?;
        let (mut ask_count, mut bid_count) = (0, 0);
        let (mut ask_amount, mut bid_amount) = (Decimal::ZERO, Decimal::ZERO);
        for order in state.orders.values().filter(|o| o.market == market) {
            match order.side {
                OrderSide::Ask => {
                    ask_count += 1;
                    ask_amount += order.remain;
                }
                OrderSide::Bid => {
                    bid_count += 1;
                    bid_amount += order.remain;
                }
            }
        }
        Ok(MarketSummary {
            name: market.to_string(),
            ask_count,
            ask_amount: fixed(ask_amount, info.amount_precision),
            bid_count,
            bid_amount: fixed(bid_amount, info.amount_precision),
            trade_count: 0,
        })
    }

    async fn get_depth(
        &self,
        market: &str,
        limit: u32,
        _merge_precision: &str,
    ) -> Result<Depth, ApiError> {
        let state = self.state.lock().await;
        let info = state.market(market)?;
        let mut asks: BTreeMap<Decimal, Decimal> = BTreeMap::new();
        let mut bids: BTreeMap<Decimal, Decimal> = BTreeMap::new();
        for order in state.orders.values().filter(|o| o.market == market) {
            let side = match order.side {
                OrderSide::Ask => &mut asks,
                OrderSide::Bid => &mut bids,
            };
            *side.entry(order.price).or_default() += order.remain;
        }
        let level = |(price, amount): (&Decimal, &Decimal)| PriceLevel {
            price: fixed(*price, info.price_precision),
            amount: fixed(*amount, info.amount_precision),
        };
        Ok(Depth {
            asks: asks.iter().take(limit as usize).map(level).collect(),
            bids: bids.iter().rev().take(limit as usize).map(level).collect(),
        })
    }

    async fn reset_state(&self) -> Result<(), ApiError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        state.balances.clear();
        state.orders.clear();
        state.registered.clear();
        state.next_order_id = 1;
        Ok(())
    }

    async fn reload_state(&self) -> Result<(), ApiError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_assets(&self) -> Result<Vec<AssetInfo>, ApiError> {
        Ok(self.state.lock().await.assets.values().cloned().collect())
    }

    async fn list_markets(&self) -> Result<Vec<MarketInfo>, ApiError> {
        Ok(self.state.lock().await.markets.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deposit_assets;
    use rust_decimal_macros::dec;

    fn bid(account: &AccountRef, amount: Decimal, price: Decimal) -> OrderRequest {
        OrderRequest::limit(account.clone(), "ETH_USDT", OrderSide::Bid, amount, price, Decimal::ZERO)
    }

    #[tokio::test]
    async fn bid_freezes_notional_and_cancel_restores() {
        let ex = InMemoryExchange::eth_usdt();
        let alice = AccountRef::simple(1);
        deposit_assets(&ex, &alice, &[("USDT", dec!(100))]).await.unwrap();

        let order = ex.place_order(&bid(&alice, dec!(10), dec!(1.1))).await.unwrap();
        let usdt = ex.get_balance(&alice).await.unwrap().get_or_zero("USDT");
        assert_eq!(usdt.available, "89");
        assert_eq!(usdt.frozen, "11");
        assert_eq!(ex.get_order("ETH_USDT", order.id).await.unwrap(), order);

        ex.cancel_order(&alice, "ETH_USDT", order.id).await.unwrap();
        let usdt = ex.get_balance(&alice).await.unwrap().get_or_zero("USDT");
        assert_eq!(usdt.available, "100");
        assert_eq!(usdt.frozen, "0");
        assert!(matches!(
            ex.get_order("ETH_USDT", order.id).await,
            Err(ApiError::UnknownOrder { .. })
        ));
    }

    #[tokio::test]
    async fn fees_are_taken_from_proceeds() {
        let ex = InMemoryExchange::eth_usdt();
        let (maker, taker) = (AccountRef::simple(1), AccountRef::simple(2));
        ex.credit(&maker, "ETH", dec!(10)).await;
        ex.credit(&taker, "USDT", dec!(100)).await;

        let mut ask = OrderRequest::limit(maker.clone(), "ETH_USDT", OrderSide::Ask, dec!(2), dec!(10), Decimal::ZERO);
        ask.maker_fee = dec!(0.001);
        ex.place_order(&ask).await.unwrap();
        let mut take = bid(&taker, dec!(2), dec!(10));
        take.taker_fee = dec!(0.002);
        let filled = ex.place_order(&take).await.unwrap();
        assert_eq!(filled.remain, "0.0000");

        let m = ex.get_balance(&maker).await.unwrap();
        assert_eq!(m.get_or_zero("USDT").available, "19.98");
        assert_eq!(m.get_or_zero("ETH").available, "8");
        let t = ex.get_balance(&taker).await.unwrap();
        assert_eq!(t.get_or_zero("USDT").available, "80");
        assert_eq!(t.get_or_zero("USDT").frozen, "0");
        assert_eq!(t.get_or_zero("ETH").available, "1.996");
    }

    #[tokio::test]
    async fn crossing_bid_fills_cheapest_asks_at_their_prices() {
        let ex = InMemoryExchange::eth_usdt();
        let (maker, taker) = (AccountRef::simple(1), AccountRef::simple(2));
        ex.credit(&maker, "ETH", dec!(10)).await;
        ex.credit(&taker, "USDT", dec!(100)).await;
        let ask = |price| OrderRequest::limit(maker.clone(), "ETH_USDT", OrderSide::Ask, dec!(1), price, Decimal::ZERO);
        let dearer = ex.place_order(&ask(dec!(1.10))).await.unwrap();
        let cheaper = ex.place_order(&ask(dec!(1.00))).await.unwrap();

        let rest = ex.place_order(&bid(&taker, dec!(3), dec!(1.20))).await.unwrap();
        assert_eq!(rest.remain, "1.0000");
        for id in [dearer.id, cheaper.id] {
            assert!(matches!(ex.get_order("ETH_USDT", id).await, Err(ApiError::UnknownOrder { .. })));
        }

        let t = ex.get_balance(&taker).await.unwrap();
        assert_eq!(t.get_or_zero("USDT").available, "96.7");
        assert_eq!(t.get_or_zero("USDT").frozen, "1.2");
        assert_eq!(t.get_or_zero("ETH").available, "2");
        let m = ex.get_balance(&maker).await.unwrap();
        assert_eq!(m.get_or_zero("USDT").available, "2.1");
    }

    #[tokio::test]
    async fn depth_aggregates_levels_best_first() {
        let ex = InMemoryExchange::eth_usdt();
        let alice = AccountRef::simple(1);
        ex.credit(&alice, "USDT", dec!(1000)).await;
        ex.place_order(&bid(&alice, dec!(1), dec!(1.0))).await.unwrap();
        ex.place_order(&bid(&alice, dec!(2), dec!(1.2))).await.unwrap();
        ex.place_order(&bid(&alice, dec!(3), dec!(1.2))).await.unwrap();

        let depth = ex.get_depth("ETH_USDT", 10, "0").await.unwrap();
        assert!(depth.asks.is_empty());
        assert_eq!(
            depth.bids,
            vec![
                PriceLevel { price: "1.20".to_string(), amount: "5.0000".to_string() },
                PriceLevel { price: "1.00".to_string(), amount: "1.0000".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let ex = InMemoryExchange::eth_usdt();
        let alice = AccountRef::simple(1);
        ex.credit(&alice, "USDT", dec!(100)).await;
        ex.fail_next_orders(1);
        assert!(ex.place_order(&bid(&alice, dec!(1), dec!(1))).await.is_err());
        assert!(ex.place_order(&bid(&alice, dec!(1), dec!(1))).await.is_ok());
        assert_eq!(ex.orders_placed(), 1);
    }
}
