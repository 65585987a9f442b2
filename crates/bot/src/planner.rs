//! Pure decision logic for one tick. Nothing here touches the network, so
//! every choice is reproducible from the RNG seed and the cached prices.

use crate::error::BotError;
use configuration::BotConfig;
use core_types::{round_to_precision, AccountRef, MarketInfo, OrderRequest, OrderSide};
use price_feed::PriceCache;
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;

/// Resolution of the jitter draw: `u` is a multiple of 1/JITTER_STEPS.
const JITTER_STEPS: i64 = 10_000;

/// `reference * (1 + spread * u)` with `u` uniform in `[-1, 1]`.
pub fn jitter<R: Rng>(reference: Decimal, spread: Decimal, rng: &mut R) -> Decimal {
    let u = Decimal::new(rng.gen_range(-JITTER_STEPS..=JITTER_STEPS), 4);
    reference * (Decimal::ONE + spread * u)
}

/// Accounts the bot trades for and the markets discovered at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub accounts: Vec<AccountRef>,
    pub markets: Vec<MarketInfo>,
}

impl Roster {
    /// Price symbols of every market, deduplicated, in market order.
    pub fn price_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for market in &self.markets {
            let symbol = market.price_symbol();
            if !symbols.iter().any(|s| s == symbol) {
                symbols.push(symbol.to_string());
            }
        }
        symbols
    }

    fn pick<R: Rng>(&self, rng: &mut R) -> Result<(&AccountRef, &MarketInfo), BotError> {
        let account = self.accounts.choose(rng).ok_or(BotError::NoAccounts)?;
        let market = self.markets.choose(rng).ok_or(BotError::NoMarkets)?;
        Ok((account, market))
    }
}

/// Periodic work that precedes the tick's orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Maintenance {
    pub cancel_all: bool,
    pub refresh_prices: bool,
}

pub fn maintenance(tick: u64, cfg: &BotConfig, cache_empty: bool) -> Maintenance {
    Maintenance {
        cancel_all: tick % cfg.cancel_every_ticks == 0,
        refresh_prices: cache_empty || tick % cfg.refresh_every_ticks == 0,
    }
}

/// The account/market pair whose open orders are swept this tick.
pub fn cancel_target<R: Rng>(roster: &Roster, rng: &mut R) -> Result<(AccountRef, String), BotError> {
    let (account, market) = roster.pick(rng)?;
    Ok((account.clone(), market.name.clone()))
}

/// One limit order the bot intends to place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIntent {
    pub account: AccountRef,
    pub market: String,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
}

impl OrderIntent {
    pub fn to_request(&self, fee: Decimal) -> OrderRequest {
        OrderRequest::limit(
            self.account.clone(),
            self.market.clone(),
            self.side,
            self.amount,
            self.price,
            fee,
        )
    }
}

/// Orders for this tick: one random side, or a bid and an ask when
/// `quote_both_sides` is set. Amount and price are jittered independently per
/// order and rounded to the market's precisions.
pub fn plan_orders<R: Rng>(
    roster: &Roster,
    cache: &PriceCache,
    cfg: &BotConfig,
    rng: &mut R,
) -> Result<Vec<OrderIntent>, BotError> {
    let (account, market) = roster.pick(rng)?;
    let symbol = market.price_symbol();
    let reference = cache
        .get(symbol)
        .ok_or_else(|| BotError::MissingPrice(symbol.to_string()))?;

    let sides = if cfg.quote_both_sides {
        vec![OrderSide::Bid, OrderSide::Ask]
    } else if rng.gen_bool(0.5) {
        vec![OrderSide::Bid]
    } else {
        vec![OrderSide::Ask]
    };

    Ok(sides
        .into_iter()
        .map(|side| OrderIntent {
            account: account.clone(),
            market: market.name.clone(),
            side,
            amount: round_to_precision(
                jitter(cfg.amount_reference, cfg.amount_spread, rng),
                market.amount_precision,
            ),
            price: round_to_precision(jitter(reference, cfg.price_spread, rng), market.price_precision),
        })
        .collect())
}
