use crate::error::BotError;
use crate::planner::{cancel_target, maintenance, plan_orders, Roster};
use api_client::ExchangeClient;
use configuration::BotConfig;
use price_feed::{PriceCache, PriceSource};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Counters kept across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotStats {
    pub ticks: u64,
    pub failed_ticks: u64,
    pub orders_placed: u64,
    pub cancel_sweeps: u64,
}

/// The market-making loop.
///
/// Owns the tick counter, the price cache and the roster; nothing else writes
/// to them, so no locking is needed.
pub struct MarketMaker {
    client: Arc<dyn ExchangeClient>,
    prices: Box<dyn PriceSource>,
    cache: PriceCache,
    roster: Roster,
    cfg: BotConfig,
    rng: ChaCha8Rng,
    stats: BotStats,
}

impl MarketMaker {
    pub fn new(
        client: Arc<dyn ExchangeClient>,
        prices: Box<dyn PriceSource>,
        roster: Roster,
        cfg: BotConfig,
    ) -> Self {
        let rng = match cfg.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            client,
            prices,
            cache: PriceCache::new(),
            roster,
            cfg,
            rng,
            stats: BotStats::default(),
        }
    }

    /// Starts from an already populated cache instead of an empty one.
    pub fn with_cache(mut self, cache: PriceCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn stats(&self) -> BotStats {
        self.stats
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// Ticks every `tick_interval_ms` until `shutdown` is cancelled.
    pub async fn run(&mut self, shutdown: CancellationToken) -> BotStats {
        let mut interval = tokio::time::interval(Duration::from_millis(self.cfg.tick_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            accounts = self.roster.accounts.len(),
            markets = self.roster.markets.len(),
            interval_ms = self.cfg.tick_interval_ms,
            "--- Bot is running ---"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(stats = ?self.stats, "bot shutdown requested");
                    return self.stats;
                }
                _ = interval.tick() => {
                    self.step().await;
                }
            }
        }
    }

    /// Runs one tick. A failure is logged and counted; the tick counter advances either way.
    pub async fn step(&mut self) {
        let tick = self.stats.ticks;
        if let Err(e) = self.tick(tick).await {
            self.stats.failed_ticks += 1;
            tracing::warn!(tick, error = %e, "tick failed, continuing");
        }
        self.stats.ticks += 1;
    }

    async fn tick(&mut self, tick: u64) -> Result<(), BotError> {
        let plan = maintenance(tick, &self.cfg, self.cache.is_empty());

        if plan.cancel_all {
            let (account, market) = cancel_target(&self.roster, &mut self.rng)?;
            self.client.cancel_all_orders(&account, &market).await?;
            self.stats.cancel_sweeps += 1;
            tracing::info!(tick, %account, %market, "cancelled all orders");
        }

        if plan.refresh_prices {
            let symbols = self.roster.price_symbols();
            self.cache.refresh(self.prices.as_ref(), &symbols).await;
        }

        for intent in plan_orders(&self.roster, &self.cache, &self.cfg, &mut self.rng)? {
            let order = self.client.place_order(&intent.to_request(self.cfg.fee)).await?;
            self.stats.orders_placed += 1;
            tracing::debug!(
                tick,
                account = %intent.account,
                market = %intent.market,
                side = %intent.side,
                amount = %intent.amount,
                price = %intent.price,
                order_id = order.id,
                "order placed"
            );
        }
        Ok(())
    }
}
