use crate::error::ConfigError;
use core_types::AccountRef;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub exchange: ExchangeConfig,
    pub scenario: ScenarioConfig,
    pub bot: BotConfig,
    pub price_feed: PriceFeedConfig,
    pub event_stream: EventStreamConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Rejects settings that would make the bot spin or the scenario meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exchange.base_url.is_empty() {
            return Err(ConfigError::ValidationError("exchange.base_url is empty".to_string()));
        }
        if self.scenario.ask_account == self.scenario.bid_account {
            return Err(ConfigError::ValidationError(
                "scenario.ask_account and scenario.bid_account must differ".to_string(),
            ));
        }
        if self.bot.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError("bot.tick_interval_ms must be > 0".to_string()));
        }
        if self.bot.cancel_every_ticks == 0 || self.bot.refresh_every_ticks == 0 {
            return Err(ConfigError::ValidationError(
                "bot cadences (cancel_every_ticks, refresh_every_ticks) must be > 0".to_string(),
            ));
        }
        if self.bot.accounts.is_empty() {
            return Err(ConfigError::ValidationError("bot.accounts is empty".to_string()));
        }
        if self.bot.price_spread < Decimal::ZERO || self.bot.price_spread >= Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "bot.price_spread must be within [0, 1)".to_string(),
            ));
        }
        if self.bot.amount_spread < Decimal::ZERO || self.bot.amount_spread >= Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "bot.amount_spread must be within [0, 1)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the exchange's HTTP gateway lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:50051".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// One account as written in the settings file.
///
/// `broker_id` and `account_id` together select the composite (multi-account)
/// addressing scheme; leaving them out gives a plain user id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountConfig {
    pub user_id: u32,
    #[serde(default)]
    pub broker_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    /// Registration only.
    #[serde(default)]
    pub l1_address: Option<String>,
    #[serde(default)]
    pub l2_pubkey: Option<String>,
}

impl AccountConfig {
    pub fn new(user_id: u32) -> Self {
        Self {
            user_id,
            broker_id: None,
            account_id: None,
            l1_address: None,
            l2_pubkey: None,
        }
    }

    pub fn account_ref(&self) -> AccountRef {
        match (&self.broker_id, &self.account_id) {
            (Some(broker), Some(account)) => AccountRef::composite(self.user_id, broker, account),
            _ => AccountRef::simple(self.user_id),
        }
    }
}

/// Parameters of the trade-lifecycle scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub market: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Maker and taker fee rate sent with every order.
    pub fee: Decimal,
    pub ask_account: AccountConfig,
    pub bid_account: AccountConfig,
    /// Call `RegisterUser` for both accounts before the run.
    pub register_accounts: bool,
    /// Reload the exchange state after the trade and assert it again.
    pub verify_reload: bool,
    /// Capture the message stream during the run and check event counts.
    pub with_mq: bool,
    pub settle_delay_secs: u64,
    pub depth_limit: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            market: "ETH_USDT".to_string(),
            base_asset: "ETH".to_string(),
            quote_asset: "USDT".to_string(),
            fee: Decimal::ZERO,
            ask_account: AccountConfig::new(1),
            bid_account: AccountConfig::new(2),
            register_accounts: false,
            verify_reload: false,
            with_mq: false,
            settle_delay_secs: 3,
            depth_limit: 100,
        }
    }
}

/// Parameters of the market-making bot loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub accounts: Vec<AccountConfig>,
    pub tick_interval_ms: u64,
    pub cancel_every_ticks: u64,
    pub refresh_every_ticks: u64,
    /// Centre of the randomized order amount.
    pub amount_reference: Decimal,
    /// Fractional spread of the amount around `amount_reference`.
    pub amount_spread: Decimal,
    /// Fractional spread of the price around the cached reference price.
    pub price_spread: Decimal,
    pub fee: Decimal,
    pub quote_deposit: Decimal,
    pub base_deposit: Decimal,
    pub reset_on_start: bool,
    /// Place a bid and an ask every tick instead of one random side.
    pub quote_both_sides: bool,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            accounts: (10..=14).map(AccountConfig::new).collect(),
            tick_interval_ms: 1_000,
            cancel_every_ticks: 300,
            refresh_every_ticks: 60,
            amount_reference: dec!(3),
            amount_spread: dec!(0.5),
            price_spread: dec!(0.05),
            fee: Decimal::ZERO,
            quote_deposit: dec!(500000),
            base_deposit: dec!(10),
            reset_on_start: true,
            quote_both_sides: false,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBackend {
    Coinstats,
    CryptoCompare,
    Fixed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriceFeedConfig {
    pub backend: PriceBackend,
    /// Base URL of the chosen backend; ignored by `fixed`.
    pub url: String,
    pub limit: u32,
    pub currency: String,
    pub request_timeout_secs: u64,
    /// Prices served by the `fixed` backend.
    pub fixed: HashMap<String, Decimal>,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            backend: PriceBackend::Coinstats,
            url: "https://api.coinstats.app".to_string(),
            limit: 100,
            currency: "USD".to_string(),
            request_timeout_secs: 10,
            fixed: HashMap::new(),
        }
    }
}

/// WebSocket endpoint that relays the exchange's `orders`/`balances`/`trades` topics.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventStreamConfig {
    pub url: String,
}

impl Default for EventStreamConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8765/events".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "exchange-harness.log".to_string(),
        }
    }
}
