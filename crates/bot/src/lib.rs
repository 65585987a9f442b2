//! # Market-making Bot
//!
//! Keeps a synthetic order flow going on every market of the exchange: each
//! tick places randomized limit orders around the last known price, with a
//! periodic cancel-all sweep and price refresh. Decisions live in
//! [`planner`] as pure functions; [`MarketMaker`] executes them and absorbs
//! per-tick failures.

pub mod bootstrap;
pub mod error;
pub mod planner;
pub mod runner;

// --- Public API ---
pub use bootstrap::bootstrap;
pub use error::BotError;
pub use planner::{jitter, OrderIntent, Roster};
pub use runner::{BotStats, MarketMaker};
