pub mod account;
pub mod enums;
pub mod error;
pub mod numeric;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use account::AccountRef;
pub use enums::{OrderSide, OrderType};
pub use error::CoreError;
pub use numeric::{assert_decimal_eq, decimal_eq, notional, parse_decimal, round_to_precision};
pub use structs::{
    AssetInfo, BalanceEntry, Balances, Depth, MarketInfo, MarketSummary, Order, OrderRequest,
    PriceLevel,
};
