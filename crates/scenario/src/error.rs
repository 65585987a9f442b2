use api_client::error::ApiError;
use core_types::{AccountRef, CoreError};
use events::EventsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error(transparent)]
    ValueMismatch(#[from] CoreError),

    #[error("Structure mismatch for {context}: expected {expected}, got {actual}")]
    StructureMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Environment is not clean: {account} holds {asset} (available {available}, frozen {frozen})")]
    DirtyState {
        account: AccountRef,
        asset: String,
        available: String,
        frozen: String,
    },

    #[error("Order '{label}' (id {order_id}) should have left the book but is still queryable")]
    OrderStillQueryable { label: String, order_id: u64 },

    #[error("No order was placed under the label '{0}'")]
    UnknownLabel(String),

    #[error("Exchange call failed: {0}")]
    Api(#[from] ApiError),

    #[error("Event check failed: {0}")]
    Events(#[from] EventsError),
}
