use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Value mismatch for {context}: expected {expected}, got {actual}")]
    ValueMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid decimal string: {0:?}")]
    InvalidDecimal(String),
}
