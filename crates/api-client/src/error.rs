use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unknown order {order_id} on market {market}")]
    UnknownOrder { market: String, order_id: u64 },

    #[error("The exchange rejected the request (code {code}): {message}")]
    Exchange { code: i32, message: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Unknown market: {0}")]
    UnknownMarket(String),
}

impl ApiError {
    /// Network-level failures that a retry might get past.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
