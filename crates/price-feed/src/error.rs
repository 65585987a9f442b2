use thiserror::Error;

#[derive(Error, Debug)]
pub enum PriceFeedError {
    #[error("Price request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to deserialize the price response: {0}")]
    Deserialization(String),

    #[error("The price source returned no usable prices: {0}")]
    EmptyResponse(String),
}
