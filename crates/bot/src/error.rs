use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("No cached price for '{0}'")]
    MissingPrice(String),

    #[error("The exchange lists no markets")]
    NoMarkets,

    #[error("No bot accounts are configured")]
    NoAccounts,

    #[error("API client error: {0}")]
    Api(#[from] api_client::error::ApiError),
}
