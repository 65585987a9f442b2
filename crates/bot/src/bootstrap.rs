use crate::error::BotError;
use crate::planner::Roster;
use api_client::{deposit_assets, ExchangeClient};
use configuration::BotConfig;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Prepares the exchange for the bot and returns its roster.
///
/// Optionally resets the exchange, discovers the market list once, then funds
/// every bot account with `quote_deposit` of each quote asset and
/// `base_deposit` of each base asset. An asset that is both receives both.
pub async fn bootstrap<C>(client: &C, cfg: &BotConfig) -> Result<Roster, BotError>
where
    C: ExchangeClient + ?Sized,
{
    if cfg.reset_on_start {
        client.reset_state().await?;
    }
    client.connect().await?;

    let markets = client.list_markets().await?;
    if markets.is_empty() {
        return Err(BotError::NoMarkets);
    }
    let accounts: Vec<_> = cfg.accounts.iter().map(|a| a.account_ref()).collect();
    if accounts.is_empty() {
        return Err(BotError::NoAccounts);
    }

    let quotes: BTreeSet<&str> = markets.iter().map(|m| m.quote.as_str()).collect();
    let bases: BTreeSet<&str> = markets.iter().map(|m| m.base.as_str()).collect();
    let mut deposits: Vec<(&str, Decimal)> = quotes.iter().map(|q| (*q, cfg.quote_deposit)).collect();
    deposits.extend(bases.iter().map(|b| (*b, cfg.base_deposit)));

    for account in &accounts {
        deposit_assets(client, account, &deposits).await?;
    }
    tracing::info!(
        accounts = accounts.len(),
        markets = markets.len(),
        assets = deposits.len(),
        "bot accounts funded"
    );

    Ok(Roster { accounts, markets })
}
