//! # Trade-lifecycle Scenario
//!
//! A fixed sequence of exchange operations, each followed by exact checks on
//! balances, orders, the market summary and depth. The sequence is data
//! (`Vec<Step>`, see [`builder::trade_lifecycle`]) executed by a generic
//! [`StepRunner`]; any failed check aborts the run.

use api_client::ExchangeClient;
use configuration::ScenarioConfig;
use core_types::numeric::DEFAULT_PRECISION;
use events::{check_counts, CapturedEvents, EventCapture, EventSource, ExpectedCounts};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod runner;
pub mod step;

// --- Public API ---
pub use builder::trade_lifecycle;
pub use error::ScenarioError;
pub use runner::StepRunner;
pub use step::{Action, Expectation, Step};

/// What a successful run did.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub steps: usize,
    pub orders: BTreeMap<String, u64>,
    /// Present when the event stream was captured.
    pub events: Option<CapturedEvents>,
}

/// Event totals for the configured account variant.
pub fn expected_counts(cfg: &ScenarioConfig) -> ExpectedCounts {
    if cfg.ask_account.account_ref().is_composite() {
        ExpectedCounts::MULTI_ACCOUNT
    } else {
        ExpectedCounts::SINGLE_ACCOUNT
    }
}

/// Runs the trade lifecycle against `client`.
///
/// The exchange is reset before anything else. With an event source, a capture
/// window is then opened and closed `settle_delay_secs` after the last step;
/// the per-topic counts must then match [`expected_counts`].
pub async fn run_trade_lifecycle<C>(
    client: &C,
    cfg: &ScenarioConfig,
    events: Option<&dyn EventSource>,
) -> Result<ScenarioReport, ScenarioError>
where
    C: ExchangeClient + ?Sized,
{
    client.connect().await?;
    let quote_precision = client
        .list_assets()
        .await?
        .into_iter()
        .find(|a| a.symbol == cfg.quote_asset)
        .map(|a| a.prec_show)
        .unwrap_or(DEFAULT_PRECISION);
    let steps = trade_lifecycle(cfg, quote_precision);
    tracing::info!(market = %cfg.market, steps = steps.len(), quote_precision, "starting trade lifecycle");

    // The reset step runs outside the capture window.
    let (reset, rest) = steps.split_at(1);
    let mut runner = StepRunner::new(client, cfg.market.clone(), cfg.depth_limit);
    let mut completed = runner.run(reset).await?;

    let capture = match events {
        Some(source) => Some(EventCapture::start(source).await?),
        None => None,
    };

    completed += runner.run(rest).await?;

    let events = match capture {
        Some(capture) => {
            tokio::time::sleep(Duration::from_secs(cfg.settle_delay_secs)).await;
            let captured = capture.stop().await?;
            tracing::info!(counts = ?captured.counts(), "captured events");
            check_counts(&captured, &expected_counts(cfg))?;
            Some(captured)
        }
        None => None,
    };

    tracing::info!(steps = completed, "trade lifecycle passed");
    Ok(ScenarioReport {
        steps: completed,
        orders: runner.order_ids(),
        events,
    })
}
