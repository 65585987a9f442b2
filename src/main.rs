use anyhow::Context;
use api_client::{ExchangeClient, HttpExchangeClient};
use bot::MarketMaker;
use clap::{Parser, Subcommand};
use configuration::cli::Overrides;
use configuration::logging::init_tracing;
use configuration::{load_config, Settings};
use events::{EventSource, WsEventSource};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Entry point for the exchange test harness.
#[tokio::main]
async fn main() {
    // A missing .env file is fine; the settings file and defaults still apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %format!("{:#}", e), "command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Integration-test sequencer and market-making bot for a spot exchange.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trade-lifecycle scenario against a freshly reset exchange.
    Scenario,
    /// Fund the bot accounts and place randomized orders until Ctrl-C.
    Bot,
    /// Print the asset list, market list and the scenario market's summary.
    Info,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = load_config(cli.config.as_deref()).context("failed to load settings")?;
    cli.overrides.apply(&mut settings);
    let _guard = init_tracing(&settings.logging)?;

    let client = Arc::new(HttpExchangeClient::new(&settings.exchange)?);
    tracing::info!(exchange = %settings.exchange.base_url, "exchange client ready");

    match cli.command {
        Commands::Scenario => handle_scenario(client, &settings).await,
        Commands::Bot => handle_bot(client, &settings).await,
        Commands::Info => handle_info(client, &settings).await,
    }
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_scenario(client: Arc<HttpExchangeClient>, settings: &Settings) -> anyhow::Result<()> {
    let source = if settings.scenario.with_mq {
        Some(WsEventSource::new(&settings.event_stream.url)?)
    } else {
        None
    };
    let events = source.as_ref().map(|s| s as &dyn EventSource);

    let report = scenario::run_trade_lifecycle(&*client, &settings.scenario, events).await?;

    println!("Trade lifecycle passed: {} steps", report.steps);
    for (label, id) in &report.orders {
        println!("  order {:<10} id {}", label, id);
    }
    if let Some(captured) = &report.events {
        for (topic, count) in captured.counts() {
            println!("  {:<10} {} events", topic, count);
        }
    }
    Ok(())
}

async fn handle_bot(client: Arc<HttpExchangeClient>, settings: &Settings) -> anyhow::Result<()> {
    let roster = bot::bootstrap(&*client, &settings.bot).await?;
    let prices = price_feed::build_source(&settings.price_feed)?;

    let client: Arc<dyn ExchangeClient> = client;
    let mut market_maker = MarketMaker::new(client, prices, roster, settings.bot.clone());

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping after the current tick");
            trigger.cancel();
        }
    });

    let stats = market_maker.run(shutdown).await;
    println!(
        "Bot stopped after {} ticks ({} failed), {} orders placed, {} cancel sweeps",
        stats.ticks, stats.failed_ticks, stats.orders_placed, stats.cancel_sweeps
    );
    Ok(())
}

async fn handle_info(client: Arc<HttpExchangeClient>, settings: &Settings) -> anyhow::Result<()> {
    client.connect().await?;
    let assets = client.list_assets().await?;
    let markets = client.list_markets().await?;
    let summary = client.get_market_summary(&settings.scenario.market).await?;

    println!("Assets:\n{}", serde_json::to_string_pretty(&assets)?);
    println!("Markets:\n{}", serde_json::to_string_pretty(&markets)?);
    println!("Summary of {}:\n{}", settings.scenario.market, serde_json::to_string_pretty(&summary)?);
    Ok(())
}
