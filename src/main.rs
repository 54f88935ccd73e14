use clap::{Parser, Subcommand};
use configuration::Config;
use core_types::{BookLevel, MarketSnapshot};
use engine::Engine;
use events::EngineEvent;
use executor::SimulatedGateway;
use metrics::NoopSink;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

/// The main entry point for the Meridian trading engine.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables (log filters, future gateway credentials).
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_engine(args).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// An autonomous regime-switching scalping engine.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading loop until interrupted, then print a performance report.
    Run(RunArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Trade against the built-in simulated venue and synthetic feed.
    #[arg(long)]
    dry_run: bool,
}

// ==============================================================================
// Run Command Logic
// ==============================================================================

async fn run_engine(args: RunArgs) -> anyhow::Result<()> {
    let config = configuration::load_config_from(&args.config)?;
    tracing::info!(
        config = %args.config,
        symbols = ?config.trading.symbols,
        dry_run = args.dry_run,
        "configuration loaded"
    );

    // Only the simulated venue is wired in; a live gateway slots in behind
    // the same trait once venue credentials exist.
    if !args.dry_run && config.exchange.name != "simulated" {
        anyhow::bail!(
            "no live gateway available for venue '{}'; use --dry-run or exchange.name = \"simulated\"",
            config.exchange.name
        );
    }
    let gateway = Arc::new(SimulatedGateway::new(config.trading.taker_fee_pct));

    let engine = Engine::new(config.clone(), gateway, Arc::new(NoopSink))?;

    // Log the event stream. The trading path never waits on this subscriber.
    let mut events = engine.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                EngineEvent::Risk(e) => {
                    tracing::warn!(symbol = %e.symbol, code = e.reason.code(), detail = %e.detail, "risk event");
                }
                EngineEvent::RegimeChange(e) => {
                    tracing::info!(symbol = %e.symbol, from = ?e.from, to = ?e.to, strategy = ?e.strategy, "regime change");
                }
                EngineEvent::OrderOutcome(e) => {
                    tracing::info!(symbol = %e.symbol, status = ?e.status, "order outcome");
                }
                EngineEvent::FillApplied(fill) => {
                    tracing::info!(symbol = %fill.symbol, side = ?fill.side, price = %fill.price, qty = %fill.quantity, "fill applied");
                }
                EngineEvent::PortfolioState(state) => {
                    tracing::debug!(total_value = %state.total_value, cash = %state.cash, "portfolio marked");
                }
            }
        }
    });

    // Cooperative shutdown on Ctrl-C.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let (feed_tx, feed_rx) = mpsc::channel(256);
    for symbol in config.trading.symbols.clone() {
        tokio::spawn(synthetic_feed(symbol, feed_tx.clone()));
    }
    drop(feed_tx);

    let ledger = engine.ledger();
    engine.run(feed_rx, shutdown_rx).await?;

    // Final accounting once the loop has drained.
    let ledger = ledger.lock().await;
    let evaluator = analytics::PerformanceEvaluator::new(config.analytics.sharpe_annualization);
    let report = evaluator.calculate(
        ledger.closed_trades(),
        ledger.equity_curve(),
        config.trading.initial_capital,
    )?;
    tracing::info!(
        total_return_pct = %report.total_return_pct,
        sharpe = ?report.sharpe_ratio,
        max_drawdown = %report.max_drawdown,
        win_rate_pct = ?report.win_rate_pct,
        trades = report.total_trades,
        realized_pnl = %report.realized_pnl,
        fees = %report.fees_paid,
        "session complete"
    );

    Ok(())
}

// ==============================================================================
// Synthetic Feed
// ==============================================================================

/// Publishes a deterministic order-book stream for one symbol: a slow price
/// wave with periodic bursts of one-sided depth, enough to drive every
/// generator through its paces without venue connectivity.
async fn synthetic_feed(symbol: String, tx: mpsc::Sender<MarketSnapshot>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut tick: u64 = 0;

    loop {
        ticker.tick().await;
        tick += 1;

        let phase = tick as f64 * 0.05;
        let mid = 100.0 * (1.0 + 0.01 * phase.sin());
        let Some(mid) = Decimal::from_f64_retain(mid).map(|m| m.round_dp(4)) else {
            continue;
        };
        let half_spread = mid * dec!(0.0002);

        // Depth leans bid-heavy or ask-heavy on a slower cycle so the
        // scalping generator sees genuine imbalances.
        let lean = ((tick / 40) % 3) as i64;
        let (bid_size, ask_size) = match lean {
            0 => (dec!(8), dec!(3)),
            1 => (dec!(3), dec!(8)),
            _ => (dec!(5), dec!(5)),
        };

        let snapshot = MarketSnapshot {
            symbol: symbol.clone(),
            bids: vec![BookLevel {
                price: mid - half_spread,
                size: bid_size,
            }],
            asks: vec![BookLevel {
                price: mid + half_spread,
                size: ask_size,
            }],
            timestamp: chrono::Utc::now(),
        };

        if tx.send(snapshot).await.is_err() {
            return; // Engine stopped routing.
        }
    }
}
