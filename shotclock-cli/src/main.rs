//! Shotclock CLI: backtest prediction-market strategies against game states.
//!
//! Commands:
//! - `run`: backtest one game directory from a TOML config
//! - `batch`: backtest every game directory under a root, in parallel
//! - `strategies`: list strategy names accepted in `[strategy] name`
//!
//! Logging goes to stderr; set `RUST_LOG` to override the default
//! `shotclock=info` filter.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shotclock_core::components::STRATEGY_NAMES;
use shotclock_runner::{
    run_batch, run_game, save_artifacts, save_batch, BacktestConfig, BacktestRun, BatchResult,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "shotclock",
    about = "Shotclock CLI: causal tick/game-state backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest a single game directory (states.csv + ticks.jsonl).
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Game directory.
        #[arg(long)]
        game: PathBuf,

        /// Output directory for artifacts.
        #[arg(long, visible_alias = "out", default_value = "results")]
        output_dir: PathBuf,

        /// Print the full run as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Backtest every game directory under a root.
    Batch {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Directory containing one subdirectory per game.
        #[arg(long)]
        games: PathBuf,

        /// Output directory for artifacts.
        #[arg(long, visible_alias = "out", default_value = "results")]
        output_dir: PathBuf,

        /// Worker threads. Defaults to one per core.
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// List available strategies.
    Strategies,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shotclock=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            game,
            output_dir,
            json,
        } => run_cmd(config, game, output_dir, json),
        Commands::Batch {
            config,
            games,
            output_dir,
            jobs,
        } => batch_cmd(config, games, output_dir, jobs),
        Commands::Strategies => {
            for name in STRATEGY_NAMES {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn run_cmd(config_path: PathBuf, game: PathBuf, output_dir: PathBuf, json: bool) -> Result<()> {
    let config = BacktestConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let run = run_game(&config, &game, None)
        .with_context(|| format!("backtesting {}", game.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_summary(&run);
    }

    let run_dir = save_artifacts(&run, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn batch_cmd(
    config_path: PathBuf,
    games: PathBuf,
    output_dir: PathBuf,
    jobs: Option<usize>,
) -> Result<()> {
    let config = BacktestConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let result = run_batch(&config, &games, jobs, None)
        .with_context(|| format!("batch over {}", games.display()))?;

    print_batch(&result);

    let path = save_batch(&result, &config.strategy.name, &output_dir)?;
    println!("Batch summary saved to: {}", path.display());
    Ok(())
}

fn print_summary(run: &BacktestRun) {
    let m = &run.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Game:           {}", run.game_id);
    println!("Strategy:       {}", run.strategy_name());
    println!("Status:         {}", run.status.label());
    println!(
        "Snapshots:      {} ({} processed)",
        run.snapshot_count, run.snapshots_processed
    );
    println!(
        "Trades:         {} ({} liquidation)",
        m.trade_count, m.liquidation_count
    );
    println!("Rejections:     {}", run.rejections.len());
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {:.2}", m.final_equity);
    println!("Total PnL:      {:.2} (gross {:.2}, fees {:.2})", m.total_pnl, m.gross_pnl, m.total_fees);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Round Trips:    {}", m.round_trips);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Avg Win/Loss:   {:.2} / {:.2}", m.avg_win, m.avg_loss);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Avg Hold:       {:.0}s", m.avg_holding_secs);
    for (reason, count) in &m.rejections_by_reason {
        println!("Rejected:       {reason} x{count}");
    }
}

fn print_batch(result: &BatchResult) {
    let s = &result.summary;
    println!();
    println!("=== Batch Result ===");
    println!(
        "Games:          {} ({} completed, {} failed)",
        s.games, s.completed, s.failed
    );
    println!("Trades:         {}", s.trade_count);
    println!("Total PnL:      {:.2} (gross {:.2}, fees {:.2})", s.total_pnl, s.gross_pnl, s.total_fees);
    println!("Round Trips:    {}", s.round_trips);
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    println!("Worst Drawdown: {:.2}%", s.worst_drawdown * 100.0);
    for failure in &result.failures {
        println!("FAILED:         {} ({})", failure.game_id, failure.error);
    }
}
