//! backtest-cli: run the full validation pipeline over one CSV price history.
//!
//! Backtest, stress periods, walk-forward optimization, Monte Carlo
//! significance tests and a forward projection, written out as one JSON report.
//!
//! Usage:
//!   cargo run -p backtest-cli -- --prices spy.csv
//!   cargo run -p backtest-cli -- --prices spy.csv --profile satellite --seed 7
//!   cargo run -p backtest-cli -- --prices spy.csv --no-wfa --out report.json

mod config;
mod prices;

use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use analysis_core::AnalysisError;
use backtest_engine::{
    check_price_series, default_stress_periods, project_forward, stress_test, BacktestEngine,
    BacktestResult, DataQualityReport, ForwardProjection, MonteCarloResult, MonteCarloValidator,
    StressReport, WalkForwardOptimizer, WalkForwardSummary,
};

use config::RunConfig;

#[derive(Serialize)]
struct RunReport<'a> {
    config: &'a RunConfig,
    data_quality: DataQualityReport,
    backtest: &'a BacktestResult,
    stress: StressReport,
    walk_forward: Option<WalkForwardSummary>,
    monte_carlo: Option<MonteCarloResult>,
    projection: Option<ForwardProjection>,
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  backtest-cli --prices FILE.csv [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --symbol SYM         Symbol label (default: file name)");
    eprintln!("  --profile NAME       core | satellite (env BACKTEST_PROFILE)");
    eprintln!("  --simulations N      Monte Carlo iterations (env MC_SIMULATIONS)");
    eprintln!("  --seed N             Base RNG seed (env MC_SEED)");
    eprintln!("  --no-wfa             Skip walk-forward optimization");
    eprintln!("  --no-mc              Skip Monte Carlo validation");
    eprintln!("  --out FILE.json      Write the report to a file instead of stdout");
    std::process::exit(1);
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backtest_cli=info,backtest_engine=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let skip_wfa = args.iter().any(|a| a == "--no-wfa");
    let skip_mc = args.iter().any(|a| a == "--no-mc");

    let Some(prices_path) = arg_value(&args, "--prices").map(Path::new) else {
        usage();
    };
    let symbol = arg_value(&args, "--symbol")
        .map(str::to_string)
        .or_else(|| {
            prices_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_uppercase())
        })
        .unwrap_or_else(|| "UNKNOWN".to_string());

    // CLI flags win over environment
    let mut config = RunConfig::from_env()?;
    if let Some(profile) = arg_value(&args, "--profile") {
        config.profile = profile.parse()?;
    }
    if let Some(n) = arg_value(&args, "--simulations") {
        config.simulations = n.parse().context("--simulations must be a positive integer")?;
    }
    if let Some(seed) = arg_value(&args, "--seed") {
        config.seed = Some(seed.parse().context("--seed must be an unsigned integer")?);
    }

    let series = prices::load_prices(prices_path, &symbol)?;
    info!(
        "backtest-cli: {} ({} bars, {} to {}), profile={}",
        symbol,
        series.len(),
        series.first_date(),
        series.last_date(),
        config.profile
    );

    let data_quality = check_price_series(&series);
    if !data_quality.warnings.is_empty() {
        warn!(
            "{}: {} data warnings ({} price spikes, ~{} missing dates)",
            symbol,
            data_quality.warnings.len(),
            data_quality.price_spike_count,
            data_quality.missing_dates
        );
    }

    let backtest = BacktestEngine::new(config.backtest_config()).run(&series)?;
    let m = &backtest.metrics;
    info!(
        "{} {}: return {:.2}% vs benchmark {:.2}%, Sharpe {:.2}, max DD {:.2}%, {} entries",
        symbol,
        backtest.profile,
        m.total_return * 100.0,
        m.benchmark_total_return * 100.0,
        m.sharpe_ratio,
        m.max_drawdown * 100.0,
        m.entries
    );

    let stress = stress_test(&backtest, &default_stress_periods());

    let walk_forward = if skip_wfa {
        None
    } else {
        match WalkForwardOptimizer::new(config.walk_forward_config()).run(&series) {
            Ok(summary) => Some(summary),
            Err(e @ AnalysisError::InsufficientData { .. }) => {
                warn!("Walk-forward skipped: {}", e);
                None
            }
            Err(e) => return Err(e.into()),
        }
    };

    let monte_carlo = if skip_mc {
        None
    } else {
        Some(MonteCarloValidator::new(config.monte_carlo_config()).run(&backtest)?)
    };

    let current_value = backtest.final_capital.to_f64().unwrap_or(0.0);
    let projection =
        match project_forward(&backtest.strategy_returns, current_value, &config.projection_config()) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Forward projection skipped: {}", e);
                None
            }
        };

    let report = RunReport {
        config: &config,
        data_quality,
        backtest: &backtest,
        stress,
        walk_forward,
        monte_carlo,
        projection,
    };
    let json = serde_json::to_string_pretty(&report)?;

    match arg_value(&args, "--out") {
        Some(out) => {
            std::fs::write(out, json).with_context(|| format!("failed to write {}", out))?;
            info!("Report written to {}", out);
        }
        None => println!("{}", json),
    }

    Ok(())
}
