use rust_decimal::prelude::*;
use tracing::{info, warn};

use analysis_core::stats::{sharpe_ratio, std_dev};
use analysis_core::{AnalysisError, Position, PriceSeries, Result, EPSILON, TRADING_DAYS_PER_YEAR};
use factor_scoring::{count_entries, IndicatorSet, SignalEngine};
use technical_analysis::{equity_curve, max_drawdown};

use crate::models::*;
use crate::statistical::sharpe_p_value;

/// Close-to-close backtester for one symbol under one scoring profile.
///
/// Positions come from [`SignalEngine::evaluate`], already lagged one bar:
/// the score formed at the close of bar `i` earns bar `i + 1`'s return. The
/// benchmark is the same series held throughout.
pub struct BacktestEngine {
    config: BacktestConfig,
}

/// Returns, equity curves and metrics for a fixed position series.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub strategy_returns: Vec<f64>,
    pub strategy_equity: Vec<f64>,
    pub benchmark_equity: Vec<f64>,
    pub metrics: BacktestMetrics,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    fn validate(&self) -> Result<SignalEngine> {
        if self.config.initial_capital <= Decimal::ZERO {
            return Err(AnalysisError::InvalidConfig(format!(
                "initial capital must be positive, got {}",
                self.config.initial_capital
            )));
        }
        if !self.config.min_years_for_cagr.is_finite() || self.config.min_years_for_cagr < 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "min_years_for_cagr must be a non-negative number".into(),
            ));
        }
        self.config.indicators.validate()?;
        SignalEngine::new(self.config.profile.clone())
    }

    /// Compute indicators for `series` and run the backtest.
    pub fn run(&self, series: &PriceSeries) -> Result<BacktestResult> {
        let signals = self.validate()?;
        let indicators = IndicatorSet::compute(series, &self.config.indicators)?;
        self.execute(series, &indicators, &signals)
    }

    /// Run against indicators computed elsewhere, e.g. on a longer history
    /// and then sliced to `series`.
    pub fn run_with_indicators(
        &self,
        series: &PriceSeries,
        indicators: &IndicatorSet,
    ) -> Result<BacktestResult> {
        let signals = self.validate()?;
        if indicators.len() != series.len() {
            return Err(AnalysisError::InvalidData(format!(
                "{} bars of indicators for a {}-bar series",
                indicators.len(),
                series.len()
            )));
        }
        indicators.check_lengths()?;
        self.execute(series, indicators, &signals)
    }

    fn execute(
        &self,
        series: &PriceSeries,
        indicators: &IndicatorSet,
        signals: &SignalEngine,
    ) -> Result<BacktestResult> {
        let profile = self.config.profile.kind;
        info!(
            "Running {} backtest for {} ({} bars)",
            profile,
            series.symbol(),
            series.len()
        );

        let output = signals.evaluate(indicators);
        let benchmark_returns = indicators.log_returns.clone();
        let mut sim = simulate_returns(&benchmark_returns, &output.positions)?;

        let years = series.len() as f64 / TRADING_DAYS_PER_YEAR;
        if years < self.config.min_years_for_cagr {
            warn!(
                "{}: only {:.2} years of history (minimum {}), CAGR is low confidence",
                series.symbol(),
                years,
                self.config.min_years_for_cagr
            );
            sim.metrics.low_confidence = true;
        }
        if sim.metrics.invested_bars == 0 {
            warn!("{}: strategy never entered a position", series.symbol());
        }

        let final_equity = sim.strategy_equity.last().copied().unwrap_or(1.0);
        let final_capital = Decimal::from_f64(final_equity)
            .map(|f| (self.config.initial_capital * f).round_dp(2))
            .unwrap_or(Decimal::ZERO);

        info!(
            "Backtest complete for {}: return {:.2}%, sharpe {:.2}, max drawdown {:.2}%, alpha {:.2}%, {} entries",
            series.symbol(),
            sim.metrics.total_return * 100.0,
            sim.metrics.sharpe_ratio,
            sim.metrics.max_drawdown * 100.0,
            sim.metrics.alpha * 100.0,
            sim.metrics.entries
        );

        Ok(BacktestResult {
            symbol: series.symbol().to_string(),
            profile,
            start_date: series.first_date(),
            end_date: series.last_date(),
            bars: series.len(),
            dates: series.dates(),
            scores: output.scores,
            positions: output.positions,
            benchmark_returns,
            strategy_returns: sim.strategy_returns,
            strategy_equity: sim.strategy_equity,
            benchmark_equity: sim.benchmark_equity,
            initial_capital: self.config.initial_capital,
            final_capital,
            metrics: sim.metrics,
        })
    }
}

/// Apply `positions` to per-bar `returns` and compute every summary metric.
///
/// Strategy return on bar `i` is `position[i] x returns[i]`; the benchmark
/// is always invested. Shared by the backtest, the walk-forward search and
/// the permutation test.
pub fn simulate_returns(returns: &[f64], positions: &[Position]) -> Result<Simulation> {
    if returns.len() != positions.len() {
        return Err(AnalysisError::InvalidData(format!(
            "{} returns but {} positions",
            returns.len(),
            positions.len()
        )));
    }

    let strategy_returns = apply_positions(returns, positions);
    let strategy_equity = equity_curve(&strategy_returns);
    let benchmark_equity = equity_curve(returns);

    let bars = returns.len();
    let total_return = final_return(&strategy_equity);
    let benchmark_total_return = final_return(&benchmark_equity);
    let sharpe = sharpe_ratio(&strategy_returns, TRADING_DAYS_PER_YEAR);

    let invested: Vec<f64> = strategy_returns
        .iter()
        .zip(positions)
        .filter(|(_, p)| p.is_invested())
        .map(|(r, _)| *r)
        .collect();
    let invested_bars = invested.len();
    let win_rate = if invested_bars > 0 {
        invested.iter().filter(|r| **r > 0.0).count() as f64 / invested_bars as f64
    } else {
        0.0
    };

    let degenerate = invested_bars == 0 || std_dev(&strategy_returns) < EPSILON;

    let metrics = BacktestMetrics {
        total_return,
        cagr: cagr(strategy_equity.last().copied().unwrap_or(1.0), bars),
        sharpe_ratio: sharpe,
        max_drawdown: max_drawdown(&strategy_equity),
        win_rate,
        alpha: total_return - benchmark_total_return,
        benchmark_total_return,
        exposure: if bars > 0 {
            invested_bars as f64 / bars as f64
        } else {
            0.0
        },
        invested_bars,
        entries: count_entries(positions),
        sharpe_p_value: sharpe_p_value(sharpe / TRADING_DAYS_PER_YEAR.sqrt(), bars),
        low_confidence: degenerate,
    };

    Ok(Simulation {
        strategy_returns,
        strategy_equity,
        benchmark_equity,
        metrics,
    })
}

pub(crate) fn apply_positions(returns: &[f64], positions: &[Position]) -> Vec<f64> {
    returns
        .iter()
        .zip(positions)
        .map(|(r, p)| p.exposure() * r)
        .collect()
}

pub(crate) fn final_return(equity: &[f64]) -> f64 {
    equity.last().map(|e| e - 1.0).unwrap_or(0.0)
}

/// Compound annual growth rate of a curve that ends at `final_equity`
/// after `bars` bars. A wiped-out curve reports -100%.
pub fn cagr(final_equity: f64, bars: usize) -> f64 {
    let years = bars as f64 / TRADING_DAYS_PER_YEAR;
    if years < EPSILON {
        return 0.0;
    }
    if final_equity <= 0.0 {
        return -1.0;
    }
    final_equity.powf(1.0 / years) - 1.0
}
