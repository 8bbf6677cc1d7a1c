use rayon::prelude::*;
use tracing::{debug, info, warn};

use analysis_core::stats::mean;
use analysis_core::{AnalysisError, PriceSeries, Result, EPSILON};
use factor_scoring::{CoarseParams, IndicatorSet};

use crate::engine::{simulate_returns, Simulation};
use crate::models::*;

/// Rolling in-sample grid search with out-of-sample evaluation of the winner.
///
/// Answers how much of the coarse model's in-sample performance survives
/// when its thresholds are chosen without seeing the evaluation window.
pub struct WalkForwardOptimizer {
    config: WalkForwardConfig,
}

impl WalkForwardOptimizer {
    pub fn new(config: WalkForwardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    /// Reject malformed configurations before any simulation work.
    pub fn validate(&self) -> Result<()> {
        let c = &self.config;
        if c.in_sample_bars == 0 || c.out_of_sample_bars == 0 || c.step_bars == 0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "walk-forward lengths must be positive (IS {}, OOS {}, step {})",
                c.in_sample_bars, c.out_of_sample_bars, c.step_bars
            )));
        }
        if c.rsi_oversold_grid.is_empty() || c.buy_threshold_grid.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "walk-forward parameter grid is empty".into(),
            ));
        }
        if c.min_windows == 0 {
            return Err(AnalysisError::InvalidConfig("min_windows must be at least 1".into()));
        }
        if c.rsi_oversold_grid.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidConfig(
                "RSI oversold candidates must be finite".into(),
            ));
        }
        for candidate in c.candidates() {
            candidate.validate()?;
        }
        c.indicators.validate()
    }

    /// Number of windows for a series of `total_bars`, failing when fewer
    /// than `min_windows` fit.
    pub fn window_count(&self, total_bars: usize) -> Result<usize> {
        let c = &self.config;
        let required = c.in_sample_bars + c.out_of_sample_bars + c.step_bars * c.min_windows.saturating_sub(1);
        match c.window_count(total_bars) {
            Some(n) if n >= c.min_windows => Ok(n),
            _ => Err(AnalysisError::insufficient(
                format!(
                    "walk-forward ({} IS + {} OOS bars, step {}, {} windows)",
                    c.in_sample_bars, c.out_of_sample_bars, c.step_bars, c.min_windows
                ),
                required,
                total_bars,
            )),
        }
    }

    pub fn run(&self, series: &PriceSeries) -> Result<WalkForwardSummary> {
        self.validate()?;
        let iterations = self.window_count(series.len())?;

        let c = &self.config;
        let candidates = c.candidates();
        info!(
            "Walk-forward on {}: {} windows x {} candidates",
            series.symbol(),
            iterations,
            candidates.len()
        );

        // Computed once on the full history so every window sees warmed-up,
        // causal indicator values.
        let indicators = IndicatorSet::compute(series, &c.indicators)?;
        let dates = series.dates();

        let mut windows = Vec::with_capacity(iterations);
        for w in 0..iterations {
            let is_start = w * c.step_bars;
            let oos_start = is_start + c.in_sample_bars;
            let oos_end = oos_start + c.out_of_sample_bars;

            let is_ind = indicators.slice(is_start..oos_start)?;
            let oos_ind = indicators.slice(oos_start..oos_end)?;

            let (best, is_sim) = best_candidate(&candidates, &is_ind)?;
            let oos_sim = coarse_backtest(&best, &oos_ind)?;

            debug!(
                "Window {}: best rsi_oversold={} buy={} sell={} | IS sharpe {:.3} return {:.4} | OOS return {:.4}",
                w + 1,
                best.rsi_oversold,
                best.buy_threshold,
                best.sell_threshold,
                is_sim.metrics.sharpe_ratio,
                is_sim.metrics.total_return,
                oos_sim.metrics.total_return
            );

            windows.push(WalkForwardWindowResult {
                window: w + 1,
                in_sample_start: dates[is_start],
                in_sample_end: dates[oos_start - 1],
                out_of_sample_start: dates[oos_start],
                out_of_sample_end: dates[oos_end - 1],
                best_params: best,
                in_sample_sharpe: is_sim.metrics.sharpe_ratio,
                in_sample_return: is_sim.metrics.total_return,
                out_of_sample_return: oos_sim.metrics.total_return,
                out_of_sample_sharpe: oos_sim.metrics.sharpe_ratio,
            });
        }

        let summary = summarize(windows, candidates.len());
        if summary.low_confidence {
            warn!(
                "{}: mean in-sample return is ~0, efficiency ratio is low confidence",
                series.symbol()
            );
        }
        info!(
            "Walk-forward complete for {}: IS {:.4}, OOS {:.4}, efficiency {:.2} ({:?})",
            series.symbol(),
            summary.mean_in_sample_return,
            summary.mean_out_of_sample_return,
            summary.efficiency_ratio,
            summary.verdict
        );
        Ok(summary)
    }
}

/// Simplified backtest of the coarse model on one slice.
pub fn coarse_backtest(params: &CoarseParams, indicators: &IndicatorSet) -> Result<Simulation> {
    indicators.check_lengths()?;
    let positions = params.positions(indicators)?;
    simulate_returns(&indicators.log_returns, &positions)
}

/// Highest in-sample Sharpe wins; on ties the first candidate in grid
/// order is kept. Candidates are evaluated in parallel but reduced in order.
fn best_candidate(
    candidates: &[CoarseParams],
    indicators: &IndicatorSet,
) -> Result<(CoarseParams, Simulation)> {
    let results: Vec<Simulation> = candidates
        .par_iter()
        .map(|c| coarse_backtest(c, indicators))
        .collect::<Result<Vec<_>>>()?;

    let mut best = 0;
    for (k, sim) in results.iter().enumerate().skip(1) {
        if sim.metrics.sharpe_ratio > results[best].metrics.sharpe_ratio {
            best = k;
        }
    }

    let params = candidates[best];
    let sim = results.into_iter().nth(best).ok_or_else(|| {
        AnalysisError::InvalidConfig("walk-forward parameter grid is empty".into())
    })?;
    Ok((params, sim))
}

fn summarize(windows: Vec<WalkForwardWindowResult>, grid_size: usize) -> WalkForwardSummary {
    let is_returns: Vec<f64> = windows.iter().map(|w| w.in_sample_return).collect();
    let oos_returns: Vec<f64> = windows.iter().map(|w| w.out_of_sample_return).collect();
    let mean_is = mean(&is_returns);
    let mean_oos = mean(&oos_returns);

    let efficiency_ratio = efficiency_ratio(mean_is, mean_oos);

    WalkForwardSummary {
        windows,
        grid_size,
        mean_in_sample_return: mean_is,
        mean_out_of_sample_return: mean_oos,
        efficiency_ratio,
        verdict: classify_efficiency(efficiency_ratio),
        low_confidence: mean_is.abs() < EPSILON,
    }
}

/// mean(OOS) / mean(IS) with the denominator pushed away from zero while
/// keeping its sign.
pub fn efficiency_ratio(mean_in_sample: f64, mean_out_of_sample: f64) -> f64 {
    let denom = if mean_in_sample.abs() < EPSILON {
        EPSILON.copysign(mean_in_sample)
    } else {
        mean_in_sample
    };
    mean_out_of_sample / denom
}

pub fn classify_efficiency(ratio: f64) -> RobustnessVerdict {
    if ratio >= 0.7 {
        RobustnessVerdict::Robust
    } else if ratio >= 0.3 {
        RobustnessVerdict::Moderate
    } else {
        RobustnessVerdict::Overfit
    }
}
