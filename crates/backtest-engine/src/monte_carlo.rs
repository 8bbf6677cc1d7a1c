use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use statrs::distribution::Normal;
use tracing::{info, warn};

use analysis_core::stats::{
    mean, percentile_rank, percentile_sorted, sample_distribution, sharpe_ratio, sort_floats, std_dev,
};
use analysis_core::{AnalysisError, Position, Result, TRADING_DAYS_PER_YEAR};
use technical_analysis::{equity_curve, max_drawdown};

use crate::engine::{apply_positions, final_return};
use crate::models::*;
use crate::statistical::{classify_significance, exceedance_p_value};

// Seed streams: iteration i of stream s uses base + s * STREAM_SPAN + i. With
// at most STREAM_SPAN iterations per stream no two draws share a generator.
const STREAM_SPAN: u64 = 1 << 32;
const BOOTSTRAP_STREAM: u64 = 0;
const PERMUTATION_STREAM: u64 = 1;
const PROJECTION_STREAM: u64 = 2;

const DISTRIBUTION_POINTS: usize = 200;

/// Bootstrap and permutation significance tests for one backtest.
pub struct MonteCarloValidator {
    config: MonteCarloConfig,
}

impl MonteCarloValidator {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.config;
        if c.simulations == 0 {
            return Err(AnalysisError::InvalidConfig(
                "Monte Carlo needs at least one simulation".into(),
            ));
        }
        if c.simulations as u64 > STREAM_SPAN {
            return Err(AnalysisError::InvalidConfig(format!(
                "at most {} simulations per run, got {}",
                STREAM_SPAN, c.simulations
            )));
        }
        let levels = &c.significance;
        let ordered = 0.0 < levels.highly
            && levels.highly <= levels.significant
            && levels.significant <= levels.marginal
            && levels.marginal <= 1.0;
        if !ordered {
            return Err(AnalysisError::InvalidConfig(format!(
                "significance levels must satisfy 0 < highly <= significant <= marginal <= 1 (got {}, {}, {})",
                levels.highly, levels.significant, levels.marginal
            )));
        }
        if !c.drawdown_safety_multiplier.is_finite() || c.drawdown_safety_multiplier < 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "drawdown safety multiplier must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    /// Run both tests against a completed backtest.
    pub fn run(&self, result: &BacktestResult) -> Result<MonteCarloResult> {
        info!(
            "Monte Carlo validation for {} ({} simulations)",
            result.symbol, self.config.simulations
        );
        self.run_on_returns(&result.benchmark_returns, &result.positions)
    }

    /// Run both tests for fixed `positions` over market `returns`.
    pub fn run_on_returns(&self, returns: &[f64], positions: &[Position]) -> Result<MonteCarloResult> {
        self.validate()?;
        if returns.len() != positions.len() {
            return Err(AnalysisError::InvalidData(format!(
                "{} returns but {} positions",
                returns.len(),
                positions.len()
            )));
        }
        if returns.len() < 2 {
            return Err(AnalysisError::insufficient("Monte Carlo returns", 2, returns.len()));
        }

        let seed = self.config.seed.unwrap_or_else(|| rand::thread_rng().gen());

        let invested: Vec<f64> = returns
            .iter()
            .zip(positions)
            .filter(|(_, p)| p.is_invested())
            .map(|(r, _)| *r)
            .collect();
        let bootstrap = self.bootstrap(&invested, seed);
        let permutation = self.permutation_test(returns, positions, seed);

        let level = self.config.significance.significant;
        let is_significant = permutation.p_value_return < level && permutation.p_value_sharpe < level;

        info!(
            "Permutation test: p(return) {:.4} [{:?}], p(sharpe) {:.4} [{:?}], significant: {}",
            permutation.p_value_return,
            permutation.return_label,
            permutation.p_value_sharpe,
            permutation.sharpe_label,
            is_significant
        );

        Ok(MonteCarloResult {
            simulations: self.config.simulations,
            seed,
            bootstrap,
            permutation,
            is_significant,
        })
    }

    /// Resample the invested-bar returns with replacement and look at the
    /// spread of compounded outcomes. Skipped below `min_trades` samples.
    pub fn bootstrap(&self, invested_returns: &[f64], seed: u64) -> BootstrapOutcome {
        let n = invested_returns.len();
        if n < self.config.min_trades || n == 0 {
            warn!(
                "Bootstrap skipped: {} invested bars, need at least {}",
                n, self.config.min_trades
            );
            return BootstrapOutcome::Skipped {
                sample_size: n,
                minimum: self.config.min_trades,
                reason: format!(
                    "only {} invested bars; at least {} are needed for a meaningful distribution",
                    n, self.config.min_trades
                ),
            };
        }

        let sims: Vec<(f64, f64)> = (0..self.config.simulations)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(stream_seed(seed, BOOTSTRAP_STREAM, i));
                let sample = bootstrap_resample(invested_returns, &mut rng);
                let equity = equity_curve(&sample);
                (final_return(&equity), max_drawdown(&equity))
            })
            .collect();

        let (mut returns, mut drawdowns): (Vec<f64>, Vec<f64>) = sims.into_iter().unzip();
        let actual_return = final_return(&equity_curve(invested_returns));
        let actual_return_percentile = percentile_rank(actual_return, &returns);

        sort_floats(&mut returns);
        sort_floats(&mut drawdowns);
        let max_drawdown_95 = percentile_sorted(&drawdowns, 95.0);

        BootstrapOutcome::Completed(BootstrapReport {
            sample_size: n,
            actual_return,
            mean_return: mean(&returns),
            median_return: percentile_sorted(&returns, 50.0),
            percentile_5_return: percentile_sorted(&returns, 5.0),
            percentile_95_return: percentile_sorted(&returns, 95.0),
            median_max_drawdown: percentile_sorted(&drawdowns, 50.0),
            max_drawdown_95,
            capital_buffer: max_drawdown_95 * self.config.drawdown_safety_multiplier,
            actual_return_percentile,
            return_distribution: sample_distribution(&returns, DISTRIBUTION_POINTS),
            drawdown_distribution: sample_distribution(&drawdowns, DISTRIBUTION_POINTS),
        })
    }

    /// Shuffle the whole market return series, keep positions fixed, and
    /// compare the real outcome with the shuffled ones.
    pub fn permutation_test(&self, returns: &[f64], positions: &[Position], seed: u64) -> PermutationReport {
        let actual = apply_positions(returns, positions);
        let actual_return = final_return(&equity_curve(&actual));
        let actual_sharpe = sharpe_ratio(&actual, TRADING_DAYS_PER_YEAR);

        let sims: Vec<(f64, f64)> = (0..self.config.simulations)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(stream_seed(seed, PERMUTATION_STREAM, i));
                let mut shuffled = returns.to_vec();
                shuffled.shuffle(&mut rng);
                let strategy = apply_positions(&shuffled, positions);
                (
                    final_return(&equity_curve(&strategy)),
                    sharpe_ratio(&strategy, TRADING_DAYS_PER_YEAR),
                )
            })
            .collect();

        let (mut permuted_returns, mut permuted_sharpes): (Vec<f64>, Vec<f64>) = sims.into_iter().unzip();
        let p_value_return = exceedance_p_value(actual_return, &permuted_returns);
        let p_value_sharpe = exceedance_p_value(actual_sharpe, &permuted_sharpes);

        sort_floats(&mut permuted_returns);
        sort_floats(&mut permuted_sharpes);

        let levels = &self.config.significance;
        PermutationReport {
            actual_return,
            actual_sharpe,
            mean_permuted_return: mean(&permuted_returns),
            mean_permuted_sharpe: mean(&permuted_sharpes),
            percentile_95_permuted_return: percentile_sorted(&permuted_returns, 95.0),
            percentile_95_permuted_sharpe: percentile_sorted(&permuted_sharpes, 95.0),
            p_value_return,
            p_value_sharpe,
            return_label: classify_significance(p_value_return, levels),
            sharpe_label: classify_significance(p_value_sharpe, levels),
            return_distribution: sample_distribution(&permuted_returns, DISTRIBUTION_POINTS),
            sharpe_distribution: sample_distribution(&permuted_sharpes, DISTRIBUTION_POINTS),
        }
    }
}

/// Seed for iteration `i` of RNG stream `stream`.
pub(crate) fn stream_seed(base: u64, stream: u64, i: usize) -> u64 {
    base.wrapping_add(stream * STREAM_SPAN).wrapping_add(i as u64)
}

/// One bootstrap draw: `returns.len()` samples with replacement.
pub fn bootstrap_resample<R: Rng + ?Sized>(returns: &[f64], rng: &mut R) -> Vec<f64> {
    let n = returns.len();
    if n == 0 {
        return Vec::new();
    }
    (0..n).map(|_| returns[rng.gen_range(0..n)]).collect()
}

/// Project `current_value` forward with a geometric Brownian motion fitted
/// to per-bar `returns`: log step = (mu - sigma^2 / 2) + sigma * Z.
pub fn project_forward(
    returns: &[f64],
    current_value: f64,
    config: &ProjectionConfig,
) -> Result<ForwardProjection> {
    if config.paths == 0 || config.horizon_bars == 0 {
        return Err(AnalysisError::InvalidConfig(
            "projection needs at least one path and one bar".into(),
        ));
    }
    if config.paths as u64 > STREAM_SPAN {
        return Err(AnalysisError::InvalidConfig(format!(
            "at most {} projection paths, got {}",
            STREAM_SPAN, config.paths
        )));
    }
    if !current_value.is_finite() || current_value <= 0.0 {
        return Err(AnalysisError::InvalidConfig(format!(
            "projection start value must be positive, got {}",
            current_value
        )));
    }
    if returns.len() < 2 {
        return Err(AnalysisError::insufficient("forward projection returns", 2, returns.len()));
    }

    let mu = mean(returns);
    let sigma = std_dev(returns);
    let drift = mu - 0.5 * sigma * sigma;
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AnalysisError::InvalidConfig(format!("standard normal: {}", e)))?;

    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let horizon = config.horizon_bars;

    let mut finals: Vec<f64> = (0..config.paths)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(stream_seed(seed, PROJECTION_STREAM, i));
            let log_growth: f64 = (0..horizon).map(|_| drift + sigma * normal.sample(&mut rng)).sum();
            current_value * log_growth.exp()
        })
        .collect();

    let halved = finals.iter().filter(|v| **v < current_value * 0.5).count();
    sort_floats(&mut finals);

    let p5 = percentile_sorted(&finals, 5.0);
    let var_95 = current_value - p5;

    info!(
        "Forward projection ({} paths, {} bars): median {:.2}, VaR95 {:.2}",
        config.paths,
        horizon,
        percentile_sorted(&finals, 50.0),
        var_95
    );

    Ok(ForwardProjection {
        paths: config.paths,
        horizon_bars: horizon,
        seed,
        current_value,
        mean_final_value: mean(&finals),
        median_final_value: percentile_sorted(&finals, 50.0),
        min_final_value: finals.first().copied().unwrap_or(current_value),
        max_final_value: finals.last().copied().unwrap_or(current_value),
        var_95,
        var_95_fraction: var_95 / current_value,
        probability_of_halving: halved as f64 / config.paths as f64,
    })
}
