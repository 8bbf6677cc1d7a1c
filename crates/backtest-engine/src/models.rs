use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use analysis_core::Position;
use factor_scoring::{CoarseParams, IndicatorParams, StrategyKind, StrategyProfile};

// ============================================================
// Backtest
// ============================================================

/// Configuration for a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub profile: StrategyProfile,
    #[serde(default)]
    pub indicators: IndicatorParams,
    /// Notional starting capital; only scales the reported final capital.
    pub initial_capital: Decimal,
    /// Below this many years of history CAGR is flagged as low confidence.
    pub min_years_for_cagr: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self::for_profile(StrategyProfile::core())
    }
}

impl BacktestConfig {
    pub fn for_profile(profile: StrategyProfile) -> Self {
        Self {
            profile,
            indicators: IndicatorParams::default(),
            initial_capital: Decimal::new(100_000, 0),
            min_years_for_cagr: 0.5,
        }
    }
}

/// Summary statistics of one simulated return stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    /// Final equity - 1.
    pub total_return: f64,
    pub cagr: f64,
    /// Annualized, zero risk-free rate.
    pub sharpe_ratio: f64,
    /// Positive fraction in [0, 1].
    pub max_drawdown: f64,
    /// Fraction of invested bars with a positive return.
    pub win_rate: f64,
    /// Strategy total return - benchmark total return.
    pub alpha: f64,
    pub benchmark_total_return: f64,
    /// Fraction of bars invested.
    pub exposure: f64,
    pub invested_bars: usize,
    /// FLAT -> INVESTED transitions.
    pub entries: usize,
    /// Two-tailed p-value for Sharpe = 0.
    pub sharpe_p_value: f64,
    /// Set when Sharpe or CAGR rest on degenerate input (never invested,
    /// zero variance, or too little history).
    pub low_confidence: bool,
}

/// Full output of [`crate::BacktestEngine::run`].
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub profile: StrategyKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bars: usize,
    pub dates: Vec<NaiveDate>,
    pub scores: Vec<f64>,
    pub positions: Vec<Position>,
    pub benchmark_returns: Vec<f64>,
    pub strategy_returns: Vec<f64>,
    pub strategy_equity: Vec<f64>,
    pub benchmark_equity: Vec<f64>,
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub metrics: BacktestMetrics,
}

impl BacktestResult {
    /// Log returns of the bars actually held, in chronological order.
    pub fn invested_returns(&self) -> Vec<f64> {
        self.positions
            .iter()
            .zip(&self.benchmark_returns)
            .filter(|(p, _)| p.is_invested())
            .map(|(_, r)| *r)
            .collect()
    }
}

// ============================================================
// Walk-forward
// ============================================================

/// Rolling in-sample / out-of-sample search over the coarse signal model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub in_sample_bars: usize,
    pub out_of_sample_bars: usize,
    pub step_bars: usize,
    pub rsi_oversold_grid: Vec<f64>,
    pub buy_threshold_grid: Vec<f64>,
    /// Sell threshold = buy threshold - gap.
    pub hysteresis_gap: f64,
    pub min_windows: usize,
    #[serde(default)]
    pub indicators: IndicatorParams,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            in_sample_bars: 504,
            out_of_sample_bars: 126,
            step_bars: 126,
            rsi_oversold_grid: vec![30.0, 35.0, 40.0],
            buy_threshold_grid: vec![50.0, 60.0, 70.0],
            hysteresis_gap: 20.0,
            min_windows: 2,
            indicators: IndicatorParams::default(),
        }
    }
}

impl WalkForwardConfig {
    /// Number of (IS, OOS) windows that fit in `total_bars`, or `None` when
    /// not even one does.
    pub fn window_count(&self, total_bars: usize) -> Option<usize> {
        let span = self.in_sample_bars + self.out_of_sample_bars;
        if self.step_bars == 0 || total_bars < span {
            return None;
        }
        Some((total_bars - span) / self.step_bars + 1)
    }

    /// Cartesian grid; RSI-oversold outer, buy threshold inner.
    pub fn candidates(&self) -> Vec<CoarseParams> {
        let mut grid = Vec::with_capacity(self.rsi_oversold_grid.len() * self.buy_threshold_grid.len());
        for &rsi_oversold in &self.rsi_oversold_grid {
            for &buy in &self.buy_threshold_grid {
                grid.push(CoarseParams {
                    rsi_oversold,
                    buy_threshold: buy,
                    sell_threshold: buy - self.hysteresis_gap,
                });
            }
        }
        grid
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardWindowResult {
    pub window: usize,
    pub in_sample_start: NaiveDate,
    pub in_sample_end: NaiveDate,
    pub out_of_sample_start: NaiveDate,
    pub out_of_sample_end: NaiveDate,
    pub best_params: CoarseParams,
    pub in_sample_sharpe: f64,
    pub in_sample_return: f64,
    pub out_of_sample_return: f64,
    pub out_of_sample_sharpe: f64,
}

/// Robustness classification of the efficiency ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobustnessVerdict {
    /// Ratio >= 0.7.
    Robust,
    /// 0.3 <= ratio < 0.7.
    Moderate,
    /// Ratio < 0.3.
    Overfit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardSummary {
    pub windows: Vec<WalkForwardWindowResult>,
    pub grid_size: usize,
    pub mean_in_sample_return: f64,
    pub mean_out_of_sample_return: f64,
    /// mean(OOS) / mean(IS).
    pub efficiency_ratio: f64,
    pub verdict: RobustnessVerdict,
    /// Mean in-sample return too close to zero for the ratio to mean much.
    pub low_confidence: bool,
}

// ============================================================
// Monte Carlo
// ============================================================

/// p-value cut-offs for the reporting labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificanceLevels {
    pub highly: f64,
    pub significant: f64,
    pub marginal: f64,
}

impl Default for SignificanceLevels {
    fn default() -> Self {
        Self {
            highly: 0.01,
            significant: 0.05,
            marginal: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceLabel {
    HighlySignificant,
    Significant,
    Marginal,
    NotSignificant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub simulations: usize,
    /// Minimum invested-bar sample before the bootstrap runs.
    pub min_trades: usize,
    /// Base seed; drawn once at random when absent.
    pub seed: Option<u64>,
    pub significance: SignificanceLevels,
    /// Capital buffer = 95th-percentile drawdown x this.
    pub drawdown_safety_multiplier: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            simulations: 1000,
            min_trades: 10,
            seed: None,
            significance: SignificanceLevels::default(),
            drawdown_safety_multiplier: 1.5,
        }
    }
}

/// Distribution of resampled invested-bar sequences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
    pub sample_size: usize,
    pub actual_return: f64,
    pub mean_return: f64,
    pub median_return: f64,
    pub percentile_5_return: f64,
    pub percentile_95_return: f64,
    pub median_max_drawdown: f64,
    pub max_drawdown_95: f64,
    /// Suggested reserve: `max_drawdown_95 x drawdown_safety_multiplier`.
    pub capital_buffer: f64,
    /// Fraction of resampled returns at or below the actual one.
    pub actual_return_percentile: f64,
    pub return_distribution: Vec<f64>,
    pub drawdown_distribution: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BootstrapOutcome {
    Completed(BootstrapReport),
    Skipped {
        sample_size: usize,
        minimum: usize,
        reason: String,
    },
}

impl BootstrapOutcome {
    pub fn report(&self) -> Option<&BootstrapReport> {
        match self {
            BootstrapOutcome::Completed(r) => Some(r),
            BootstrapOutcome::Skipped { .. } => None,
        }
    }
}

/// Null distribution from shuffling the market return series under fixed positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermutationReport {
    pub actual_return: f64,
    pub actual_sharpe: f64,
    pub mean_permuted_return: f64,
    pub mean_permuted_sharpe: f64,
    pub percentile_95_permuted_return: f64,
    pub percentile_95_permuted_sharpe: f64,
    pub p_value_return: f64,
    pub p_value_sharpe: f64,
    pub return_label: SignificanceLabel,
    pub sharpe_label: SignificanceLabel,
    pub return_distribution: Vec<f64>,
    pub sharpe_distribution: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub simulations: usize,
    pub seed: u64,
    pub bootstrap: BootstrapOutcome,
    pub permutation: PermutationReport,
    /// Both permutation p-values below the `significant` level. The two tests
    /// are not corrected for multiple comparisons.
    pub is_significant: bool,
}

// ============================================================
// Forward projection
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    pub paths: usize,
    pub horizon_bars: usize,
    pub seed: Option<u64>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            paths: 10_000,
            horizon_bars: 252,
            seed: None,
        }
    }
}

/// Terminal-value distribution of a geometric Brownian motion fitted to the
/// strategy's per-bar returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardProjection {
    pub paths: usize,
    pub horizon_bars: usize,
    pub seed: u64,
    pub current_value: f64,
    pub mean_final_value: f64,
    pub median_final_value: f64,
    pub min_final_value: f64,
    pub max_final_value: f64,
    /// Current value - 5th percentile terminal value.
    pub var_95: f64,
    pub var_95_fraction: f64,
    /// Probability of ending below half the current value.
    pub probability_of_halving: f64,
}

// ============================================================
// Stress periods
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressPeriod {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressPeriodResult {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bars: usize,
    pub strategy_return: f64,
    /// Lowest equity in the period relative to its first value, minus 1 (<= 0).
    pub worst_decline: f64,
    pub benchmark_return: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub symbol: String,
    pub periods: Vec<StressPeriodResult>,
}

// ============================================================
// Data quality
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub total_bars: usize,
    pub missing_dates: usize,
    pub price_spike_count: usize,
    pub warnings: Vec<DataWarning>,
    pub corporate_events: Vec<CorporateEvent>,
    pub market_events: Vec<MarketEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataWarning {
    pub date: NaiveDate,
    pub symbol: String,
    pub warning_type: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorporateEvent {
    pub date: NaiveDate,
    pub symbol: String,
    pub event_type: String,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEvent {
    pub date: NaiveDate,
    pub event_type: String,
    pub magnitude: f64,
}
