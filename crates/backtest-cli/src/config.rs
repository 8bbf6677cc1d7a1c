use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;

use backtest_engine::{BacktestConfig, MonteCarloConfig, ProjectionConfig, WalkForwardConfig};
use factor_scoring::{StrategyKind, StrategyProfile};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub profile: StrategyKind,
    pub initial_capital: Decimal,

    // Monte Carlo
    pub simulations: usize,
    pub seed: Option<u64>,

    // Walk-forward
    pub in_sample_bars: usize,
    pub out_of_sample_bars: usize,
    pub step_bars: usize,
}

impl RunConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; unset keys take the library defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let wfa = WalkForwardConfig::default();
        let mc = MonteCarloConfig::default();

        let var = |key: &str, default: String| lookup(key).unwrap_or(default);

        Ok(Self {
            profile: var("BACKTEST_PROFILE", "core".to_string())
                .parse()
                .context("BACKTEST_PROFILE")?,
            initial_capital: var("INITIAL_CAPITAL", "100000".to_string())
                .parse()
                .context("INITIAL_CAPITAL must be a decimal amount")?,
            simulations: var("MC_SIMULATIONS", mc.simulations.to_string())
                .parse()
                .context("MC_SIMULATIONS must be a positive integer")?,
            seed: lookup("MC_SEED")
                .map(|s| s.parse::<u64>())
                .transpose()
                .context("MC_SEED must be an unsigned integer")?,
            in_sample_bars: var("WFA_IN_SAMPLE_BARS", wfa.in_sample_bars.to_string())
                .parse()
                .context("WFA_IN_SAMPLE_BARS must be an integer")?,
            out_of_sample_bars: var("WFA_OUT_OF_SAMPLE_BARS", wfa.out_of_sample_bars.to_string())
                .parse()
                .context("WFA_OUT_OF_SAMPLE_BARS must be an integer")?,
            step_bars: var("WFA_STEP_BARS", wfa.step_bars.to_string())
                .parse()
                .context("WFA_STEP_BARS must be an integer")?,
        })
    }

    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            initial_capital: self.initial_capital,
            ..BacktestConfig::for_profile(StrategyProfile::for_kind(self.profile))
        }
    }

    pub fn walk_forward_config(&self) -> WalkForwardConfig {
        WalkForwardConfig {
            in_sample_bars: self.in_sample_bars,
            out_of_sample_bars: self.out_of_sample_bars,
            step_bars: self.step_bars,
            ..WalkForwardConfig::default()
        }
    }

    pub fn monte_carlo_config(&self) -> MonteCarloConfig {
        MonteCarloConfig {
            simulations: self.simulations,
            seed: self.seed,
            ..MonteCarloConfig::default()
        }
    }

    pub fn projection_config(&self) -> ProjectionConfig {
        ProjectionConfig {
            seed: self.seed,
            ..ProjectionConfig::default()
        }
    }
}
