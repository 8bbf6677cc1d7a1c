use analysis_core::{Position, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicator_set::IndicatorSet;
use crate::profile::{validate_thresholds, StrategyProfile};
use crate::scoring::composite_scores;

/// Two-threshold FLAT/INVESTED state machine.
///
/// A flat machine enters on `score >= buy`; an invested machine exits on
/// `score < sell` or when the exit override fires. Scores strictly between
/// the thresholds never cause a transition. Entry is also refused on a bar
/// where the override holds, otherwise the machine would re-enter on the
/// same signal that just forced it out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HysteresisMachine {
    buy_threshold: f64,
    sell_threshold: f64,
}

impl HysteresisMachine {
    pub fn new(buy_threshold: f64, sell_threshold: f64) -> Result<Self> {
        validate_thresholds(buy_threshold, sell_threshold)?;
        Ok(Self {
            buy_threshold,
            sell_threshold,
        })
    }

    pub fn buy_threshold(&self) -> f64 {
        self.buy_threshold
    }

    pub fn sell_threshold(&self) -> f64 {
        self.sell_threshold
    }

    /// Single transition from `state` given this bar's score and override.
    pub fn step(&self, state: Position, score: f64, exit_override: bool) -> Position {
        match state {
            Position::Flat if score >= self.buy_threshold && !exit_override => Position::Invested,
            Position::Invested if score < self.sell_threshold || exit_override => Position::Flat,
            _ => state,
        }
    }

    /// Unlagged state after each bar, starting FLAT.
    pub fn run<F>(&self, scores: &[f64], exit_override: F) -> Vec<Position>
    where
        F: Fn(usize) -> bool,
    {
        let mut state = Position::Flat;
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| {
                state = self.step(state, score, exit_override(i));
                state
            })
            .collect()
    }
}

/// Delay positions one bar: the decision taken at the close of bar `i`
/// holds over bar `i + 1`. Bar 0 is always FLAT.
pub fn lag_positions(raw: &[Position]) -> Vec<Position> {
    let mut lagged = Vec::with_capacity(raw.len());
    if raw.is_empty() {
        return lagged;
    }
    lagged.push(Position::Flat);
    lagged.extend_from_slice(&raw[..raw.len() - 1]);
    lagged
}

/// Number of FLAT -> INVESTED transitions.
pub fn count_entries(positions: &[Position]) -> usize {
    let mut prev = Position::Flat;
    let mut entries = 0;
    for &p in positions {
        if p.is_invested() && !prev.is_invested() {
            entries += 1;
        }
        prev = p;
    }
    entries
}

/// Scores and tradeable (lagged) positions for one series.
#[derive(Debug, Clone, Serialize)]
pub struct SignalOutput {
    pub scores: Vec<f64>,
    pub positions: Vec<Position>,
}

/// Scoring plus hysteresis for a validated profile.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    profile: StrategyProfile,
    machine: HysteresisMachine,
}

impl SignalEngine {
    pub fn new(profile: StrategyProfile) -> Result<Self> {
        profile.validate()?;
        let machine = HysteresisMachine::new(profile.buy_threshold, profile.sell_threshold)?;
        Ok(Self { profile, machine })
    }

    pub fn profile(&self) -> &StrategyProfile {
        &self.profile
    }

    pub fn scores(&self, ind: &IndicatorSet) -> Vec<f64> {
        composite_scores(&self.profile, ind)
    }

    /// Positions lagged one bar, ready to multiply against returns.
    pub fn evaluate(&self, ind: &IndicatorSet) -> SignalOutput {
        let scores = self.scores(ind);
        let raw = match &self.profile.profit_take {
            Some(rule) => self
                .machine
                .run(&scores, |i| rule.fires(ind.rsi[i], ind.closes[i], ind.long_ma[i])),
            None => self.machine.run(&scores, |_| false),
        };
        let positions = lag_positions(&raw);
        debug!(
            "{} signals: {} bars, {} entries",
            self.profile.kind,
            positions.len(),
            count_entries(&positions)
        );
        SignalOutput { scores, positions }
    }

    pub fn positions(&self, ind: &IndicatorSet) -> Vec<Position> {
        self.evaluate(ind).positions
    }
}

/// Three-flag signal model searched by the walk-forward optimizer.
///
/// score = 40 x regime_bullish + 30 x momentum_positive + 30 x (RSI < rsi_oversold)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoarseParams {
    pub rsi_oversold: f64,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

impl CoarseParams {
    pub fn validate(&self) -> Result<()> {
        validate_thresholds(self.buy_threshold, self.sell_threshold)
    }

    pub fn scores(&self, ind: &IndicatorSet) -> Vec<f64> {
        (0..ind.len())
            .map(|i| {
                let mut score = 0.0;
                if ind.regime_bullish(i) {
                    score += 40.0;
                }
                if ind.momentum_positive(i) {
                    score += 30.0;
                }
                if ind.rsi[i] < self.rsi_oversold {
                    score += 30.0;
                }
                score
            })
            .collect()
    }

    /// Lagged positions for the coarse model.
    pub fn positions(&self, ind: &IndicatorSet) -> Result<Vec<Position>> {
        let machine = HysteresisMachine::new(self.buy_threshold, self.sell_threshold)?;
        let raw = machine.run(&self.scores(ind), |_| false);
        Ok(lag_positions(&raw))
    }
}
