use serde::{Deserialize, Serialize};

use crate::indicator_set::IndicatorSet;
use crate::profile::{StrategyKind, StrategyProfile};

/// Per-factor shares (each in [0, 1]) behind one bar's composite score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorShares {
    pub trend: f64,
    pub quality: f64,
    pub value: f64,
    pub technical: f64,
    pub cost: f64,
    pub sentiment: f64,
}

impl FactorShares {
    /// Weighted sum clamped to [0, 100].
    pub fn composite(&self, profile: &StrategyProfile) -> f64 {
        let w = &profile.weights;
        let score = w.trend * self.trend
            + w.quality * self.quality
            + w.value * self.value
            + w.technical * self.technical
            + w.cost * self.cost
            + w.sentiment * self.sentiment;
        score.clamp(0.0, 100.0)
    }
}

/// Factor shares for bar `i` under `profile`.
pub fn factor_shares(profile: &StrategyProfile, ind: &IndicatorSet, i: usize) -> FactorShares {
    match profile.kind {
        StrategyKind::Core => core_shares(ind, i),
        StrategyKind::Satellite => satellite_shares(profile, ind, i),
    }
}

/// Composite score for every bar of `ind`.
pub fn composite_scores(profile: &StrategyProfile, ind: &IndicatorSet) -> Vec<f64> {
    (0..ind.len())
        .map(|i| factor_shares(profile, ind, i).composite(profile))
        .collect()
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn core_shares(ind: &IndicatorSet, i: usize) -> FactorShares {
    let trend = (flag(ind.regime_bullish(i)) + flag(ind.ma_cross(i)) + flag(ind.above_long_ma(i))) / 3.0;
    let quality = 0.4 + 0.6 * flag(ind.momentum_positive(i));

    let percentile_share: f64 = if ind.percentile_ready[i] {
        match ind.rsi_percentile[i] {
            p if p < 0.25 => 0.70,
            p if p < 0.40 => 0.50,
            p if p < 0.60 => 0.35,
            p if p < 0.80 => 0.15,
            _ => 0.0,
        }
    } else {
        0.35
    };
    let band_share = match ind.band_position(i) {
        b if b < 0.3 => 0.30,
        b if b < 0.7 => 0.15,
        _ => 0.0,
    };

    FactorShares {
        trend,
        quality,
        value: (percentile_share + band_share).min(1.0),
        technical: 0.0,
        cost: 2.0 / 3.0,
        sentiment: 0.0,
    }
}

fn satellite_shares(profile: &StrategyProfile, ind: &IndicatorSet, i: usize) -> FactorShares {
    let trend = 0.5 * flag(ind.regime_bullish(i))
        + 0.25 * flag(ind.ma_cross(i))
        + 0.25 * flag(ind.above_long_ma(i));
    let quality = 0.5 + 0.5 * flag(ind.momentum_positive(i));

    // Bimodal: reward both dips and breakouts, nothing at extremes
    let mut technical: f64 = if ind.percentile_ready[i] {
        match ind.rsi_percentile[i] {
            p if p < 0.20 => 0.75,
            p if p < 0.40 => 0.50,
            p if p <= 0.60 => 0.25,
            p if p < 0.90 => 0.75,
            _ => 0.0,
        }
    } else {
        0.25
    };
    if ind.band_position(i) < 0.05 {
        technical += 0.25;
    }
    if ind.rsi[i] > profile.overbought_rsi {
        technical -= 0.25;
    }

    FactorShares {
        trend,
        quality,
        value: 0.5,
        technical: technical.clamp(0.0, 1.0),
        cost: 0.0,
        sentiment: 0.5,
    }
}
