use analysis_core::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Which of the two investment styles a profile encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Long-horizon, valuation-led allocation.
    Core,
    /// Shorter-horizon, momentum-led allocation with a profit-take exit.
    Satellite,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Core => write!(f, "core"),
            StrategyKind::Satellite => write!(f, "satellite"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "core" => Ok(StrategyKind::Core),
            "satellite" => Ok(StrategyKind::Satellite),
            other => Err(AnalysisError::InvalidConfig(format!(
                "unknown strategy profile '{}' (expected core or satellite)",
                other
            ))),
        }
    }
}

/// Factor weights in points; a valid set sums to 100.
///
/// For the Satellite profile the `value` slot carries the valuation factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub trend: f64,
    pub quality: f64,
    pub value: f64,
    pub technical: f64,
    pub cost: f64,
    pub sentiment: f64,
}

impl FactorWeights {
    pub fn core() -> Self {
        Self {
            trend: 15.0,
            quality: 35.0,
            value: 35.0,
            technical: 0.0,
            cost: 15.0,
            sentiment: 0.0,
        }
    }

    pub fn satellite() -> Self {
        Self {
            trend: 20.0,
            quality: 30.0,
            value: 25.0,
            technical: 20.0,
            cost: 0.0,
            sentiment: 5.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }

    fn as_array(&self) -> [f64; 6] {
        [
            self.trend,
            self.quality,
            self.value,
            self.technical,
            self.cost,
            self.sentiment,
        ]
    }
}

/// Forced exit for an extended, overbought position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitTakeRule {
    /// Exit when RSI is strictly above this level...
    pub rsi_above: f64,
    /// ...and the close is more than this multiple of the long moving average.
    pub extension_over_long_ma: f64,
}

impl Default for ProfitTakeRule {
    fn default() -> Self {
        Self {
            rsi_above: 75.0,
            extension_over_long_ma: 1.3,
        }
    }
}

impl ProfitTakeRule {
    pub fn fires(&self, rsi: f64, close: f64, long_ma: f64) -> bool {
        rsi > self.rsi_above && close > self.extension_over_long_ma * long_ma
    }
}

/// Read-only scoring and threshold configuration for one strategy style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub kind: StrategyKind,
    pub weights: FactorWeights,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    #[serde(default)]
    pub profit_take: Option<ProfitTakeRule>,
    /// RSI level above which the Satellite technical share is penalised.
    pub overbought_rsi: f64,
}

impl StrategyProfile {
    pub fn core() -> Self {
        Self {
            kind: StrategyKind::Core,
            weights: FactorWeights::core(),
            buy_threshold: 60.0,
            sell_threshold: 45.0,
            profit_take: None,
            overbought_rsi: 85.0,
        }
    }

    pub fn satellite() -> Self {
        Self {
            kind: StrategyKind::Satellite,
            weights: FactorWeights::satellite(),
            buy_threshold: 65.0,
            sell_threshold: 40.0,
            profit_take: Some(ProfitTakeRule::default()),
            overbought_rsi: 85.0,
        }
    }

    pub fn for_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Core => Self::core(),
            StrategyKind::Satellite => Self::satellite(),
        }
    }

    /// Copy of this profile with different entry/exit thresholds.
    pub fn with_thresholds(&self, buy_threshold: f64, sell_threshold: f64) -> Self {
        Self {
            buy_threshold,
            sell_threshold,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let w = self.weights.as_array();
        if w.iter().any(|x| !x.is_finite() || *x < 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "{} profile has a negative or non-finite factor weight",
                self.kind
            )));
        }
        let total = self.weights.total();
        if (total - 100.0).abs() > 1e-6 {
            return Err(AnalysisError::InvalidConfig(format!(
                "{} profile weights sum to {}, expected 100",
                self.kind, total
            )));
        }
        validate_thresholds(self.buy_threshold, self.sell_threshold)?;
        if let Some(rule) = &self.profit_take {
            if rule.extension_over_long_ma <= 0.0 {
                return Err(AnalysisError::InvalidConfig(
                    "profit-take extension must be positive".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Thresholds must lie in [0, 100] with `sell < buy`.
pub fn validate_thresholds(buy: f64, sell: f64) -> Result<()> {
    let in_range = |x: f64| x.is_finite() && (0.0..=100.0).contains(&x);
    if !in_range(buy) || !in_range(sell) {
        return Err(AnalysisError::InvalidConfig(format!(
            "thresholds must be within [0, 100] (buy {}, sell {})",
            buy, sell
        )));
    }
    if sell >= buy {
        return Err(AnalysisError::InvalidConfig(format!(
            "sell threshold {} must be below buy threshold {}",
            sell, buy
        )));
    }
    Ok(())
}
