use std::ops::Range;

use analysis_core::{AnalysisError, PriceSeries, Result};
use serde::{Deserialize, Serialize};
use technical_analysis::{
    bollinger_bands, has_percentile_history, log_returns, momentum, rsi, rsi_percentile, sma,
    BollingerBands,
};

/// Indicator windows shared by every profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub percentile_lookback: usize,
    pub short_ma: usize,
    pub long_ma: usize,
    pub bollinger_window: usize,
    pub bollinger_std: f64,
    pub momentum_horizon: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            percentile_lookback: 252,
            short_ma: 50,
            long_ma: 200,
            bollinger_window: 20,
            bollinger_std: 2.0,
            momentum_horizon: 126,
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<()> {
        if self.short_ma >= self.long_ma {
            return Err(AnalysisError::InvalidConfig(format!(
                "short moving average ({}) must be shorter than the long one ({})",
                self.short_ma, self.long_ma
            )));
        }
        if !self.bollinger_std.is_finite() || self.bollinger_std <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "bollinger_std must be positive, got {}",
                self.bollinger_std
            )));
        }
        if self.percentile_lookback == 0 || self.momentum_horizon == 0 {
            return Err(AnalysisError::InvalidConfig(
                "percentile lookback and momentum horizon must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Bars needed before every indicator can be computed.
    pub fn min_bars(&self) -> usize {
        self.long_ma
            .max(self.short_ma)
            .max(self.bollinger_window)
            .max(self.rsi_period + 1)
    }
}

/// Every per-bar indicator a scoring model reads, aligned to the series.
///
/// Built once from the full history and sliced for sub-windows, so a window
/// starting mid-series still sees warmed-up values computed only from data up
/// to each bar.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSet {
    pub closes: Vec<f64>,
    pub log_returns: Vec<f64>,
    pub rsi: Vec<f64>,
    pub rsi_percentile: Vec<f64>,
    /// False where the percentile has no full lookback behind it.
    pub percentile_ready: Vec<bool>,
    pub short_ma: Vec<f64>,
    pub long_ma: Vec<f64>,
    pub bollinger: BollingerBands,
    pub momentum: Vec<f64>,
}

impl IndicatorSet {
    pub fn compute(series: &PriceSeries, params: &IndicatorParams) -> Result<Self> {
        params.validate()?;
        let closes = series.closes();
        if closes.len() < params.min_bars() {
            return Err(AnalysisError::insufficient(
                format!("indicators for {}", series.symbol()),
                params.min_bars(),
                closes.len(),
            ));
        }

        let rsi_values = rsi(&closes, params.rsi_period)?;
        let percentile = rsi_percentile(&rsi_values, params.percentile_lookback);
        let percentile_ready = (0..closes.len())
            .map(|i| has_percentile_history(i, params.percentile_lookback))
            .collect();

        Ok(Self {
            log_returns: log_returns(&closes),
            rsi_percentile: percentile,
            percentile_ready,
            short_ma: sma(&closes, params.short_ma)?,
            long_ma: sma(&closes, params.long_ma)?,
            bollinger: bollinger_bands(&closes, params.bollinger_window, params.bollinger_std)?,
            momentum: momentum(&closes, params.momentum_horizon),
            rsi: rsi_values,
            closes,
        })
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Every per-bar vector must match `closes`; hand-built sets are
    /// checked before any bar is indexed.
    pub fn check_lengths(&self) -> Result<()> {
        let n = self.closes.len();
        let columns = [
            ("log_returns", self.log_returns.len()),
            ("rsi", self.rsi.len()),
            ("rsi_percentile", self.rsi_percentile.len()),
            ("percentile_ready", self.percentile_ready.len()),
            ("short_ma", self.short_ma.len()),
            ("long_ma", self.long_ma.len()),
            ("bollinger.upper", self.bollinger.upper.len()),
            ("bollinger.middle", self.bollinger.middle.len()),
            ("bollinger.lower", self.bollinger.lower.len()),
            ("momentum", self.momentum.len()),
        ];
        match columns.iter().find(|(_, len)| *len != n) {
            Some((name, len)) => Err(AnalysisError::InvalidData(format!(
                "indicator column {} has {} bars, closes have {}",
                name, len, n
            ))),
            None => Ok(()),
        }
    }

    /// Copy of bars `range`. The first log return of a slice still refers to
    /// the bar before it, which is the return actually earned on that bar.
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        self.check_lengths()?;
        if range.start >= range.end || range.end > self.len() {
            return Err(AnalysisError::insufficient(
                format!("indicator slice {}..{}", range.start, range.end),
                range.end,
                self.len(),
            ));
        }
        let r = range;
        Ok(Self {
            closes: self.closes[r.clone()].to_vec(),
            log_returns: self.log_returns[r.clone()].to_vec(),
            rsi: self.rsi[r.clone()].to_vec(),
            rsi_percentile: self.rsi_percentile[r.clone()].to_vec(),
            percentile_ready: self.percentile_ready[r.clone()].to_vec(),
            short_ma: self.short_ma[r.clone()].to_vec(),
            long_ma: self.long_ma[r.clone()].to_vec(),
            bollinger: BollingerBands {
                upper: self.bollinger.upper[r.clone()].to_vec(),
                middle: self.bollinger.middle[r.clone()].to_vec(),
                lower: self.bollinger.lower[r.clone()].to_vec(),
            },
            momentum: self.momentum[r].to_vec(),
        })
    }

    // Boolean flags shared by the scoring models

    pub fn regime_bullish(&self, i: usize) -> bool {
        self.closes[i] > self.long_ma[i] && self.rsi[i] > 50.0
    }

    pub fn ma_cross(&self, i: usize) -> bool {
        self.short_ma[i] > self.long_ma[i]
    }

    pub fn above_long_ma(&self, i: usize) -> bool {
        self.closes[i] > self.long_ma[i]
    }

    pub fn momentum_positive(&self, i: usize) -> bool {
        self.momentum[i] > 0.0
    }

    pub fn band_position(&self, i: usize) -> f64 {
        self.bollinger.position(i, self.closes[i])
    }
}
