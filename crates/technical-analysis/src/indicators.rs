use analysis_core::{AnalysisError, Result, EPSILON};
use serde::{Deserialize, Serialize};

/// Neutral RSI used wherever no average gain/loss exists yet.
pub const NEUTRAL_RSI: f64 = 50.0;

/// Bollinger position reported for a band of zero width.
pub const NEUTRAL_BAND_POSITION: f64 = 0.5;

fn require(context: &str, window: usize, available: usize) -> Result<()> {
    if window == 0 {
        return Err(AnalysisError::InvalidConfig(format!(
            "{} window must be greater than zero",
            context
        )));
    }
    if available < window {
        return Err(AnalysisError::insufficient(context, window, available));
    }
    Ok(())
}

/// Relative Strength Index with Wilder smoothing.
///
/// The output has the same length as `data`. Indices `0..period` carry the
/// neutral 50; index `period` uses the simple-mean seed of the first
/// `period` changes and later indices are Wilder-smoothed.
pub fn rsi(data: &[f64], period: usize) -> Result<Vec<f64>> {
    if period == 0 {
        return Err(AnalysisError::InvalidConfig("RSI period must be greater than zero".into()));
    }
    require("RSI", period + 1, data.len())?;

    let mut values = vec![NEUTRAL_RSI; data.len()];

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss += -change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    values[period] = rsi_from_averages(avg_gain, avg_loss);

    let p = period as f64;
    for i in period + 1..data.len() {
        let change = data[i] - data[i - 1];
        let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        values[i] = rsi_from_averages(avg_gain, avg_loss);
    }

    Ok(values)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain + avg_loss < EPSILON {
        return NEUTRAL_RSI;
    }
    let rs = avg_gain / avg_loss.max(EPSILON);
    100.0 - (100.0 / (1.0 + rs))
}

/// Rolling empirical-CDF rank of each RSI value against the preceding
/// `lookback` values (strictly-less count / lookback).
///
/// Bars with `i <= lookback` have no complete history and are left at 0.0;
/// use [`has_percentile_history`] to tell them apart from a genuine 0 rank.
pub fn rsi_percentile(rsi: &[f64], lookback: usize) -> Vec<f64> {
    let mut values = vec![0.0; rsi.len()];
    if lookback == 0 {
        return values;
    }
    for i in lookback + 1..rsi.len() {
        let current = rsi[i];
        let below = rsi[i - lookback..i].iter().filter(|&&v| v < current).count();
        values[i] = below as f64 / lookback as f64;
    }
    values
}

/// Whether bar `index` has a full percentile lookback behind it.
pub fn has_percentile_history(index: usize, lookback: usize) -> bool {
    lookback > 0 && index > lookback
}

/// Simple Moving Average, same length as `data`.
///
/// Bars before the first full window are back-filled with the first
/// computable average, so no later price leaks past its own window.
pub fn sma(data: &[f64], period: usize) -> Result<Vec<f64>> {
    require("SMA", period, data.len())?;

    let mut values = vec![0.0; data.len()];
    let mut sum: f64 = data[..period].iter().sum();
    values[period - 1] = sum / period as f64;
    for i in period..data.len() {
        sum += data[i] - data[i - period];
        values[i] = sum / period as f64;
    }

    let first = values[period - 1];
    for v in values.iter_mut().take(period - 1) {
        *v = first;
    }
    Ok(values)
}

/// Bollinger Bands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl BollingerBands {
    /// Where `price` sits inside the band at bar `i` (0 = lower, 1 = upper).
    /// A collapsed band reports the neutral midpoint.
    pub fn position(&self, i: usize, price: f64) -> f64 {
        let width = self.upper[i] - self.lower[i];
        if width < EPSILON {
            return NEUTRAL_BAND_POSITION;
        }
        (price - self.lower[i]) / width
    }

    pub fn len(&self) -> usize {
        self.middle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middle.is_empty()
    }
}

/// Moving average ± `num_std` population standard deviations, back-filled
/// like [`sma`].
pub fn bollinger_bands(data: &[f64], period: usize, num_std: f64) -> Result<BollingerBands> {
    let middle = sma(data, period)?;
    let mut upper = vec![0.0; data.len()];
    let mut lower = vec![0.0; data.len()];

    for i in period - 1..data.len() {
        let slice = &data[i + 1 - period..=i];
        let mean = middle[i];
        let variance: f64 = slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        let std = variance.sqrt();
        upper[i] = mean + num_std * std;
        lower[i] = mean - num_std * std;
    }

    let (first_upper, first_lower) = (upper[period - 1], lower[period - 1]);
    for i in 0..period - 1 {
        upper[i] = first_upper;
        lower[i] = first_lower;
    }

    Ok(BollingerBands {
        upper,
        middle,
        lower,
    })
}

/// Trailing rate of change over `horizon` bars; 0.0 until `i > horizon`.
pub fn momentum(data: &[f64], horizon: usize) -> Vec<f64> {
    let mut values = vec![0.0; data.len()];
    for i in horizon + 1..data.len() {
        let base = data[i - horizon];
        values[i] = (data[i] - base) / base.abs().max(EPSILON);
    }
    values
}

/// Per-bar log returns; the first bar has no prior close and returns 0.
pub fn log_returns(data: &[f64]) -> Vec<f64> {
    let mut values = vec![0.0; data.len()];
    for i in 1..data.len() {
        values[i] = (data[i] / data[i - 1].max(EPSILON)).ln();
    }
    values
}

/// Compound per-bar returns into an equity curve starting at 1.0.
///
/// Equity never goes below zero: once wiped out it stays at zero.
pub fn equity_curve(returns: &[f64]) -> Vec<f64> {
    let mut equity = 1.0_f64;
    returns
        .iter()
        .map(|r| {
            equity = (equity * (1.0 + r)).max(0.0);
            equity
        })
        .collect()
}

/// Largest peak-to-trough decline as a fraction in `[0, 1]`.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &value in equity {
        if value > peak {
            peak = value;
        }
        if peak > EPSILON {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd.clamp(0.0, 1.0)
}
