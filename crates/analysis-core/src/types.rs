use std::ops::Range;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Daily bar. Only `close` is consumed by the scoring and backtest core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl PriceBar {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            open: None,
            high: None,
            low: None,
            volume: None,
        }
    }
}

/// Ordered, validated close-price history for one symbol.
///
/// The bar index is the trading-day clock: no calendar gaps are inferred
/// from the dates. Once built the series is never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, rejecting empty input, non-increasing dates and
    /// non-positive or non-finite closes.
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(AnalysisError::InvalidData(format!(
                "price series for {} is empty",
                symbol
            )));
        }

        for (i, bar) in bars.iter().enumerate() {
            if !bar.close.is_finite() || bar.close <= 0.0 {
                return Err(AnalysisError::InvalidData(format!(
                    "{}: close on {} must be a positive finite number, got {}",
                    symbol, bar.date, bar.close
                )));
            }
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(AnalysisError::InvalidData(format!(
                    "{}: dates must be strictly increasing ({} follows {})",
                    symbol,
                    bar.date,
                    bars[i - 1].date
                )));
            }
        }

        Ok(Self { symbol, bars })
    }

    /// Convenience constructor for close-only data on consecutive calendar days.
    pub fn from_closes(symbol: impl Into<String>, start: NaiveDate, closes: &[f64]) -> Result<Self> {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar::new(start + chrono::Duration::days(i as i64), close))
            .collect();
        Self::new(symbol, bars)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    /// Owned sub-series over `range` (bar indices).
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.start >= range.end || range.end > self.bars.len() {
            return Err(AnalysisError::insufficient(
                format!("{} slice {}..{}", self.symbol, range.start, range.end),
                range.end,
                self.bars.len(),
            ));
        }
        Ok(Self {
            symbol: self.symbol.clone(),
            bars: self.bars[range].to_vec(),
        })
    }
}

/// Exposure state for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[default]
    Flat,
    Invested,
}

impl Position {
    pub fn is_invested(self) -> bool {
        matches!(self, Position::Invested)
    }

    /// 1.0 when invested, 0.0 when flat.
    pub fn exposure(self) -> f64 {
        if self.is_invested() {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let bars = vec![PriceBar::new(day(2), 10.0), PriceBar::new(day(2), 11.0)];
        let err = PriceSeries::new("AAPL", bars).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidData(_)));
    }

    #[test]
    fn test_series_rejects_non_positive_close() {
        let bars = vec![PriceBar::new(day(2), 10.0), PriceBar::new(day(3), 0.0)];
        assert!(PriceSeries::new("AAPL", bars).is_err());
    }

    #[test]
    fn test_series_rejects_empty() {
        assert!(PriceSeries::new("AAPL", vec![]).is_err());
    }

    #[test]
    fn test_slice_keeps_dates() {
        let series = PriceSeries::from_closes("SPY", day(1), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let sub = series.slice(1..3).unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.first_date(), day(2));
        assert_eq!(sub.closes(), vec![2.0, 3.0]);
        assert!(series.slice(2..9).is_err());
    }

    #[test]
    fn test_position_exposure() {
        assert_eq!(Position::default(), Position::Flat);
        assert_eq!(Position::Invested.exposure(), 1.0);
        assert_eq!(Position::Flat.exposure(), 0.0);
    }
}
