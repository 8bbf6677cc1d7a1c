use analysis_core::PriceSeries;

use crate::models::*;

const MAX_WARNINGS: usize = 100;

/// Analyze a price series for quality issues and corporate events.
pub fn check_price_series(series: &PriceSeries) -> DataQualityReport {
    let symbol = series.symbol();
    let bars = series.bars();
    let mut missing_dates = 0usize;
    let mut price_spike_count = 0usize;
    let mut warnings: Vec<DataWarning> = Vec::new();
    let mut corporate_events: Vec<CorporateEvent> = Vec::new();
    let mut market_events: Vec<MarketEvent> = Vec::new();

    for (i, bar) in bars.iter().enumerate() {
        let close = bar.close;

        // Price consistency when the full OHLC set is present
        if let (Some(open), Some(high), Some(low)) = (bar.open, bar.high, bar.low) {
            if high < low || high < open || high < close || low > open || low > close {
                warnings.push(DataWarning {
                    date: bar.date,
                    symbol: symbol.to_string(),
                    warning_type: "price_inconsistency".to_string(),
                    message: format!(
                        "OHLC inconsistent: O={:.2} H={:.2} L={:.2} C={:.2}",
                        open, high, low, close
                    ),
                });
            }
        }

        if i == 0 {
            continue;
        }
        let prev = &bars[i - 1];

        // Price spike detection (>20% daily move)
        let pct_change = ((close - prev.close) / prev.close).abs();
        if pct_change > 0.20 {
            price_spike_count += 1;
            // Likely stock split if close ~ prev_close/2 or *2
            let ratio = close / prev.close;
            if (ratio - 0.5).abs() < 0.05 || (ratio - 2.0).abs() < 0.1 {
                corporate_events.push(CorporateEvent {
                    date: bar.date,
                    symbol: symbol.to_string(),
                    event_type: "possible_split".to_string(),
                    magnitude: ratio,
                });
            } else if pct_change > 0.50 {
                market_events.push(MarketEvent {
                    date: bar.date,
                    event_type: "extreme_move".to_string(),
                    magnitude: pct_change * 100.0,
                });
            }
            warnings.push(DataWarning {
                date: bar.date,
                symbol: symbol.to_string(),
                warning_type: "price_spike".to_string(),
                message: format!("{:.1}% move from {:.2} to {:.2}", pct_change * 100.0, prev.close, close),
            });
        }

        // More than 4 calendar days = potential missing trading day
        // (normal weekends are 3 days: Fri->Mon)
        let gap = (bar.date - prev.date).num_days();
        if gap > 4 {
            missing_dates += (gap - 3) as usize; // rough estimate
            warnings.push(DataWarning {
                date: bar.date,
                symbol: symbol.to_string(),
                warning_type: "date_gap".to_string(),
                message: format!("{}-day gap between {} and {}", gap, prev.date, bar.date),
            });
        }
    }

    warnings.truncate(MAX_WARNINGS);

    DataQualityReport {
        total_bars: bars.len(),
        missing_dates,
        price_spike_count,
        warnings,
        corporate_events,
        market_events,
    }
}
