use chrono::NaiveDate;
use tracing::debug;

use crate::models::*;

fn period(name: &str, start: (i32, u32, u32), end: (i32, u32, u32)) -> Option<StressPeriod> {
    Some(StressPeriod {
        name: name.to_string(),
        start: NaiveDate::from_ymd_opt(start.0, start.1, start.2)?,
        end: NaiveDate::from_ymd_opt(end.0, end.1, end.2)?,
    })
}

/// Historical drawdown windows replayed against every backtest.
pub fn default_stress_periods() -> Vec<StressPeriod> {
    [
        period("2015_Flash_Crash", (2015, 8, 15), (2015, 9, 15)),
        period("2018_Trade_War", (2018, 9, 20), (2018, 12, 30)),
        period("2020_COVID_Crash", (2020, 2, 15), (2020, 3, 30)),
        period("2022_Bear_Market", (2022, 1, 1), (2022, 10, 15)),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Strategy and benchmark behaviour inside each period (inclusive dates).
///
/// Equity is rebased to the first bar of the period. Periods with no bars
/// in the backtest are left out.
pub fn stress_test(result: &BacktestResult, periods: &[StressPeriod]) -> StressReport {
    let mut out = Vec::new();

    for p in periods {
        let idx: Vec<usize> = result
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| **d >= p.start && **d <= p.end)
            .map(|(i, _)| i)
            .collect();
        let (Some(&first), Some(&last)) = (idx.first(), idx.last()) else {
            debug!("Stress period {} not covered by {}", p.name, result.symbol);
            continue;
        };

        let strategy = &result.strategy_equity[first..=last];
        let benchmark = &result.benchmark_equity[first..=last];

        out.push(StressPeriodResult {
            name: p.name.clone(),
            start: result.dates[first],
            end: result.dates[last],
            bars: last - first + 1,
            strategy_return: window_return(strategy),
            worst_decline: worst_decline(strategy),
            benchmark_return: window_return(benchmark),
        });
    }

    StressReport {
        symbol: result.symbol.clone(),
        periods: out,
    }
}

fn window_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&start), Some(&end)) if start > 0.0 => end / start - 1.0,
        _ => 0.0,
    }
}

fn worst_decline(equity: &[f64]) -> f64 {
    let Some(&start) = equity.first() else {
        return 0.0;
    };
    if start <= 0.0 {
        return 0.0;
    }
    let min = equity.iter().copied().fold(f64::INFINITY, f64::min);
    (min / start - 1.0).min(0.0)
}
