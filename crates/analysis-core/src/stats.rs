//! Small descriptive-statistics helpers shared by the indicator, backtest and
//! simulation crates. All of them are total: empty input yields 0.0 instead
//! of NaN.
use crate::EPSILON;

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Compute sample standard deviation (Bessel's correction).
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Annualized Sharpe ratio at a zero risk-free rate.
///
/// The standard deviation is floored at `EPSILON`, so a series with no
/// variance (e.g. never invested) yields 0.0 or a very large magnitude rather
/// than NaN; callers flag those cases as low confidence.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let m = mean(returns);
    let sd = std_dev(returns).max(EPSILON);
    (m / sd) * periods_per_year.sqrt()
}

/// Sort a vector of floats ascending, treating incomparable values as equal.
pub fn sort_floats(data: &mut [f64]) {
    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

/// Nearest-rank percentile (0-100 scale) of an already sorted slice.
pub fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Fraction of `data` at or below `value` (0.0 to 1.0).
pub fn percentile_rank(value: f64, data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.5;
    }
    let at_or_below = data.iter().filter(|&&x| x <= value).count();
    at_or_below as f64 / data.len() as f64
}

/// Down-sample a sorted distribution to at most `max_pts` evenly spaced points.
pub fn sample_distribution(sorted: &[f64], max_pts: usize) -> Vec<f64> {
    if sorted.len() <= max_pts {
        return sorted.to_vec();
    }
    let step = sorted.len() as f64 / max_pts as f64;
    (0..max_pts)
        .map(|i| sorted[(i as f64 * step) as usize])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&data) - 5.0).abs() < 1e-12);
        // Sample std of the classic example is sqrt(32/7)
        assert!((std_dev(&data) - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[1.0]), 0.0);
    }

    #[test]
    fn test_sharpe_zero_variance_is_finite() {
        let flat = vec![0.0; 50];
        let s = sharpe_ratio(&flat, 252.0);
        assert!(s.is_finite());
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_percentile_rank() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((percentile_rank(3.0, &data) - 0.6).abs() < 1e-12);
        assert_eq!(percentile_rank(0.0, &data), 0.0);
        assert_eq!(percentile_rank(9.0, &data), 1.0);
    }

    #[test]
    fn test_percentile_sorted() {
        let sorted: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        assert_eq!(percentile_sorted(&sorted, 95.0), 95.0);
        assert_eq!(percentile_sorted(&sorted, 5.0), 5.0);
        assert_eq!(percentile_sorted(&[], 50.0), 0.0);
    }

    #[test]
    fn test_sample_distribution_caps_points() {
        let sorted: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let sampled = sample_distribution(&sorted, 200);
        assert_eq!(sampled.len(), 200);
        assert_eq!(sampled[0], 0.0);
    }
}
