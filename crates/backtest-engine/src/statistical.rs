use statrs::distribution::{ContinuousCDF, Normal};

use crate::models::{SignificanceLabel, SignificanceLevels};

/// Compute p-value for the null hypothesis that Sharpe ratio = 0.
///
/// `sharpe` is the per-period (not annualized) ratio over `num_returns`
/// observations. Uses the asymptotic approximation
/// SE(Sharpe) ≈ sqrt((1 + 0.5 * SR²) / n).
pub fn sharpe_p_value(sharpe: f64, num_returns: usize) -> f64 {
    if num_returns < 3 || !sharpe.is_finite() {
        return 1.0;
    }
    let n = num_returns as f64;
    let se = ((1.0 + 0.5 * sharpe * sharpe) / n).sqrt();
    let z = sharpe / se;

    // Two-tailed
    (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0)
}

/// One-sided empirical p-value: fraction of the null distribution at or
/// above the observed statistic.
pub fn exceedance_p_value(actual: f64, null_distribution: &[f64]) -> f64 {
    if null_distribution.is_empty() {
        return 1.0;
    }
    let at_or_above = null_distribution.iter().filter(|&&x| x >= actual).count();
    at_or_above as f64 / null_distribution.len() as f64
}

/// Reporting label for a p-value. A convention, not a guarantee.
pub fn classify_significance(p_value: f64, levels: &SignificanceLevels) -> SignificanceLabel {
    if p_value < levels.highly {
        SignificanceLabel::HighlySignificant
    } else if p_value < levels.significant {
        SignificanceLabel::Significant
    } else if p_value < levels.marginal {
        SignificanceLabel::Marginal
    } else {
        SignificanceLabel::NotSignificant
    }
}

/// Standard normal CDF.
pub(crate) fn normal_cdf(x: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(x),
        Err(_) => 0.5,
    }
}
