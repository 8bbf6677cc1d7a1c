#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use analysis_core::AnalysisError;

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    fn compounding(n: usize, rate: f64) -> Vec<f64> {
        (0..n).map(|i| 100.0 * (1.0 + rate).powi(i as i32)).collect()
    }

    #[test]
    fn test_sma_backfills_warmup() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3).unwrap();

        assert_eq!(result.len(), data.len());
        assert!((result[0] - 2.0).abs() < 0.001); // back-filled with first full window
        assert!((result[1] - 2.0).abs() < 0.001);
        assert!((result[2] - 2.0).abs() < 0.001); // (1+2+3)/3 = 2
        assert!((result[3] - 3.0).abs() < 0.001);
        assert!((result[4] - 4.0).abs() < 0.001);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        let err = sma(&data, 5).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientData { required: 5, available: 2, .. }
        ));
        assert!(matches!(sma(&data, 0), Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_sma_no_forward_leakage() {
        // Changing a price after the first window must not move the warm-up values
        let mut data = sample_prices();
        let before = sma(&data, 5).unwrap();
        data[10] = 1000.0;
        let after = sma(&data, 5).unwrap();
        for i in 0..10 {
            assert_eq!(before[i], after[i]);
        }
    }

    #[test]
    fn test_rsi_fills_neutral_prefix() {
        let prices = sample_prices();
        let result = rsi(&prices, 14).unwrap();

        assert_eq!(result.len(), prices.len());
        for v in &result[..14] {
            assert_eq!(*v, 50.0);
        }
        for v in &result[14..] {
            assert!(*v >= 0.0 && *v <= 100.0);
        }
    }

    #[test]
    fn test_rsi_seed_value() {
        let prices = sample_prices();
        let result = rsi(&prices, 14).unwrap();

        let mut gain = 0.0;
        let mut loss = 0.0;
        for i in 1..=14 {
            let change = prices[i] - prices[i - 1];
            if change > 0.0 {
                gain += change;
            } else {
                loss -= change;
            }
        }
        let expected = 100.0 - 100.0 / (1.0 + gain / loss);
        assert!((result[14] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_flat_prices_are_neutral() {
        let prices = vec![25.0; 60];
        let result = rsi(&prices, 14).unwrap();
        assert!(result.iter().all(|v| (*v - 50.0).abs() < 1e-12));
    }

    #[test]
    fn test_rsi_rising_prices_saturate() {
        let prices = compounding(60, 0.01);
        let result = rsi(&prices, 14).unwrap();
        for v in &result[14..] {
            assert!(*v > 99.9, "RSI should saturate near 100, got {}", v);
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![1.0; 14];
        assert!(matches!(
            rsi(&prices, 14),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_rsi_percentile_rank() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 2.5, 10.0];
        let pct = rsi_percentile(&series, 3);

        // Bars 0..=3 lack a full lookback
        assert_eq!(&pct[..4], &[0.0, 0.0, 0.0, 0.0]);
        // bar 4: window [2,3,4], values below 2.5 -> 1 of 3
        assert!((pct[4] - 1.0 / 3.0).abs() < 1e-12);
        // bar 5: window [3,4,2.5] all below 10
        assert!((pct[5] - 1.0).abs() < 1e-12);

        assert!(!has_percentile_history(3, 3));
        assert!(has_percentile_history(4, 3));
    }

    #[test]
    fn test_rsi_percentile_strictly_less() {
        let series = vec![5.0; 10];
        let pct = rsi_percentile(&series, 4);
        assert!(pct.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_bollinger_bands_ordering() {
        let prices = sample_prices();
        let bb = bollinger_bands(&prices, 5, 2.0).unwrap();

        assert_eq!(bb.len(), prices.len());
        for i in 0..bb.len() {
            assert!(bb.upper[i] >= bb.middle[i]);
            assert!(bb.middle[i] >= bb.lower[i]);
        }
        // Warm-up copies the first complete band
        assert_eq!(bb.upper[0], bb.upper[4]);
        assert_eq!(bb.lower[2], bb.lower[4]);
    }

    #[test]
    fn test_bollinger_position_degenerate_band() {
        let prices = vec![10.0; 30];
        let bb = bollinger_bands(&prices, 20, 2.0).unwrap();
        assert_eq!(bb.position(25, 10.0), 0.5);
    }

    #[test]
    fn test_bollinger_position_range() {
        let prices = sample_prices();
        let bb = bollinger_bands(&prices, 5, 2.0).unwrap();
        let lower = bb.lower[10];
        let upper = bb.upper[10];
        assert!(bb.position(10, lower).abs() < 1e-9);
        assert!((bb.position(10, upper) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_momentum_zero_until_horizon() {
        let prices = compounding(10, 0.01);
        let mom = momentum(&prices, 3);
        assert_eq!(&mom[..4], &[0.0, 0.0, 0.0, 0.0]);
        let expected = 1.01_f64.powi(3) - 1.0;
        assert!((mom[4] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_log_returns() {
        let prices = vec![100.0, 110.0, 99.0];
        let r = log_returns(&prices);
        assert_eq!(r[0], 0.0);
        assert!((r[1] - (1.1_f64).ln()).abs() < 1e-12);
        assert!((r[2] - (0.9_f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_equity_curve_compounds_and_floors() {
        let curve = equity_curve(&[0.1, -0.5, -2.0, 0.3]);
        assert!((curve[0] - 1.1).abs() < 1e-12);
        assert!((curve[1] - 0.55).abs() < 1e-12);
        assert_eq!(curve[2], 0.0);
        assert_eq!(curve[3], 0.0);
    }

    #[test]
    fn test_max_drawdown() {
        let equity = vec![1.0, 1.2, 0.9, 1.1, 0.6, 1.5];
        let dd = max_drawdown(&equity);
        assert!((dd - 0.5).abs() < 1e-12); // 1.2 -> 0.6
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(max_drawdown(&[1.0, 1.1, 1.2]), 0.0);
    }

    #[test]
    fn test_max_drawdown_bounded() {
        // Arbitrary curves, including ruin, stay within [0, 1]
        let curves = vec![
            equity_curve(&[0.05, -0.9, -0.9, -0.9, 0.2]),
            equity_curve(&[-1.5, 0.1]),
            vec![3.0, 2.0, 1.0, 0.5, 0.25],
        ];
        for c in curves {
            let dd = max_drawdown(&c);
            assert!((0.0..=1.0).contains(&dd), "drawdown out of range: {}", dd);
        }
    }
}
