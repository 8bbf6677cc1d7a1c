use analysis_core::Position::{Flat as F, Invested as I};
use analysis_core::{AnalysisError, PriceSeries};
use chrono::NaiveDate;

use crate::*;

// ============================================================
// Helpers
// ============================================================

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn series(closes: &[f64]) -> PriceSeries {
    PriceSeries::from_closes("TEST", start(), closes).unwrap()
}

fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 * 1.01_f64.powi(i as i32)).collect()
}

fn indicators(closes: &[f64]) -> IndicatorSet {
    IndicatorSet::compute(&series(closes), &IndicatorParams::default()).unwrap()
}

// ============================================================
// Profile validation
// ============================================================

#[test]
fn test_default_profiles_are_valid() {
    assert!(StrategyProfile::core().validate().is_ok());
    assert!(StrategyProfile::satellite().validate().is_ok());
    assert!((FactorWeights::core().total() - 100.0).abs() < 1e-9);
    assert!((FactorWeights::satellite().total() - 100.0).abs() < 1e-9);
}

#[test]
fn test_profile_rejects_bad_weights() {
    let mut profile = StrategyProfile::core();
    profile.weights.value = 30.0;
    assert!(matches!(profile.validate(), Err(AnalysisError::InvalidConfig(_))));

    let mut profile = StrategyProfile::core();
    profile.weights.cost = -5.0;
    profile.weights.value = 55.0;
    assert!(matches!(profile.validate(), Err(AnalysisError::InvalidConfig(_))));
}

#[test]
fn test_profile_rejects_bad_thresholds() {
    let core = StrategyProfile::core();
    assert!(core.with_thresholds(45.0, 45.0).validate().is_err());
    assert!(core.with_thresholds(40.0, 50.0).validate().is_err());
    assert!(core.with_thresholds(101.0, 50.0).validate().is_err());
    assert!(core.with_thresholds(70.0, -1.0).validate().is_err());
    assert!(core.with_thresholds(70.0, 30.0).validate().is_ok());
    assert!(SignalEngine::new(core.with_thresholds(50.0, 60.0)).is_err());
}

#[test]
fn test_strategy_kind_parse() {
    assert_eq!("core".parse::<StrategyKind>().unwrap(), StrategyKind::Core);
    assert_eq!(" Satellite ".parse::<StrategyKind>().unwrap(), StrategyKind::Satellite);
    assert!("growth".parse::<StrategyKind>().is_err());
}

// ============================================================
// Indicator set
// ============================================================

#[test]
fn test_indicator_set_insufficient_history() {
    let err = IndicatorSet::compute(&series(&rising(150)), &IndicatorParams::default()).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::InsufficientData { required: 200, available: 150, .. }
    ));
}

#[test]
fn test_indicator_set_slice_keeps_warmup() {
    let ind = indicators(&rising(300));
    let sub = ind.slice(260..290).unwrap();
    assert_eq!(sub.len(), 30);
    assert_eq!(sub.long_ma[0], ind.long_ma[260]);
    assert_eq!(sub.rsi_percentile[5], ind.rsi_percentile[265]);
    assert!(sub.percentile_ready.iter().all(|r| *r));
    assert!(ind.slice(290..301).is_err());
    assert!(ind.slice(10..10).is_err());
}

// ============================================================
// Hysteresis
// ============================================================

#[test]
fn test_hysteresis_transitions() {
    let machine = HysteresisMachine::new(60.0, 45.0).unwrap();
    let scores = [50.0, 61.0, 50.0, 46.0, 44.0, 50.0, 60.0];
    let states = machine.run(&scores, |_| false);
    assert_eq!(states, vec![F, I, I, I, F, F, I]);
}

#[test]
fn test_hysteresis_no_transition_between_thresholds() {
    let machine = HysteresisMachine::new(60.0, 45.0).unwrap();
    let between = [45.0, 52.0, 59.99, 47.5, 55.0];

    // Flat stays flat
    assert!(machine.run(&between, |_| false).iter().all(|p| *p == F));

    // Invested stays invested
    let mut scores = vec![75.0];
    scores.extend_from_slice(&between);
    assert!(machine.run(&scores, |_| false).iter().all(|p| *p == I));
}

#[test]
fn test_hysteresis_override_forces_exit_and_blocks_entry() {
    let machine = HysteresisMachine::new(60.0, 45.0).unwrap();
    let scores = [70.0, 70.0, 70.0, 70.0];
    let states = machine.run(&scores, |i| i == 1 || i == 2);
    assert_eq!(states, vec![I, F, F, I]);
}

#[test]
fn test_lag_positions() {
    let raw = vec![I, I, F, I];
    assert_eq!(lag_positions(&raw), vec![F, I, I, F]);
    assert!(lag_positions(&[]).is_empty());
    assert_eq!(count_entries(&[F, I, I, F, I, F]), 2);
}

#[test]
fn test_positions_only_depend_on_past_scores() {
    let ind = indicators(&rising(300));
    let engine = SignalEngine::new(StrategyProfile::core()).unwrap();
    let base = engine.positions(&ind);

    // Changing the close on bar k (and everything computed from it) must not
    // move any position at or before k.
    let k = 200;
    let mut closes = rising(300);
    for c in closes.iter_mut().skip(k) {
        *c *= 0.5;
    }
    let shocked = engine.positions(&indicators(&closes));
    assert_eq!(base[..=k], shocked[..=k]);
    assert_eq!(base[0], F);
}

// ============================================================
// End-to-end scoring scenarios
// ============================================================

#[test]
fn test_monotonic_series_core() {
    let ind = indicators(&rising(300));

    for v in &ind.rsi[14..] {
        assert!(*v > 99.9);
    }
    for i in 253..300 {
        assert!(ind.percentile_ready[i]);
        assert!(ind.rsi_percentile[i] > 0.95, "percentile at {} = {}", i, ind.rsi_percentile[i]);
    }
    assert!(!ind.momentum_positive(126));
    assert!(ind.momentum_positive(127));

    let engine = SignalEngine::new(StrategyProfile::core()).unwrap();
    let out = engine.evaluate(&ind);
    assert!((out.scores[127] - 67.25).abs() < 1e-9);
    assert!(out.scores[..127].iter().all(|s| *s < 60.0));

    let first = out.positions.iter().position(|p| p.is_invested()).unwrap();
    assert_eq!(first, 128);
    assert!(out.positions[first..].iter().all(|p| p.is_invested()));
    assert_eq!(count_entries(&out.positions), 1);
}

#[test]
fn test_flat_series_stays_flat() {
    let ind = indicators(&[100.0; 300]);
    assert!(ind.rsi.iter().all(|v| (*v - 50.0).abs() < 1e-12));

    for profile in [StrategyProfile::core(), StrategyProfile::satellite()] {
        let out = SignalEngine::new(profile).unwrap().evaluate(&ind);
        assert!(out.scores.iter().all(|s| *s <= 55.0));
        assert!(out.positions.iter().all(|p| *p == F));
    }
}

#[test]
fn test_flat_series_core_factor_shares() {
    let ind = indicators(&[100.0; 300]);
    let profile = StrategyProfile::core();

    // Before the percentile lookback: neutral tier plus mid-band share
    let early = factor_shares(&profile, &ind, 100);
    assert!((early.value - 0.50).abs() < 1e-12);
    assert!((early.composite(&profile) - 41.5).abs() < 1e-9);

    // After it: every RSI ties, so nothing is strictly below -> cheapest tier
    let late = factor_shares(&profile, &ind, 280);
    assert!((late.value - 0.85).abs() < 1e-12);
    assert!((late.composite(&profile) - 53.75).abs() < 1e-9);
}

#[test]
fn test_satellite_never_holds_through_profit_take() {
    let ind = indicators(&rising(300));
    let profile = StrategyProfile::satellite();
    let rule = profile.profit_take.unwrap();
    let positions = SignalEngine::new(profile).unwrap().positions(&ind);

    for i in 1..positions.len() {
        if rule.fires(ind.rsi[i - 1], ind.closes[i - 1], ind.long_ma[i - 1]) {
            assert_eq!(positions[i], F, "invested at {} despite profit-take", i);
        }
    }
}

#[test]
fn test_satellite_technical_penalty() {
    let ind = indicators(&rising(300));
    let shares = factor_shares(&StrategyProfile::satellite(), &ind, 150);
    // Overbought and no dip: technical share is fully penalised
    assert_eq!(shares.technical, 0.0);
    assert_eq!(shares.value, 0.5);
    assert_eq!(shares.sentiment, 0.5);
}

#[test]
fn test_factor_shares_stay_in_unit_range() {
    let closes: Vec<f64> = (0..400)
        .map(|i| 100.0 + 15.0 * (i as f64 / 9.0).sin() + 0.05 * i as f64)
        .collect();
    let ind = indicators(&closes);
    for profile in [StrategyProfile::core(), StrategyProfile::satellite()] {
        for i in 0..ind.len() {
            let s = factor_shares(&profile, &ind, i);
            for share in [s.trend, s.quality, s.value, s.technical, s.cost, s.sentiment] {
                assert!((0.0..=1.0).contains(&share), "{} share {} at bar {}", profile.kind, share, i);
            }
            assert!((0.0..=100.0).contains(&s.composite(&profile)));
        }
    }
}

#[test]
fn test_indicator_set_length_check() {
    let mut ind = indicators(&rising(300));
    assert!(ind.check_lengths().is_ok());
    assert!(ind.slice(10..200).unwrap().check_lengths().is_ok());

    ind.rsi.truncate(250);
    assert!(matches!(ind.check_lengths(), Err(AnalysisError::InvalidData(_))));

    let mut ind = indicators(&rising(300));
    ind.bollinger.lower.pop();
    assert!(ind.check_lengths().is_err());
}

// ============================================================
// Coarse model
// ============================================================

#[test]
fn test_coarse_model_scores() {
    let ind = indicators(&rising(300));
    let params = CoarseParams {
        rsi_oversold: 30.0,
        buy_threshold: 60.0,
        sell_threshold: 40.0,
    };
    let scores = params.scores(&ind);
    assert_eq!(scores[100], 0.0);
    assert_eq!(scores[120], 40.0);
    assert_eq!(scores[127], 70.0);

    let positions = params.positions(&ind).unwrap();
    assert_eq!(positions[127], F);
    assert_eq!(positions[128], I);
}

#[test]
fn test_coarse_model_rejects_inverted_thresholds() {
    let params = CoarseParams {
        rsi_oversold: 30.0,
        buy_threshold: 40.0,
        sell_threshold: 60.0,
    };
    assert!(params.validate().is_err());
    let ind = indicators(&rising(250));
    assert!(params.positions(&ind).is_err());
}
