//! Integration tests for anomaly detection.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hn_anomaly::{
    AnomalyDetector, CusumConfig, DetectorConfig, PressureFlag, PressureSample, SampleStore,
    Severity, alerts_from,
};
use proptest::prelude::*;

fn t(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::minutes(15 * i as i64)
}

fn series(node: &str, values: &[f64]) -> Vec<PressureSample> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| PressureSample::new(node, t(i), *v))
        .collect()
}

#[test]
fn one_low_sample_flags_exactly_that_sample() {
    let mut values = vec![40.0; 48];
    values[17] = 10.0;
    let history = series("J1", &values);
    let detector = AnomalyDetector::new(&DetectorConfig {
        critical_low_m: 25.0,
        ..DetectorConfig::default()
    })
    .unwrap();

    let report = detector.score(&history).unwrap();

    assert_eq!(report.events.len(), 1);
    let event = &report.events[0];
    assert_eq!(event.timestamp, t(17));
    assert_eq!(event.flag, PressureFlag::Low);
    assert_eq!(event.observed_m, 10.0);
    assert_eq!(report.flag("J1"), PressureFlag::Low);

    let annotated = report.annotate(&history);
    for (i, s) in annotated.iter().enumerate() {
        let expected = if i == 17 { PressureFlag::Low } else { PressureFlag::Normal };
        assert_eq!(s.flag, expected, "sample {i}");
    }
}

#[test]
fn slow_leak_found_by_cusum_only() {
    let mut values: Vec<f64> = (0..24).map(|i| 42.0 + 0.3 * ((i % 3) as f64 - 1.0)).collect();
    values.extend((0..24).map(|i| 42.0 - 0.15 * (i + 1) as f64));
    let history = series("J2", &values);

    let cfg = DetectorConfig {
        critical_low_m: 20.0,
        zscore: None,
        cusum: Some(CusumConfig::default()),
        ..DetectorConfig::default()
    };
    let report = AnomalyDetector::new(&cfg).unwrap().score(&history).unwrap();
    assert!(!report.is_clean());
    assert_eq!(report.flag("J2"), PressureFlag::Anomalous);
    assert!(report.events.iter().all(|e| e.timestamp > t(23)));
}

#[test]
fn clean_nodes_are_reported_normal() {
    let mut history = series("A", &[35.0; 10]);
    history.extend(series("B", &[5.0; 10]));
    let detector = AnomalyDetector::new(&DetectorConfig::threshold_only(20.0, 80.0)).unwrap();
    let report = detector.score(&history).unwrap();
    assert_eq!(report.flag("A"), PressureFlag::Normal);
    assert_eq!(report.flag("B"), PressureFlag::Low);
    assert_eq!(report.flags.len(), 2);

    let alerts = alerts_from(&report, Severity::Critical);
    assert_eq!(alerts.len(), 10);
    assert!(alerts.iter().all(|a| a.node == "B"));
}

#[test]
fn store_feeds_detector() {
    let store = SampleStore::new();
    store.extend(series("J", &[30.0, 31.0, 12.0, 30.5])).unwrap();
    let detector = AnomalyDetector::new(&DetectorConfig::threshold_only(15.0, 80.0)).unwrap();
    let report = detector.score(&store.snapshot().unwrap()).unwrap();
    assert_eq!(report.events.len(), 1);
}

proptest! {
    #[test]
    fn threshold_flags_exactly_the_out_of_range_samples(
        values in prop::collection::vec(0.0f64..120.0, 1..60)
    ) {
        let history = series("J", &values);
        let detector = AnomalyDetector::new(&DetectorConfig::threshold_only(25.0, 90.0)).unwrap();
        let report = detector.score(&history).unwrap();
        let expected = values.iter().filter(|v| **v < 25.0 || **v > 90.0).count();
        prop_assert_eq!(report.events.len(), expected);
        for e in &report.events {
            prop_assert!(e.observed_m < 25.0 || e.observed_m > 90.0);
        }
    }
}
