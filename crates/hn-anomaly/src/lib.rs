//! hn-anomaly: pressure anomaly detection for hydronet.
//!
//! Provides:
//! - Pressure sample, flag and event records
//! - A stateless critical threshold policy
//! - Statistical outlier scorers behind the `OutlierScorer` trait
//!   (rolling z-score, CUSUM drift, multivariate Mahalanobis distance)
//! - `AnomalyDetector` combining all policies into a `DetectionReport`
//! - An append-only, thread-safe `SampleStore`

pub mod alert;
pub mod config;
pub mod cusum;
pub mod detector;
pub mod error;
pub mod mahalanobis;
pub mod sample;
pub mod scorer;
pub mod store;
pub mod threshold;
pub mod zscore;

pub use alert::{AlertEvent, alerts_from};
pub use config::{CusumConfig, DetectorConfig, MahalanobisConfig, ZScoreConfig};
pub use cusum::CusumDrift;
pub use detector::{AnomalyDetector, DetectionReport};
pub use error::{AnomalyError, AnomalyResult};
pub use mahalanobis::MahalanobisWindow;
pub use sample::{AnomalyEvent, Policy, PressureFlag, PressureSample, Severity};
pub use scorer::{Outlier, OutlierScorer, PressureWindow};
pub use store::SampleStore;
pub use threshold::ThresholdPolicy;
pub use zscore::RollingZScore;
