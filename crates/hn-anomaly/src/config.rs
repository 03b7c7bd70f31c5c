//! Detector configuration.
//!
//! Critical limits and scorer parameters are engineering inputs; the
//! defaults here are only starting points for a scenario file.

use serde::{Deserialize, Serialize};

use crate::error::{AnomalyError, AnomalyResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Pressure below which a sample is critically low (m)
    pub critical_low_m: f64,
    /// Pressure above which a sample is critically high (m)
    pub critical_high_m: f64,
    pub zscore: Option<ZScoreConfig>,
    pub cusum: Option<CusumConfig>,
    pub mahalanobis: Option<MahalanobisConfig>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            critical_low_m: 10.0,
            critical_high_m: 100.0,
            zscore: Some(ZScoreConfig::default()),
            cusum: None,
            mahalanobis: None,
        }
    }
}

impl DetectorConfig {
    /// Threshold policy only.
    pub fn threshold_only(critical_low_m: f64, critical_high_m: f64) -> Self {
        Self {
            critical_low_m,
            critical_high_m,
            zscore: None,
            cusum: None,
            mahalanobis: None,
        }
    }

    pub fn validate(&self) -> AnomalyResult<()> {
        if !self.critical_low_m.is_finite()
            || !self.critical_high_m.is_finite()
            || self.critical_low_m >= self.critical_high_m
        {
            return Err(AnomalyError::InvalidConfig {
                what: format!(
                    "critical limits must satisfy low < high, got {} / {}",
                    self.critical_low_m, self.critical_high_m
                ),
            });
        }
        if let Some(z) = &self.zscore {
            z.validate()?;
        }
        if let Some(c) = &self.cusum {
            c.validate()?;
        }
        if let Some(m) = &self.mahalanobis {
            m.validate()?;
        }
        Ok(())
    }
}

fn positive(what: &str, v: f64) -> AnomalyResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(AnomalyError::InvalidConfig {
            what: format!("{what} must be positive, got {v}"),
        })
    }
}

fn at_least(what: &str, v: usize, min: usize) -> AnomalyResult<()> {
    if v >= min {
        Ok(())
    } else {
        Err(AnomalyError::InvalidConfig {
            what: format!("{what} must be at least {min}, got {v}"),
        })
    }
}

/// Rolling z-score against a trailing per-node baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZScoreConfig {
    /// Trailing samples forming the baseline
    pub window: usize,
    /// |z| at which a sample is a warning
    pub warning_sigma: f64,
    /// |z| at which a sample is critical
    pub critical_sigma: f64,
    /// Consecutive exceedances before anything is flagged
    pub min_consecutive: usize,
    /// Floor on the baseline standard deviation (m)
    pub min_std_m: f64,
}

impl Default for ZScoreConfig {
    fn default() -> Self {
        Self {
            window: 24,
            warning_sigma: 3.0,
            critical_sigma: 5.0,
            min_consecutive: 3,
            min_std_m: 0.05,
        }
    }
}

impl ZScoreConfig {
    pub fn validate(&self) -> AnomalyResult<()> {
        at_least("zscore.window", self.window, 2)?;
        at_least("zscore.min_consecutive", self.min_consecutive, 1)?;
        positive("zscore.warning_sigma", self.warning_sigma)?;
        positive("zscore.min_std_m", self.min_std_m)?;
        if self.critical_sigma < self.warning_sigma {
            return Err(AnomalyError::InvalidConfig {
                what: "zscore.critical_sigma below warning_sigma".into(),
            });
        }
        Ok(())
    }
}

/// Two-sided CUSUM on the series standardized by its leading samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CusumConfig {
    /// Leading samples used to estimate the in-control mean and spread
    pub baseline: usize,
    /// Slack per sample, in standard deviations
    pub slack: f64,
    /// Decision interval for a warning
    pub decision: f64,
    /// Decision interval for a critical event
    pub critical_decision: f64,
    pub min_std_m: f64,
}

impl Default for CusumConfig {
    fn default() -> Self {
        Self {
            baseline: 24,
            slack: 0.5,
            decision: 5.0,
            critical_decision: 10.0,
            min_std_m: 0.05,
        }
    }
}

impl CusumConfig {
    pub fn validate(&self) -> AnomalyResult<()> {
        at_least("cusum.baseline", self.baseline, 2)?;
        positive("cusum.decision", self.decision)?;
        positive("cusum.min_std_m", self.min_std_m)?;
        if !(self.slack.is_finite() && self.slack >= 0.0) {
            return Err(AnomalyError::InvalidConfig {
                what: "cusum.slack must be non-negative".into(),
            });
        }
        if self.critical_decision < self.decision {
            return Err(AnomalyError::InvalidConfig {
                what: "cusum.critical_decision below decision".into(),
            });
        }
        Ok(())
    }
}

/// Mahalanobis distance of each network-wide pressure vector from the
/// trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MahalanobisConfig {
    pub window: usize,
    /// Distance at which a timestamp is a warning
    pub warning_distance: f64,
    /// Distance at which a timestamp is critical
    pub critical_distance: f64,
    /// Ridge added to the covariance diagonal (m²)
    pub regularization: f64,
}

impl Default for MahalanobisConfig {
    fn default() -> Self {
        Self {
            window: 48,
            warning_distance: 4.0,
            critical_distance: 6.0,
            regularization: 1e-3,
        }
    }
}

impl MahalanobisConfig {
    pub fn validate(&self) -> AnomalyResult<()> {
        at_least("mahalanobis.window", self.window, 3)?;
        positive("mahalanobis.warning_distance", self.warning_distance)?;
        positive("mahalanobis.regularization", self.regularization)?;
        if self.critical_distance < self.warning_distance {
            return Err(AnomalyError::InvalidConfig {
                what: "mahalanobis.critical_distance below warning_distance".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(DetectorConfig::default().validate().is_ok());
        let all = DetectorConfig {
            cusum: Some(CusumConfig::default()),
            mahalanobis: Some(MahalanobisConfig::default()),
            ..DetectorConfig::default()
        };
        assert!(all.validate().is_ok());
    }

    #[test]
    fn inverted_limits_rejected() {
        assert!(DetectorConfig::threshold_only(50.0, 20.0).validate().is_err());
    }
}
