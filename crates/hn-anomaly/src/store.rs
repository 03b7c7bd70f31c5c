//! Append-only pressure sample store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{AnomalyError, AnomalyResult};
use crate::sample::PressureSample;

/// Thread-safe, append-only store of per-node pressure series.
///
/// Each node's series is strictly increasing in time; an append that would
/// break that is rejected rather than reordered.
#[derive(Debug, Default)]
pub struct SampleStore {
    series: Mutex<BTreeMap<String, Vec<PressureSample>>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, sample: PressureSample) -> AnomalyResult<()> {
        if !sample.pressure_m.is_finite() {
            return Err(AnomalyError::NonFinite {
                node: sample.node,
                timestamp: sample.timestamp,
            });
        }
        let mut series = self.series.lock().map_err(|_| AnomalyError::Poisoned)?;
        let entry = series.entry(sample.node.clone()).or_default();
        if let Some(last) = entry.last() {
            if sample.timestamp <= last.timestamp {
                return Err(AnomalyError::OutOfOrder {
                    node: sample.node,
                    last: last.timestamp,
                    got: sample.timestamp,
                });
            }
        }
        entry.push(sample);
        Ok(())
    }

    /// Append in order, stopping at the first rejected sample.
    pub fn extend(&self, samples: impl IntoIterator<Item = PressureSample>) -> AnomalyResult<usize> {
        let mut n = 0;
        for s in samples {
            self.append(s)?;
            n += 1;
        }
        Ok(n)
    }

    /// Total number of samples.
    pub fn len(&self) -> AnomalyResult<usize> {
        let series = self.series.lock().map_err(|_| AnomalyError::Poisoned)?;
        Ok(series.values().map(Vec::len).sum())
    }

    pub fn is_empty(&self) -> AnomalyResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of one node's series.
    pub fn series(&self, node: &str) -> AnomalyResult<Vec<PressureSample>> {
        let series = self.series.lock().map_err(|_| AnomalyError::Poisoned)?;
        Ok(series.get(node).cloned().unwrap_or_default())
    }

    /// Copy of every series, node by node in name order.
    pub fn snapshot(&self) -> AnomalyResult<Vec<PressureSample>> {
        let series = self.series.lock().map_err(|_| AnomalyError::Poisoned)?;
        Ok(series.values().flatten().cloned().collect())
    }
}
