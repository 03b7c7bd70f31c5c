//! Error types for detection and sample storage.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnomalyError {
    #[error("sample for '{node}' at {got} is not after the previous sample at {last}")]
    OutOfOrder {
        node: String,
        last: DateTime<Utc>,
        got: DateTime<Utc>,
    },

    #[error("non-finite pressure for '{node}' at {timestamp}")]
    NonFinite {
        node: String,
        timestamp: DateTime<Utc>,
    },

    #[error("invalid detector configuration: {what}")]
    InvalidConfig { what: String },

    #[error("sample store lock poisoned")]
    Poisoned,
}

pub type AnomalyResult<T> = Result<T, AnomalyError>;
