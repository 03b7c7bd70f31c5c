//! Error types for component construction.

use hn_core::error::HnError;
use thiserror::Error;

/// Errors raised while constructing a link element.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Non-physical value: {what} = {value}")]
    NonPhysical { what: &'static str, value: f64 },

    #[error("Invalid pump curve: {what}")]
    InvalidCurve { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

impl From<HnError> for ComponentError {
    fn from(e: HnError) -> Self {
        match e {
            HnError::NonFinite { what, value } | HnError::Negative { what, value } => {
                ComponentError::NonPhysical { what, value }
            }
            HnError::InvalidArg { what } => ComponentError::InvalidArg { what },
            HnError::IndexOob { what, .. } => ComponentError::InvalidArg { what },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::NonPhysical {
            what: "diameter",
            value: -1.0,
        };
        assert!(err.to_string().contains("diameter"));
    }

    #[test]
    fn error_conversion() {
        let core_err = HnError::Negative {
            what: "length",
            value: -2.0,
        };
        let err: ComponentError = core_err.into();
        assert!(matches!(err, ComponentError::NonPhysical { what: "length", .. }));
    }
}
