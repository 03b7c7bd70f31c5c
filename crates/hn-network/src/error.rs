//! Network construction errors.

use hn_components::ComponentError;
use thiserror::Error;

/// Structural or parametric inconsistency in a network description.
///
/// Construction stops at the first one found.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("link '{link}' references unknown node '{node}'")]
    UnknownNode { link: String, node: String },

    #[error("link '{link}' starts and ends at node '{node}'")]
    SelfLoop { link: String, node: String },

    #[error("invalid {field} for '{id}': {value}")]
    InvalidValue {
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("invalid link '{link}': {source}")]
    InvalidLink {
        link: String,
        #[source]
        source: ComponentError,
    },

    #[error("node '{node}' references unknown pattern '{pattern}'")]
    UnknownPattern { node: String, pattern: String },

    #[error("network has no reservoir or tank")]
    NoSource,
}

/// Nodes that cannot be reached from any reservoir or tank.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} node(s) unreachable from any source: {}", unreachable.len(), unreachable.join(", "))]
pub struct DisconnectedNetworkError {
    /// Unreachable node ids in declaration order.
    pub unreachable: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Disconnected(#[from] DisconnectedNetworkError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_lists_nodes() {
        let err = DisconnectedNetworkError {
            unreachable: vec!["J4".into(), "J5".into()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 node(s)"));
        assert!(msg.contains("J4, J5"));
    }

    #[test]
    fn invalid_link_keeps_source() {
        use std::error::Error;
        let err = TopologyError::InvalidLink {
            link: "P1".into(),
            source: ComponentError::NonPhysical {
                what: "pipe diameter",
                value: 0.0,
            },
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("pipe diameter"));
    }
}
