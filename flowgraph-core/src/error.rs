//! Error types for graph construction and propagation.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised by the dataflow engine.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A bind or lookup referenced a node that is not in the graph.
    #[error("unregistered node {0}")]
    Unregistered(NodeId),

    /// A transform function or custom node failed to produce its state.
    #[error("computation failed: {0}")]
    Compute(String),

    /// Synchronization through a transformer that has no inverse.
    #[error("transformer {0} has no inverse")]
    NotInvertible(NodeId),

    /// A transformer-only operation on another kind of node.
    #[error("node {0} is not a transformer")]
    NotTransformer(NodeId),

    /// The graph configuration could not be parsed.
    #[error("invalid graph config: {0}")]
    Config(#[from] serde_json::Error),
}

impl FlowError {
    /// Shorthand for a [`FlowError::Compute`] from any displayable cause.
    pub fn compute(cause: impl std::fmt::Display) -> Self {
        Self::Compute(cause.to_string())
    }
}

/// Result type for engine operations.
pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let id = NodeId::from(7);
        assert_eq!(FlowError::Unregistered(id).to_string(), "unregistered node #7");
        assert_eq!(
            FlowError::NotInvertible(id).to_string(),
            "transformer #7 has no inverse"
        );
        assert_eq!(
            FlowError::compute("division by zero").to_string(),
            "computation failed: division by zero"
        );
    }

    #[test]
    fn config_error_converts_from_json() {
        let err: FlowError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, FlowError::Config(_)));
    }
}
