//! Graph Configuration
//!
//! Knobs that change how the engine reports and schedules work. Every field
//! has a default, so a partial JSON document is enough:
//!
//! ```rust,ignore
//! let config = GraphConfig::from_json(r#"{ "deferred_in_sync": "drop" }"#)?;
//! let graph = Graph::with_config(config);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::FlowResult;

/// What a store does when its inputs disagree during a recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyCheck {
    /// Emit a warning naming the store. The first input still wins.
    #[default]
    Warn,
    /// Keep the first input without reporting anything.
    Silent,
}

/// What `update_sync` does with a deferred state change that is still
/// pending after its first poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeferredPolicy {
    /// Spawn it onto the current tokio runtime so it settles later.
    /// Falls back to `Drop` when no runtime is running.
    #[default]
    Spawn,
    /// Discard it with a warning.
    Drop,
}

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Store consistency reporting.
    pub consistency: ConsistencyCheck,

    /// Handling of pending deferred state in synchronous updates.
    pub deferred_in_sync: DeferredPolicy,
}

impl GraphConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> FlowResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_warn_and_spawn() {
        let config = GraphConfig::default();
        assert_eq!(config.consistency, ConsistencyCheck::Warn);
        assert_eq!(config.deferred_in_sync, DeferredPolicy::Spawn);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = GraphConfig::from_json(r#"{ "consistency": "silent" }"#).unwrap();
        assert_eq!(config.consistency, ConsistencyCheck::Silent);
        assert_eq!(config.deferred_in_sync, DeferredPolicy::Spawn);
    }

    #[test]
    fn unknown_variant_is_rejected() {
        assert!(GraphConfig::from_json(r#"{ "deferred_in_sync": "later" }"#).is_err());
    }
}
