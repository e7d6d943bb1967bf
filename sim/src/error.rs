//! Error types for the ECS core and the world pipeline.
//!
//! Handle misuse on the ECS mutators is a logic bug in the embedder and
//! panics with the `Display` text of an [`EcsError`]; the `try_*` entry
//! points return the same values instead of panicking.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::ecs::ID;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("stale entity handle {id}, scope holds {current}")]
    StaleHandle { id: ID, current: ID },
    #[error("zero entity handle")]
    ZeroHandle,
    #[error("foreign entity: handle from scope {entity_scope} used with scope {scope}")]
    ForeignEntity { scope: u64, entity_scope: u64 },
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("structural misuse: {0}")]
    StructuralMisuse(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse automaton config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read automaton config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid automaton config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_message_names_kind() {
        let err = EcsError::StaleHandle {
            id: ID::new(3, 1),
            current: ID::new(3, 2),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("stale entity handle"));
        assert!(msg.contains("3(gen:1)"));
        assert!(msg.contains("3(gen:2)"));
    }

    #[test]
    fn test_config_error_converts_into_sim_error() {
        let err: SimError = ConfigError::Invalid("order".into()).into();
        assert!(matches!(err, SimError::Config(ConfigError::Invalid(_))));
        assert_eq!(err.to_string(), "invalid automaton config: order");
    }
}
