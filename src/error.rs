// ABOUTME: Application-wide error types for bridgekeeper.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::reconcile::ReconcileError;
use crate::runtime::{RuntimeError, RuntimeErrorKind};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "no container to manage: set `container` in the config, pass --container, or set BRIDGEKEEPER_CONTAINER"
    )]
    MissingContainer,

    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("controller task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// A next step for the operator, when the failure has an obvious one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Runtime(e) => Some(match e.kind() {
                RuntimeErrorKind::NoRuntimeFound => {
                    "set `runtime.socket` in the config or export DOCKER_HOST"
                }
                RuntimeErrorKind::ConnectionFailed => {
                    "check that the daemon is running and its socket is readable"
                }
                RuntimeErrorKind::RuntimeOperation => {
                    "the daemon answered but refused the request; see its logs"
                }
            }),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{DetectionError, RuntimeInfoError};

    #[test]
    fn runtime_errors_carry_a_hint() {
        let err = Error::from(RuntimeError::from(DetectionError::NoRuntimeFound));
        assert!(err.hint().unwrap().contains("DOCKER_HOST"));

        let err = Error::from(RuntimeError::from(RuntimeInfoError::ConnectionFailed(
            "refused".to_string(),
        )));
        assert!(err.hint().unwrap().contains("daemon is running"));
    }

    #[test]
    fn config_errors_have_no_hint() {
        assert!(Error::MissingContainer.hint().is_none());
    }
}
