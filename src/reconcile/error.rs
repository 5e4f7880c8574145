// ABOUTME: Error types for reconciliation passes.
// ABOUTME: Inspection, retry exhaustion, connectivity loss and cancellation.

use serde::Serialize;
use std::fmt;

use crate::runtime::{ContainerError, NetworkError};

/// Where a connectivity check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityStage {
    AfterJoin,
    AfterLeave,
    FinalValidation,
}

impl fmt::Display for ConnectivityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityStage::AfterJoin => write!(f, "after join"),
            ConnectivityStage::AfterLeave => write!(f, "after leave"),
            ConnectivityStage::FinalValidation => write!(f, "at final validation"),
        }
    }
}

/// Errors that end a reconciliation pass.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The runtime could not describe a container or network.
    #[error("failed to inspect {target}: {message}")]
    Inspect { target: String, message: String },

    /// A connect or disconnect did not succeed within the retry budget.
    #[error("{operation} of network {network} failed after {attempts} attempts: {message}")]
    RetryExhausted {
        operation: &'static str,
        network: String,
        attempts: u32,
        message: String,
    },

    /// The container has no external reachability.
    #[error("connectivity lost {stage}{}", network_suffix(.network))]
    ConnectivityLost {
        stage: ConnectivityStage,
        /// The network whose change broke reachability, if a single one did.
        network: Option<String>,
    },

    /// Shutdown was requested mid-pass.
    #[error("reconciliation cancelled")]
    Cancelled,
}

fn network_suffix(network: &Option<String>) -> String {
    match network {
        Some(name) => format!(" (network {})", name),
        None => String::new(),
    }
}

/// Error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileErrorKind {
    Inspect,
    RetryExhausted,
    ConnectivityLost,
    Cancelled,
}

impl ReconcileError {
    pub fn kind(&self) -> ReconcileErrorKind {
        match self {
            ReconcileError::Inspect { .. } => ReconcileErrorKind::Inspect,
            ReconcileError::RetryExhausted { .. } => ReconcileErrorKind::RetryExhausted,
            ReconcileError::ConnectivityLost { .. } => ReconcileErrorKind::ConnectivityLost,
            ReconcileError::Cancelled => ReconcileErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReconcileError::Cancelled)
    }

    pub(crate) fn inspect(target: impl fmt::Display, err: impl fmt::Display) -> Self {
        ReconcileError::Inspect {
            target: target.to_string(),
            message: err.to_string(),
        }
    }
}

/// Extension for turning runtime errors into inspection failures.
pub trait InspectErrorExt<T> {
    fn inspecting(self, target: impl fmt::Display) -> Result<T, ReconcileError>;
}

impl<T> InspectErrorExt<T> for Result<T, ContainerError> {
    fn inspecting(self, target: impl fmt::Display) -> Result<T, ReconcileError> {
        self.map_err(|e| ReconcileError::inspect(format!("container {}", target), e))
    }
}

impl<T> InspectErrorExt<T> for Result<T, NetworkError> {
    fn inspecting(self, target: impl fmt::Display) -> Result<T, ReconcileError> {
        self.map_err(|e| ReconcileError::inspect(format!("network {}", target), e))
    }
}
