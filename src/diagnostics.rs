// ABOUTME: Diagnostics accumulator for non-fatal warnings during a reconciliation pass.
// ABOUTME: Collects skipped networks and best-effort failures that shouldn't fail the pass.

use serde::Serialize;

/// Collects non-fatal warnings during reconciliation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Warnings of one kind.
    pub fn of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A network whose inspection failed during discovery.
    pub fn network_skipped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::NetworkSkipped,
            message: message.into(),
        }
    }

    /// The default bridge could not be identified.
    pub fn default_bridge_unknown(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DefaultBridgeUnknown,
            message: message.into(),
        }
    }

    /// A leave skipped because it would drop the last gateway.
    pub fn leave_skipped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LeaveSkipped,
            message: message.into(),
        }
    }

    /// A disconnect that did not succeed.
    pub fn leave_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LeaveFailed,
            message: message.into(),
        }
    }

    /// A compensating action that could not be applied.
    pub fn rollback_step_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RollbackStepFailed,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A network could not be inspected and was left out of planning.
    NetworkSkipped,
    /// No network matched the default bridge by name or option.
    DefaultBridgeUnknown,
    /// Leaving would have removed the last gateway-bearing membership.
    LeaveSkipped,
    /// Disconnect failed after retries.
    LeaveFailed,
    /// Rollback could not undo a join.
    RollbackStepFailed,
}
