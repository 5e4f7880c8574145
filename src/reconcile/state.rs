// ABOUTME: Transaction state markers for the type state pattern, and pass phases.
// ABOUTME: Zero-sized types enforce that joins precede leaves precede validation.

use serde::Serialize;
use std::fmt;

/// Plan computed, nothing applied yet.
/// Available actions: `join()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Planned;

/// Every planned join applied and verified.
/// Available actions: `leave()`, `rollback()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Joined;

/// Leaves applied or skipped.
/// Available actions: `validate()`, `rollback()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Left;

/// Final validation passed.
/// Available actions: `commit()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Committed;

/// Observable phase of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassPhase {
    Planning,
    Joining,
    Leaving,
    Validating,
    Committed,
    RolledBack,
    Failed,
}

impl fmt::Display for PassPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassPhase::Planning => "planning",
            PassPhase::Joining => "joining",
            PassPhase::Leaving => "leaving",
            PassPhase::Validating => "validating",
            PassPhase::Committed => "committed",
            PassPhase::RolledBack => "rolled back",
            PassPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}
