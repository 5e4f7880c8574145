// ABOUTME: Transactional executor that applies an operation plan to the runtime.
// ABOUTME: Drives the transaction through join, leave and validation, rolling back on failure.

use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::{ContainerOps, NetworkOps};
use crate::types::{ContainerId, NetworkRef};

use super::error::ReconcileError;
use super::plan::OperationPlan;
use super::retry::{RetryPolicy, connect_network, disconnect_network, sleep_or_cancel};
use super::state::PassPhase;
use super::transaction::Transaction;

/// What a pass did.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub container_id: ContainerId,
    pub phase: PassPhase,
    pub joined: Vec<NetworkRef>,
    pub left: Vec<NetworkRef>,
    /// Leaves skipped to protect the last gateway or after failing.
    pub skipped: Vec<NetworkRef>,
    /// Joins undone by rollback.
    pub rolled_back: Vec<NetworkRef>,
    pub had_external: bool,
    pub has_external: bool,
    pub warnings: Vec<Warning>,
}

impl PassReport {
    pub(crate) fn new(plan: &OperationPlan) -> Self {
        let had_external = plan.original_state.has_external();
        Self {
            container_id: plan.container_id.clone(),
            phase: PassPhase::Planning,
            joined: Vec::new(),
            left: Vec::new(),
            skipped: Vec::new(),
            rolled_back: Vec::new(),
            had_external,
            has_external: had_external,
            warnings: Vec::new(),
        }
    }

    pub fn changed(&self) -> bool {
        !self.joined.is_empty() || !self.left.is_empty()
    }
}

/// Applies plans against one runtime. Holds no per-pass state.
pub struct Executor<'a, R> {
    pub(crate) runtime: &'a R,
    pub(crate) policy: RetryPolicy,
    pub(crate) stabilization: Duration,
    pub(crate) cancel: &'a CancellationToken,
}

impl<'a, R: ContainerOps + NetworkOps> Executor<'a, R> {
    pub fn new(
        runtime: &'a R,
        policy: RetryPolicy,
        stabilization: Duration,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            runtime,
            policy,
            stabilization,
            cancel,
        }
    }

    /// Apply `plan`: joins, then leaves, then final validation.
    ///
    /// On success the container is on the desired networks, except for
    /// leaves that were skipped. On failure every join of this pass has been
    /// undone, except when shutdown interrupts the leave phase, which stops
    /// after the current step.
    pub async fn execute(
        &self,
        plan: OperationPlan,
        diagnostics: Diagnostics,
    ) -> Result<PassReport, ReconcileError> {
        tracing::info!(
            phase = %PassPhase::Joining,
            join = plan.to_join.len(),
            leave = plan.to_leave.len(),
            "applying plan"
        );
        let tx = Transaction::new(plan, diagnostics);

        let tx = match tx.join(self).await {
            Ok(tx) => tx,
            Err((tx, err)) => return Err(self.abort(tx.rollback(self).await, err)),
        };

        tracing::info!(phase = %PassPhase::Leaving, "joins complete");
        let tx = match tx.leave(self).await {
            Ok(tx) => tx,
            Err((tx, ReconcileError::Cancelled)) => {
                return Err(self.abort(tx.abandon(), ReconcileError::Cancelled));
            }
            Err((tx, err)) => return Err(self.abort(tx.rollback(self).await, err)),
        };

        tracing::info!(phase = %PassPhase::Validating, "leaves complete");
        let tx = match tx.validate(self).await {
            Ok(tx) => tx,
            Err((tx, err)) => return Err(self.abort(tx.rollback(self).await, err)),
        };

        let report = tx.commit();
        tracing::info!(
            phase = %report.phase,
            joined = report.joined.len(),
            left = report.left.len(),
            skipped = report.skipped.len(),
            has_external = report.has_external,
            "pass committed"
        );
        Ok(report)
    }

    fn abort(&self, report: PassReport, err: ReconcileError) -> ReconcileError {
        let rolled_back: Vec<String> = report.rolled_back.iter().map(|n| n.to_string()).collect();
        tracing::warn!(
            phase = %report.phase,
            error = %err,
            rolled_back = ?rolled_back,
            "pass aborted"
        );
        err
    }

    pub(crate) async fn connect(
        &self,
        container: &ContainerId,
        network: &NetworkRef,
    ) -> Result<(), ReconcileError> {
        connect_network(self.runtime, container, network, &self.policy, self.cancel).await
    }

    pub(crate) async fn disconnect(
        &self,
        container: &ContainerId,
        network: &NetworkRef,
    ) -> Result<(), ReconcileError> {
        disconnect_network(self.runtime, container, network, &self.policy, self.cancel).await
    }

    /// Wait for the runtime's network plumbing to settle. False if cancelled.
    pub(crate) async fn stabilize(&self) -> bool {
        sleep_or_cancel(self.stabilization, self.cancel).await
    }
}
