// ABOUTME: State transition methods for one reconciliation pass.
// ABOUTME: Each method consumes self and returns the next state, or itself for rollback.

use std::marker::PhantomData;

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::{ContainerOps, NetworkOps};
use crate::types::NetworkRef;

use super::connectivity::has_connectivity;
use super::error::{ConnectivityStage, ReconcileError};
use super::executor::{Executor, PassReport};
use super::inventory::capture_state;
use super::plan::OperationPlan;
use super::state::{Committed, Joined, Left, PassPhase, Planned};
use super::undo::{CompensatingAction, UndoStack};

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<Transaction<T>, (Transaction<S>, ReconcileError)>;

/// A pass in progress, parameterized by how far it has come.
///
/// The undo stack and report travel with the transaction, so a failed
/// transition hands back everything rollback needs.
#[derive(Debug)]
pub struct Transaction<S> {
    plan: OperationPlan,
    undo: UndoStack,
    report: PassReport,
    diagnostics: Diagnostics,
    _state: PhantomData<S>,
}

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Transaction<S> {
    fn transition<T>(self) -> Transaction<T> {
        Transaction {
            plan: self.plan,
            undo: self.undo,
            report: self.report,
            diagnostics: self.diagnostics,
            _state: PhantomData,
        }
    }

    pub fn plan(&self) -> &OperationPlan {
        &self.plan
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    fn finish(mut self, phase: PassPhase) -> PassReport {
        self.report.phase = phase;
        self.report.warnings = self.diagnostics.into_warnings();
        self.report
    }

    /// Undo every join of this pass, most recent first.
    ///
    /// Memberships that existed before the pass are never touched.
    pub async fn rollback<R: NetworkOps>(mut self, exec: &Executor<'_, R>) -> PassReport {
        let undo = std::mem::take(&mut self.undo);
        let expected = undo.len();
        let undone = undo
            .unwind(
                exec.runtime,
                &self.plan.container_id,
                &exec.policy,
                &mut self.diagnostics,
            )
            .await;
        let complete = undone.len() == expected;
        self.report.rolled_back = undone;
        self.finish(if complete {
            PassPhase::RolledBack
        } else {
            PassPhase::Failed
        })
    }

    /// End the pass without undoing anything.
    pub fn abandon(self) -> PassReport {
        self.finish(PassPhase::Failed)
    }
}

// =============================================================================
// Planned -> Joined
// =============================================================================

impl Transaction<Planned> {
    pub fn new(plan: OperationPlan, diagnostics: Diagnostics) -> Self {
        let report = PassReport::new(&plan);
        Transaction {
            plan,
            undo: UndoStack::new(),
            report,
            diagnostics,
            _state: PhantomData,
        }
    }

    /// Connect to every planned network in ID order.
    ///
    /// Each join is retried, then given time to settle, then gated on the
    /// container still having connectivity.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on the first failure; every join done so far
    /// is on the undo stack.
    #[must_use = "transaction state must be used"]
    pub async fn join<R: ContainerOps + NetworkOps>(
        mut self,
        exec: &Executor<'_, R>,
    ) -> TransitionResult<Joined, Planned> {
        let container = self.plan.container_id.clone();
        let targets: Vec<NetworkRef> = self.plan.to_join.iter().cloned().collect();

        for network in targets {
            if exec.cancel.is_cancelled() {
                return Err((self, ReconcileError::Cancelled));
            }

            tracing::info!(network = %network, "joining network");
            if let Err(e) = exec.connect(&container, &network).await {
                return Err((self, e));
            }
            self.undo.push(CompensatingAction::Disconnect(network.clone()));
            self.report.joined.push(network.clone());

            if !exec.stabilize().await {
                return Err((self, ReconcileError::Cancelled));
            }

            match has_connectivity(exec.runtime, &container).await {
                Ok(true) => {}
                Ok(false) => {
                    return Err((
                        self,
                        ReconcileError::ConnectivityLost {
                            stage: ConnectivityStage::AfterJoin,
                            network: Some(network.to_string()),
                        },
                    ));
                }
                Err(e) => return Err((self, e)),
            }
        }

        Ok(self.transition())
    }
}

// =============================================================================
// Joined -> Left
// =============================================================================

impl Transaction<Joined> {
    /// Disconnect from every planned network in ID order, best effort.
    ///
    /// A leave that would drop the last gateway-bearing membership is
    /// skipped. A disconnect that keeps failing is skipped. A disconnect that
    /// breaks connectivity is reverted and fails the pass.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` if connectivity was lost, the container could
    /// not be inspected, or shutdown was requested.
    #[must_use = "transaction state must be used"]
    pub async fn leave<R: ContainerOps + NetworkOps>(
        mut self,
        exec: &Executor<'_, R>,
    ) -> TransitionResult<Left, Joined> {
        let container = self.plan.container_id.clone();
        let targets: Vec<NetworkRef> = self.plan.to_leave.iter().cloned().collect();

        for network in targets {
            if exec.cancel.is_cancelled() {
                return Err((self, ReconcileError::Cancelled));
            }

            let state = match capture_state(exec.runtime, &container).await {
                Ok(state) => state,
                Err(e) => return Err((self, e)),
            };
            if !state.is_member(&network.id) {
                tracing::debug!(network = %network, "already left");
                continue;
            }
            if state.is_last_gateway(&network.id) {
                self.diagnostics.warn(Warning::leave_skipped(format!(
                    "not leaving {}: it carries the last gateway",
                    network
                )));
                self.report.skipped.push(network);
                continue;
            }

            tracing::info!(network = %network, "leaving network");
            match exec.disconnect(&container, &network).await {
                Ok(()) => {}
                Err(ReconcileError::Cancelled) => {
                    return Err((self, ReconcileError::Cancelled));
                }
                Err(e) => {
                    self.diagnostics.warn(Warning::leave_failed(format!(
                        "could not leave {}: {}",
                        network, e
                    )));
                    self.report.skipped.push(network);
                    continue;
                }
            }

            match has_connectivity(exec.runtime, &container).await {
                Ok(true) => self.report.left.push(network),
                Ok(false) => {
                    self.repair(exec, &network).await;
                    return Err((
                        self,
                        ReconcileError::ConnectivityLost {
                            stage: ConnectivityStage::AfterLeave,
                            network: Some(network.to_string()),
                        },
                    ));
                }
                Err(e) => {
                    self.repair(exec, &network).await;
                    return Err((self, e));
                }
            }
        }

        Ok(self.transition())
    }

    /// Rejoin a network whose departure broke connectivity.
    async fn repair<R: NetworkOps>(&mut self, exec: &Executor<'_, R>, network: &NetworkRef) {
        let action = CompensatingAction::Reconnect(network.clone());
        match action
            .apply(exec.runtime, &self.plan.container_id, &exec.policy)
            .await
        {
            Ok(()) => {
                tracing::warn!(network = %network, "rejoined network after connectivity loss")
            }
            Err(e) => self.diagnostics.warn(Warning::rollback_step_failed(format!(
                "could not rejoin {}: {}",
                network, e
            ))),
        }
    }
}

// =============================================================================
// Left -> Committed
// =============================================================================

impl Transaction<Left> {
    /// Compare external reachability against the start of the pass.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` if the container had a gateway before the
    /// pass and has none now, or if it cannot be inspected.
    #[must_use = "transaction state must be used"]
    pub async fn validate<R: ContainerOps>(
        mut self,
        exec: &Executor<'_, R>,
    ) -> TransitionResult<Committed, Left> {
        let final_state = match capture_state(exec.runtime, &self.plan.container_id).await {
            Ok(state) => state,
            Err(e) => return Err((self, e)),
        };
        self.report.has_external = final_state.has_external();

        if self.plan.original_state.has_external() && !final_state.has_external() {
            return Err((
                self,
                ReconcileError::ConnectivityLost {
                    stage: ConnectivityStage::FinalValidation,
                    network: None,
                },
            ));
        }

        Ok(self.transition())
    }
}

// =============================================================================
// Committed
// =============================================================================

impl Transaction<Committed> {
    /// Finish the pass. The undo stack is discarded unused.
    pub fn commit(self) -> PassReport {
        self.finish(PassPhase::Committed)
    }
}
