// ABOUTME: Compensating actions and the LIFO stack that undoes completed joins.
// ABOUTME: Actions are plain data so the stack can be inspected before it runs.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::NetworkOps;
use crate::types::{ContainerId, NetworkRef};

use super::error::ReconcileError;
use super::retry::{RetryPolicy, connect_network, disconnect_network};

/// An operation that reverses an earlier successful one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "network", rename_all = "snake_case")]
pub enum CompensatingAction {
    /// Undo a join.
    Disconnect(NetworkRef),
    /// Undo a leave.
    Reconnect(NetworkRef),
}

impl CompensatingAction {
    pub fn network(&self) -> &NetworkRef {
        match self {
            CompensatingAction::Disconnect(n) | CompensatingAction::Reconnect(n) => n,
        }
    }

    /// Apply the action with the given retry budget.
    ///
    /// Runs to completion even during shutdown, so it uses its own token.
    pub async fn apply<R: NetworkOps>(
        &self,
        runtime: &R,
        container: &ContainerId,
        policy: &RetryPolicy,
    ) -> Result<(), ReconcileError> {
        let never = CancellationToken::new();
        match self {
            CompensatingAction::Disconnect(network) => {
                disconnect_network(runtime, container, network, policy, &never).await
            }
            CompensatingAction::Reconnect(network) => {
                connect_network(runtime, container, network, policy, &never).await
            }
        }
    }
}

/// Compensating actions for one pass, unwound last-in first-out.
#[derive(Debug, Default)]
pub struct UndoStack {
    actions: Vec<CompensatingAction>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: CompensatingAction) {
        self.actions.push(action);
    }

    /// Actions in the order they were pushed.
    pub fn actions(&self) -> &[CompensatingAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Apply every action, most recent first. A failing action is recorded
    /// and the rest still run. Returns the networks that were restored.
    pub async fn unwind<R: NetworkOps>(
        mut self,
        runtime: &R,
        container: &ContainerId,
        policy: &RetryPolicy,
        diagnostics: &mut Diagnostics,
    ) -> Vec<NetworkRef> {
        let mut undone = Vec::with_capacity(self.actions.len());
        while let Some(action) = self.actions.pop() {
            match action.apply(runtime, container, policy).await {
                Ok(()) => {
                    tracing::info!(action = ?action, "rolled back");
                    undone.push(action.network().clone());
                }
                Err(e) => diagnostics.warn(Warning::rollback_step_failed(format!(
                    "could not undo {}: {}",
                    action.network(),
                    e
                ))),
            }
        }
        undone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::{Call, FakeContainer, FakeRuntime};
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 2,
            delay: Duration::from_millis(100),
        }
    }

    #[test]
    fn stack_is_inspectable_without_running() {
        let mut stack = UndoStack::new();
        stack.push(CompensatingAction::Disconnect(NetworkRef::bridge("a", "a")));
        stack.push(CompensatingAction::Disconnect(NetworkRef::bridge("b", "b")));

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.actions()[1].network().id.as_str(), "b");
    }

    #[tokio::test(start_paused = true)]
    async fn unwind_runs_last_in_first_out() {
        let runtime = FakeRuntime::new()
            .with_network("a", "a")
            .with_network("b", "b")
            .with_container(FakeContainer::new("proxy-id", "proxy").on(&["a", "b"]));

        let mut stack = UndoStack::new();
        stack.push(CompensatingAction::Disconnect(NetworkRef::bridge("a", "a")));
        stack.push(CompensatingAction::Disconnect(NetworkRef::bridge("b", "b")));

        let mut diag = Diagnostics::default();
        let undone = stack
            .unwind(&runtime, &ContainerId::new("proxy-id"), &policy(), &mut diag)
            .await;

        assert_eq!(
            runtime.calls(),
            [
                Call::Disconnect("b".to_string()),
                Call::Disconnect("a".to_string())
            ]
        );
        assert_eq!(undone.len(), 2);
        assert!(runtime.networks_of("proxy").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_step_does_not_stop_unwinding() {
        let runtime = FakeRuntime::new()
            .with_network("a", "a")
            .with_network("b", "b")
            .with_container(FakeContainer::new("proxy-id", "proxy").on(&["a", "b"]))
            .fail_disconnect("b", None);

        let mut stack = UndoStack::new();
        stack.push(CompensatingAction::Disconnect(NetworkRef::bridge("a", "a")));
        stack.push(CompensatingAction::Disconnect(NetworkRef::bridge("b", "b")));

        let mut diag = Diagnostics::default();
        let undone = stack
            .unwind(&runtime, &ContainerId::new("proxy-id"), &policy(), &mut diag)
            .await;

        assert_eq!(undone, [NetworkRef::bridge("a", "a")]);
        assert_eq!(runtime.networks_of("proxy"), ["b"]);
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn actions_serialize_with_tag() {
        let action = CompensatingAction::Reconnect(NetworkRef::bridge("n1", "web"));
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "reconnect");
        assert_eq!(json["network"]["name"], "web");
    }
}
