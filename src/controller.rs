// ABOUTME: Event-driven controller: initial scan, then one pass per lifecycle event.
// ABOUTME: Resubscribes after a fixed delay when the event stream breaks.

use futures::StreamExt;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::reconcile::{
    ContainerIdentity, PassReport, ReconcileError, ReconcileSettings, Reconciler, sleep_or_cancel,
};
use crate::runtime::{ContainerAction, ContainerEvent, EventFilter, EventStream, FullRuntime};

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    InitialScan,
    Listening,
    ReactingToEvent,
    Reconnecting,
    ShuttingDown,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Idle => "idle",
            ControllerState::InitialScan => "initial scan",
            ControllerState::Listening => "listening",
            ControllerState::ReactingToEvent => "reacting to event",
            ControllerState::Reconnecting => "reconnecting",
            ControllerState::ShuttingDown => "shutting down",
        };
        f.write_str(name)
    }
}

/// Keeps one container's network membership reconciled until cancelled.
///
/// Events are handled one at a time on a single task, so passes never
/// interleave.
pub struct Controller<R> {
    runtime: R,
    settings: ReconcileSettings,
    reconnect_delay: Duration,
    cancel: CancellationToken,
    state: ControllerState,
}

impl<R: FullRuntime> Controller<R> {
    pub fn new(
        runtime: R,
        settings: ReconcileSettings,
        reconnect_delay: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            runtime,
            settings,
            reconnect_delay,
            cancel,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Run until cancelled or a pass fails.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failed pass. Shutdown mid-pass is not
    /// an error.
    pub async fn run(&mut self) -> Result<(), ReconcileError> {
        let result = self.run_until_stopped().await;
        self.set_state(ControllerState::ShuttingDown);
        match result {
            Err(ReconcileError::Cancelled) => Ok(()),
            other => other,
        }
    }

    async fn run_until_stopped(&mut self) -> Result<(), ReconcileError> {
        self.set_state(ControllerState::InitialScan);
        let identity = self.reconciler().identify().await?;
        tracing::info!(container = %identity.name, id = %identity.id, "managing container");
        let report = self.reconciler().full_pass().await?;
        log_report(&report);

        let filter = EventFilter::lifecycle();
        loop {
            if let Some(mut stream) = self.subscribe(&filter).await? {
                self.set_state(ControllerState::Listening);
                self.listen(&identity, &mut stream).await?;
            }

            self.set_state(ControllerState::Reconnecting);
            if !sleep_or_cancel(self.reconnect_delay, &self.cancel).await {
                return Err(ReconcileError::Cancelled);
            }
        }
    }

    /// Subscribe to lifecycle events. `None` means try again later.
    async fn subscribe(
        &self,
        filter: &EventFilter,
    ) -> Result<Option<EventStream>, ReconcileError> {
        let subscribed = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ReconcileError::Cancelled),
            subscribed = self.runtime.container_events(filter) => subscribed,
        };
        match subscribed {
            Ok(stream) => {
                tracing::debug!("subscribed to container events");
                Ok(Some(stream))
            }
            Err(e) => {
                tracing::warn!(error = %e, "event subscription failed");
                Ok(None)
            }
        }
    }

    /// Handle events until the stream breaks.
    async fn listen(
        &mut self,
        identity: &ContainerIdentity,
        stream: &mut EventStream,
    ) -> Result<(), ReconcileError> {
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ReconcileError::Cancelled),
                next = stream.next() => next,
            };
            match next {
                Some(Ok(event)) => self.handle_event(identity, event).await?,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "event stream failed");
                    return Ok(());
                }
                None => {
                    tracing::warn!("event stream ended");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_event(
        &mut self,
        identity: &ContainerIdentity,
        event: ContainerEvent,
    ) -> Result<(), ReconcileError> {
        if is_own_event(identity, &event) {
            tracing::debug!(action = %event.action, "ignoring own event");
            return Ok(());
        }

        let container = event.name.as_deref().unwrap_or(event.actor.as_str());
        tracing::info!(action = %event.action, container, "container event");
        self.set_state(ControllerState::ReactingToEvent);
        let report = match event.action {
            ContainerAction::Start => Some(self.reconciler().full_pass().await?),
            ContainerAction::Die => Some(self.reconciler().prune_pass().await?),
            ContainerAction::Other(_) => None,
        };
        if let Some(report) = report {
            log_report(&report);
        }
        self.set_state(ControllerState::Listening);
        Ok(())
    }

    fn reconciler(&self) -> Reconciler<'_, R> {
        Reconciler::new(&self.runtime, &self.settings, self.cancel.clone())
    }

    fn set_state(&mut self, state: ControllerState) {
        if self.state != state {
            tracing::debug!(from = %self.state, to = %state, "controller state");
            self.state = state;
        }
    }
}

fn is_own_event(identity: &ContainerIdentity, event: &ContainerEvent) -> bool {
    identity.is(event.actor.as_str(), event.name.as_deref().unwrap_or(""))
}

fn log_report(report: &PassReport) {
    if report.changed() {
        let joined: Vec<String> = report.joined.iter().map(|n| n.to_string()).collect();
        let left: Vec<String> = report.left.iter().map(|n| n.to_string()).collect();
        tracing::info!(joined = ?joined, left = ?left, "membership updated");
    } else {
        tracing::debug!("membership unchanged");
    }
}
