// ABOUTME: Event subscription trait for container runtimes.
// ABOUTME: Streams container lifecycle notifications (start, die).

use super::sealed::Sealed;
use crate::types::ContainerId;
use async_trait::async_trait;
use futures::Stream;
use std::fmt;
use std::pin::Pin;

/// A stream of container lifecycle events. Ends or yields an error when
/// the transport to the daemon breaks.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ContainerEvent, EventError>> + Send>>;

/// Lifecycle event subscription.
#[async_trait]
pub trait EventOps: Sealed + Send + Sync {
    /// Subscribe to container events matching the filter.
    async fn container_events(&self, filter: &EventFilter) -> Result<EventStream, EventError>;
}

/// Container event actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerAction {
    Start,
    Die,
    Other(String),
}

impl ContainerAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "start" => ContainerAction::Start,
            "die" => ContainerAction::Die,
            other => ContainerAction::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContainerAction::Start => "start",
            ContainerAction::Die => "die",
            ContainerAction::Other(action) => action,
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which container events to deliver.
#[derive(Debug, Clone)]
pub struct EventFilter {
    pub actions: Vec<ContainerAction>,
}

impl EventFilter {
    /// The `start` and `die` events that drive reconciliation.
    pub fn lifecycle() -> Self {
        Self {
            actions: vec![ContainerAction::Start, ContainerAction::Die],
        }
    }

    pub fn accepts(&self, action: &ContainerAction) -> bool {
        self.actions.contains(action)
    }
}

/// A single container lifecycle notification.
#[derive(Debug, Clone)]
pub struct ContainerEvent {
    pub action: ContainerAction,
    /// The container the event is about.
    pub actor: ContainerId,
    /// Container name, when the runtime includes it.
    pub name: Option<String>,
}

/// Errors from event subscriptions.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("failed to subscribe to events: {0}")]
    Subscribe(String),

    #[error("event stream error: {0}")]
    Stream(String),
}
