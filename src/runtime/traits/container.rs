// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Inspect and list containers; this crate never creates or stops any.

use super::sealed::Sealed;
use super::shared_types::ContainerInfo;
use crate::types::{ContainerId, NetworkId};
use async_trait::async_trait;
use std::collections::HashMap;

/// Read-only container queries.
#[async_trait]
pub trait ContainerOps: Sealed + Send + Sync {
    /// Get detailed information about a container (by ID or name).
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError>;

    /// List containers matching the given filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Filter by label (key=value).
    pub labels: HashMap<String, String>,
    /// Filter by name (supports partial match).
    pub name: Option<String>,
    /// Only containers attached to this network.
    pub network: Option<NetworkId>,
    /// Include stopped containers.
    pub all: bool,
}

impl ContainerFilters {
    /// Running containers attached to `network`.
    pub fn running_on(network: &NetworkId) -> Self {
        Self {
            network: Some(network.clone()),
            all: false,
            ..Default::default()
        }
    }
}

/// Summary information about a container.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    /// Container ID.
    pub id: ContainerId,
    /// Container name, without the leading slash.
    pub name: String,
    /// Current state.
    pub state: String,
    /// Labels.
    pub labels: HashMap<String, String>,
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
