// ABOUTME: Network operations trait for container runtimes.
// ABOUTME: List and inspect networks, connect/disconnect containers.

use super::sealed::Sealed;
use super::shared_types::{NetworkDetails, NetworkSummary};
use crate::types::{ContainerId, NetworkId};
use async_trait::async_trait;

/// Network operations: list, inspect, connect, disconnect.
#[async_trait]
pub trait NetworkOps: Sealed + Send + Sync {
    /// List networks matching the given filters.
    async fn list_networks(
        &self,
        filters: &NetworkFilters,
    ) -> Result<Vec<NetworkSummary>, NetworkError>;

    /// Inspect a network, including its member containers.
    async fn inspect_network(&self, id: &NetworkId) -> Result<NetworkDetails, NetworkError>;

    /// Connect a container to a network.
    async fn connect_to_network(
        &self,
        container: &ContainerId,
        network: &NetworkId,
    ) -> Result<(), NetworkError>;

    /// Disconnect a container from a network.
    async fn disconnect_from_network(
        &self,
        container: &ContainerId,
        network: &NetworkId,
        force: bool,
    ) -> Result<(), NetworkError>;
}

/// Filters for listing networks.
#[derive(Debug, Clone, Default)]
pub struct NetworkFilters {
    /// Only networks using this driver.
    pub driver: Option<String>,
    /// Filter by name (supports partial match).
    pub name: Option<String>,
}

impl NetworkFilters {
    pub fn bridges() -> Self {
        Self {
            driver: Some("bridge".to_string()),
            name: None,
        }
    }
}

/// Errors from network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("network not found: {0}")]
    NotFound(String),

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("container already connected to network: {0}")]
    AlreadyConnected(String),

    #[error("container not connected to network: {0}")]
    NotConnected(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
