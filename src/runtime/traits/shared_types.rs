// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerInfo, network settings, network details, runtime metadata.

use crate::types::{ContainerId, NetworkId};
use serde::Serialize;
use std::collections::HashMap;

/// Information about a container, as returned by inspection.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Container ID.
    pub id: ContainerId,
    /// Container name.
    pub name: String,
    /// Current state.
    pub state: ContainerState,
    /// Environment as `KEY=value` strings.
    pub env: Vec<String>,
    /// Labels.
    pub labels: HashMap<String, String>,
    /// Network settings.
    pub network_settings: NetworkSettings,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// Container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

/// Network settings for a container.
#[derive(Debug, Clone, Default)]
pub struct NetworkSettings {
    /// Endpoints by network name.
    pub networks: HashMap<String, EndpointInfo>,
    /// Published ports.
    pub ports: Vec<PortBinding>,
}

/// A container's endpoint on one network.
#[derive(Debug, Clone, Default)]
pub struct EndpointInfo {
    /// Network ID.
    pub network_id: String,
    /// IP address in this network (empty if unassigned).
    pub ip_address: String,
    /// Gateway (empty if the network has none).
    pub gateway: String,
}

/// A published port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortBinding {
    /// Container side, e.g. `80/tcp`.
    pub container_port: String,
    /// Host IP, if bound.
    pub host_ip: Option<String>,
    /// Host port, if bound.
    pub host_port: Option<String>,
}

/// Network as returned by listing.
#[derive(Debug, Clone)]
pub struct NetworkSummary {
    pub id: NetworkId,
    pub name: String,
    /// Driver (bridge, host, overlay, etc.).
    pub driver: String,
    /// Driver options.
    pub options: HashMap<String, String>,
}

/// Network as returned by inspection.
#[derive(Debug, Clone)]
pub struct NetworkDetails {
    pub id: NetworkId,
    pub name: String,
    pub driver: String,
    /// Driver options; may carry the default-bridge marker.
    pub options: HashMap<String, String>,
    /// Member containers: ID to name.
    pub containers: HashMap<String, String>,
}

/// Runtime metadata.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Runtime name (e.g., "Docker", "Podman").
    pub name: String,
    /// Runtime version.
    pub version: String,
    /// API version.
    pub api_version: String,
    /// Operating system.
    pub os: String,
    /// Architecture.
    pub arch: String,
}
