// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Supports both Docker and Podman via Docker-compatible API.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    ContainerAction, ContainerError, ContainerEvent, ContainerFilters, ContainerInfo,
    ContainerOps, ContainerState, ContainerSummary, EndpointInfo, EventError, EventFilter,
    EventOps, EventStream, NetworkDetails, NetworkError, NetworkFilters, NetworkOps,
    NetworkSettings, NetworkSummary, PortBinding, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::runtime::types::{RuntimeEndpoint, RuntimeType};
use crate::types::{ContainerId, NetworkId};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{ContainerStateStatusEnum, NetworkConnectRequest, NetworkDisconnectRequest};
use bollard::query_parameters::{
    EventsOptions, InspectContainerOptions, InspectNetworkOptions, ListContainersOptions,
    ListNetworksOptions,
};
use futures::StreamExt;
use std::collections::HashMap;

/// Seconds before a request to the daemon socket is abandoned.
const CLIENT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_network_inspect_error(e: bollard::errors::Error) -> NetworkError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => NetworkError::NotFound(message.clone()),
        _ => NetworkError::Runtime(e.to_string()),
    }
}

fn map_network_connect_error(e: bollard::errors::Error) -> NetworkError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => {
            if message.to_lowercase().contains("container") {
                NetworkError::ContainerNotFound(message.clone())
            } else {
                NetworkError::NotFound(message.clone())
            }
        }
        // Docker answers 403 on older engines and 409 on newer ones when
        // the endpoint already exists.
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if (*status_code == 403 || *status_code == 409) && is_already_attached(message) => {
            NetworkError::AlreadyConnected(message.clone())
        }
        _ => NetworkError::Runtime(e.to_string()),
    }
}

fn map_network_disconnect_error(e: bollard::errors::Error) -> NetworkError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => NetworkError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if (*status_code == 403 || *status_code == 409) && is_not_attached(message) => {
            NetworkError::NotConnected(message.clone())
        }
        _ => NetworkError::Runtime(e.to_string()),
    }
}

fn is_already_attached(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("already exists") || message.contains("already attached")
}

fn is_not_attached(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("not connected") || message.contains("is not attached")
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Supports both Docker and Podman via Docker-compatible API.
/// The client handle is cheap to clone and carries no state this crate
/// depends on, so one instance is shared by every component.
#[derive(Clone)]
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
        }
    }

    /// Connect to a container runtime using a detected socket.
    ///
    /// Use with `detect_local()` to find the socket.
    pub fn connect(endpoint: &RuntimeEndpoint) -> Result<Self, RuntimeInfoError> {
        let client = Docker::connect_with_unix(
            &endpoint.socket_path,
            CLIENT_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client, endpoint.runtime_type))
    }

    /// Get the runtime type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }
}

// Implement Sealed trait to allow runtime trait implementations
impl Sealed for BollardRuntime {}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        let name = match self.runtime_type {
            RuntimeType::Docker => "Docker".to_string(),
            RuntimeType::Podman => "Podman".to_string(),
        };

        Ok(RuntimeMetadata {
            name,
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let state = details
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(|s| match s {
                ContainerStateStatusEnum::CREATED => ContainerState::Created,
                ContainerStateStatusEnum::RUNNING => ContainerState::Running,
                ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
                ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
                ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
                ContainerStateStatusEnum::EXITED => ContainerState::Exited,
                ContainerStateStatusEnum::DEAD => ContainerState::Dead,
                _ => ContainerState::Exited,
            })
            .unwrap_or(ContainerState::Exited);

        let mut network_settings = NetworkSettings::default();
        if let Some(settings) = details.network_settings {
            for (name, endpoint) in settings.networks.unwrap_or_default() {
                network_settings.networks.insert(
                    name,
                    EndpointInfo {
                        network_id: endpoint.network_id.unwrap_or_default(),
                        ip_address: endpoint.ip_address.unwrap_or_default(),
                        gateway: endpoint.gateway.unwrap_or_default(),
                    },
                );
            }
            for (container_port, bindings) in settings.ports.unwrap_or_default() {
                match bindings {
                    Some(bindings) if !bindings.is_empty() => {
                        for binding in bindings {
                            network_settings.ports.push(PortBinding {
                                container_port: container_port.clone(),
                                host_ip: binding.host_ip,
                                host_port: binding.host_port,
                            });
                        }
                    }
                    _ => network_settings.ports.push(PortBinding {
                        container_port,
                        host_ip: None,
                        host_port: None,
                    }),
                }
            }
            network_settings
                .ports
                .sort_by(|a, b| a.container_port.cmp(&b.container_port));
        }

        let (env, labels) = details
            .config
            .map(|c| (c.env.unwrap_or_default(), c.labels.unwrap_or_default()))
            .unwrap_or_default();

        Ok(ContainerInfo {
            id: details.id.map(ContainerId::new).unwrap_or_else(|| id.clone()),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            state,
            env,
            labels,
            network_settings,
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();

        if let Some(ref name) = filters.name {
            filter_map.insert("name".to_string(), vec![name.clone()]);
        }

        if let Some(ref network) = filters.network {
            filter_map.insert("network".to_string(), vec![network.to_string()]);
        }

        for (key, value) in &filters.labels {
            filter_map
                .entry("label".to_string())
                .or_default()
                .push(format!("{}={}", key, value));
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: Some(filter_map),
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(opts))
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;

        Ok(containers
            .into_iter()
            .map(|c| {
                let name = c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();

                ContainerSummary {
                    id: ContainerId::new(c.id.unwrap_or_default()),
                    name,
                    state: c.state.map(|s| s.to_string()).unwrap_or_default(),
                    labels: c.labels.unwrap_or_default(),
                }
            })
            .collect())
    }
}

#[async_trait]
impl NetworkOps for BollardRuntime {
    async fn list_networks(
        &self,
        filters: &NetworkFilters,
    ) -> Result<Vec<NetworkSummary>, NetworkError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(ref driver) = filters.driver {
            filter_map.insert("driver".to_string(), vec![driver.clone()]);
        }
        if let Some(ref name) = filters.name {
            filter_map.insert("name".to_string(), vec![name.clone()]);
        }

        let opts = ListNetworksOptions {
            filters: Some(filter_map),
        };

        let networks = self
            .client
            .list_networks(Some(opts))
            .await
            .map_err(|e| NetworkError::Runtime(e.to_string()))?;

        Ok(networks
            .into_iter()
            .filter_map(|n| {
                // A network without an ID cannot be addressed; skip it.
                let id = n.id?;
                Some(NetworkSummary {
                    id: NetworkId::new(id),
                    name: n.name.unwrap_or_default(),
                    driver: n.driver.unwrap_or_default(),
                    options: n.options.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn inspect_network(&self, id: &NetworkId) -> Result<NetworkDetails, NetworkError> {
        let network = self
            .client
            .inspect_network(id.as_str(), None::<InspectNetworkOptions>)
            .await
            .map_err(map_network_inspect_error)?;

        let containers = network
            .containers
            .unwrap_or_default()
            .into_iter()
            .map(|(container_id, endpoint)| (container_id, endpoint.name.unwrap_or_default()))
            .collect();

        Ok(NetworkDetails {
            id: network.id.map(NetworkId::new).unwrap_or_else(|| id.clone()),
            name: network.name.unwrap_or_default(),
            driver: network.driver.unwrap_or_default(),
            options: network.options.unwrap_or_default(),
            containers,
        })
    }

    async fn connect_to_network(
        &self,
        container: &ContainerId,
        network: &NetworkId,
    ) -> Result<(), NetworkError> {
        let config = NetworkConnectRequest {
            container: container.to_string(),
            endpoint_config: None,
        };

        self.client
            .connect_network(network.as_str(), config)
            .await
            .map_err(map_network_connect_error)
    }

    async fn disconnect_from_network(
        &self,
        container: &ContainerId,
        network: &NetworkId,
        force: bool,
    ) -> Result<(), NetworkError> {
        let config = NetworkDisconnectRequest {
            container: container.to_string(),
            force: Some(force),
        };

        self.client
            .disconnect_network(network.as_str(), config)
            .await
            .map_err(map_network_disconnect_error)
    }
}

#[async_trait]
impl EventOps for BollardRuntime {
    async fn container_events(&self, filter: &EventFilter) -> Result<EventStream, EventError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();
        filter_map.insert("type".to_string(), vec!["container".to_string()]);
        filter_map.insert(
            "event".to_string(),
            filter
                .actions
                .iter()
                .map(|a| a.as_str().to_string())
                .collect(),
        );

        let opts = EventsOptions {
            filters: Some(filter_map),
            ..Default::default()
        };

        let filter = filter.clone();
        let stream = self.client.events(Some(opts));

        // The daemon filters server-side; the local check keeps Podman,
        // which ignores some filter keys, from leaking other actions.
        let mapped_stream = stream.filter_map(move |result| {
            let mapped = match result {
                Ok(message) => {
                    let action = ContainerAction::parse(message.action.as_deref().unwrap_or(""));
                    let actor = message.actor.unwrap_or_default();
                    match actor.id {
                        Some(id) if filter.accepts(&action) => Some(Ok(ContainerEvent {
                            action,
                            actor: ContainerId::new(id),
                            name: actor
                                .attributes
                                .and_then(|mut attrs| attrs.remove("name")),
                        })),
                        _ => None,
                    }
                }
                Err(e) => Some(Err(EventError::Stream(e.to_string()))),
            };
            futures::future::ready(mapped)
        });

        Ok(Box::pin(mapped_stream))
    }
}
