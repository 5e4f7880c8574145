// ABOUTME: Container and network inventory queried fresh from the runtime.
// ABOUTME: Captures membership snapshots and discovers manageable bridge networks.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::{ContainerOps, NetworkDetails, NetworkFilters, NetworkOps, PortBinding};
use crate::types::{ContainerId, NetworkDriver, NetworkId, NetworkRef, NetworkSet};

use super::classifier::{Classifier, network_has_manageable_member};
use super::error::{InspectErrorExt, ReconcileError};

/// One edge between the managed container and a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkMembership {
    pub network_id: NetworkId,
    pub network_name: String,
    /// The container's address on the network; empty if unassigned.
    pub ip_address: String,
    /// The network's gateway; empty if the network has none.
    pub gateway: String,
}

impl NetworkMembership {
    pub fn has_gateway(&self) -> bool {
        !self.gateway.is_empty()
    }

    /// Both a gateway and an assigned address.
    pub fn is_routable(&self) -> bool {
        self.has_gateway() && !self.ip_address.is_empty()
    }
}

/// The managed container, as resolved by inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerIdentity {
    pub id: ContainerId,
    pub name: String,
}

impl ContainerIdentity {
    /// Whether a container reported by the runtime is this one.
    pub fn is(&self, id: &str, name: &str) -> bool {
        let name = name.trim_start_matches('/');
        self.id.matches(id) || (!name.is_empty() && name == self.name)
    }
}

/// Snapshot of the managed container's networking. Never updated in place;
/// every check captures a new one.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerNetworkState {
    pub container: ContainerIdentity,
    memberships: BTreeMap<NetworkId, NetworkMembership>,
    pub ports: Vec<PortBinding>,
}

impl ContainerNetworkState {
    pub fn container_id(&self) -> &ContainerId {
        &self.container.id
    }

    pub fn memberships(&self) -> impl Iterator<Item = &NetworkMembership> {
        self.memberships.values()
    }

    pub fn membership(&self, network: &NetworkId) -> Option<&NetworkMembership> {
        self.memberships.get(network).or_else(|| {
            self.memberships
                .values()
                .find(|m| m.network_id.matches(network.as_str()))
        })
    }

    pub fn is_member(&self, network: &NetworkId) -> bool {
        self.membership(network).is_some()
    }

    /// True iff at least one membership has a gateway.
    pub fn has_external(&self) -> bool {
        self.memberships.values().any(NetworkMembership::has_gateway)
    }

    /// True iff at least one membership has both a gateway and an address.
    pub fn has_connectivity(&self) -> bool {
        self.memberships.values().any(NetworkMembership::is_routable)
    }

    /// Whether removing `network` would leave no gateway-bearing membership.
    pub fn is_last_gateway(&self, network: &NetworkId) -> bool {
        let Some(target) = self.membership(network) else {
            return false;
        };
        target.has_gateway()
            && !self
                .memberships
                .values()
                .any(|m| m.network_id != target.network_id && m.has_gateway())
    }

    /// Memberships restricted to the given networks, as a set.
    pub fn member_networks(&self, candidates: &NetworkSet) -> NetworkSet {
        candidates
            .iter()
            .filter(|n| self.is_member(&n.id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct StateBuilder {
    memberships: BTreeMap<NetworkId, NetworkMembership>,
}

#[cfg(test)]
impl StateBuilder {
    pub(crate) fn member(mut self, id: &str, ip: &str, gateway: &str) -> Self {
        let network_id = NetworkId::new(id);
        self.memberships.insert(
            network_id.clone(),
            NetworkMembership {
                network_id,
                network_name: id.to_string(),
                ip_address: ip.to_string(),
                gateway: gateway.to_string(),
            },
        );
        self
    }

    pub(crate) fn build(self, container: &str) -> ContainerNetworkState {
        ContainerNetworkState {
            container: ContainerIdentity {
                id: ContainerId::new(container),
                name: container.to_string(),
            },
            memberships: self.memberships,
            ports: Vec::new(),
        }
    }
}

/// Capture the container's current network state with a single inspection.
///
/// # Errors
///
/// Returns `ReconcileError::Inspect` if the container is missing or the
/// runtime is unreachable. No retries happen here.
pub async fn capture_state<R: ContainerOps>(
    runtime: &R,
    container: &ContainerId,
) -> Result<ContainerNetworkState, ReconcileError> {
    let info = runtime
        .inspect_container(container)
        .await
        .inspecting(container)?;

    let memberships = info
        .network_settings
        .networks
        .into_iter()
        .map(|(name, endpoint)| {
            // Some runtimes omit the endpoint's network ID; the name still
            // addresses the network.
            let network_id = if endpoint.network_id.is_empty() {
                NetworkId::new(name.clone())
            } else {
                NetworkId::new(endpoint.network_id)
            };
            (
                network_id.clone(),
                NetworkMembership {
                    network_id,
                    network_name: name,
                    ip_address: endpoint.ip_address,
                    gateway: endpoint.gateway,
                },
            )
        })
        .collect();

    Ok(ContainerNetworkState {
        container: ContainerIdentity {
            id: info.id,
            name: info.name,
        },
        memberships,
        ports: info.network_settings.ports,
    })
}

/// How discovery decides that a bridge network hosts manageable workloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStrategy {
    /// Inspect every running member and apply the manageability predicate.
    #[default]
    Members,
    /// Accept any network shared with another container.
    Topology,
}

/// How the platform default bridge is recognized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DefaultBridge {
    /// Network name, `bridge` on Docker.
    pub name: String,
    /// Driver option set to `true` on the default network.
    pub option: String,
}

impl Default for DefaultBridge {
    fn default() -> Self {
        Self {
            name: "bridge".to_string(),
            option: "com.docker.network.bridge.default_bridge".to_string(),
        }
    }
}

impl DefaultBridge {
    /// Name match or option flag; runtimes expose one or the other.
    pub fn matches(&self, name: &str, options: &HashMap<String, String>) -> bool {
        (!self.name.is_empty() && name == self.name)
            || options
                .get(&self.option)
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// A bridge network as listed, with the driver options needed to spot the default.
#[derive(Debug, Clone)]
pub struct BridgeNetwork {
    pub network: NetworkRef,
    pub options: HashMap<String, String>,
}

/// List all bridge-driver networks, sorted by ID.
pub async fn list_bridge_networks<R: NetworkOps>(
    runtime: &R,
) -> Result<Vec<BridgeNetwork>, ReconcileError> {
    let mut networks: Vec<BridgeNetwork> = runtime
        .list_networks(&NetworkFilters::bridges())
        .await
        .inspecting("list")?
        .into_iter()
        .map(|n| BridgeNetwork {
            network: NetworkRef::new(n.id, n.name, NetworkDriver::parse(&n.driver)),
            options: n.options,
        })
        // The driver filter is a hint to the daemon; enforce it here.
        .filter(|n| n.network.driver.is_bridge())
        .collect();
    networks.sort_by(|a, b| a.network.id.cmp(&b.network.id));
    Ok(networks)
}

/// Identify the default bridge among listed networks.
pub fn find_default_bridge(
    networks: &[BridgeNetwork],
    matcher: &DefaultBridge,
) -> Option<NetworkRef> {
    networks
        .iter()
        .find(|n| matcher.matches(&n.network.name, &n.options))
        .map(|n| n.network.clone())
}

/// Identify the default bridge, inspecting each network when the listing
/// does not carry the marker.
///
/// Some runtimes only report driver options on inspect. A network that
/// cannot be inspected is passed over.
pub async fn detect_default_bridge<R: NetworkOps>(
    runtime: &R,
    networks: &[BridgeNetwork],
    matcher: &DefaultBridge,
) -> Option<NetworkRef> {
    if let Some(found) = find_default_bridge(networks, matcher) {
        return Some(found);
    }
    for bridge in networks {
        match runtime.inspect_network(&bridge.network.id).await {
            Ok(details) if matcher.matches(&details.name, &details.options) => {
                return Some(bridge.network.clone());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(network = %bridge.network, error = %e, "inspect failed");
            }
        }
    }
    None
}

/// Settings that shape discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub strategy: DiscoveryStrategy,
    pub classifier: Classifier,
    pub default_bridge: DefaultBridge,
}

/// Result of scanning bridge networks.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Every bridge network listed.
    pub bridges: NetworkSet,
    /// Networks the container should belong to.
    pub manageable: NetworkSet,
    /// Networks whose status is unknown because inspection failed.
    pub skipped: NetworkSet,
    pub default_bridge: Option<NetworkRef>,
}

/// Find the bridge networks the container should be connected to.
///
/// Includes the default bridge unconditionally. Other networks are judged by
/// the configured strategy. A network that cannot be inspected is recorded
/// as skipped and left out; that never fails the scan.
///
/// # Errors
///
/// Returns `ReconcileError::Inspect` only if the network list itself
/// cannot be fetched.
pub async fn list_manageable_bridge_networks<R: ContainerOps + NetworkOps>(
    runtime: &R,
    container: &ContainerIdentity,
    options: &DiscoveryOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Discovery, ReconcileError> {
    let listed = list_bridge_networks(runtime).await?;
    let mut discovery = Discovery {
        bridges: listed.iter().map(|n| n.network.clone()).collect(),
        default_bridge: find_default_bridge(&listed, &options.default_bridge),
        ..Default::default()
    };

    for bridge in listed {
        let network = bridge.network;
        let details = match runtime.inspect_network(&network.id).await {
            Ok(details) => details,
            Err(e) => {
                diagnostics.warn(Warning::network_skipped(format!(
                    "skipping network {}: {}",
                    network, e
                )));
                discovery.skipped.insert(network);
                continue;
            }
        };

        if discovery.default_bridge.is_none()
            && options.default_bridge.matches(&details.name, &details.options)
        {
            discovery.default_bridge = Some(network.clone());
        }

        let include = if discovery
            .default_bridge
            .as_ref()
            .is_some_and(|d| d.id == network.id)
        {
            true
        } else {
            match options.strategy {
                DiscoveryStrategy::Topology => is_shared(&details, container),
                DiscoveryStrategy::Members => {
                    match network_has_manageable_member(
                        runtime,
                        &options.classifier,
                        &network.id,
                        container,
                    )
                    .await
                    {
                        Ok(found) => found,
                        Err(e) => {
                            tracing::debug!(
                                network = %network,
                                error = %e,
                                "member inspection failed, judging by topology"
                            );
                            is_shared(&details, container)
                        }
                    }
                }
            }
        };

        tracing::debug!(
            network = %network,
            include,
            strategy = ?options.strategy,
            "classified network"
        );
        if include {
            discovery.manageable.insert(network);
        }
    }

    Ok(discovery)
}

/// Topology heuristic: more than one member, or exactly one that isn't us.
fn is_shared(details: &NetworkDetails, container: &ContainerIdentity) -> bool {
    match details.containers.len() {
        0 => false,
        1 => details
            .containers
            .iter()
            .all(|(id, name)| !container.is(id, name)),
        _ => true,
    }
}
