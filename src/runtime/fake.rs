// ABOUTME: In-memory runtime used by unit tests in place of a daemon.
// ABOUTME: Records network calls and supports failure and connectivity-loss injection.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    ContainerAction, ContainerError, ContainerEvent, ContainerFilters, ContainerInfo,
    ContainerOps, ContainerState, ContainerSummary, EndpointInfo, EventError, EventFilter,
    EventOps, EventStream, NetworkDetails, NetworkError, NetworkFilters, NetworkOps,
    NetworkSettings, NetworkSummary, PortBinding, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::types::{ContainerId, NetworkId};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// A network call issued against the fake, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Connect(String),
    Disconnect(String),
}

/// A step in a scripted event stream.
#[derive(Debug, Clone)]
pub(crate) enum ScriptStep {
    /// Mark the container running, attach it to its declared networks, emit `start`.
    Start(String),
    /// Detach the container from all networks, mark it stopped, emit `die`.
    Die(String),
    /// Yield a transport error.
    Fail(String),
}

#[derive(Debug, Clone)]
pub(crate) struct FakeContainer {
    id: String,
    name: String,
    running: bool,
    env: Vec<String>,
    labels: HashMap<String, String>,
    ports: Vec<PortBinding>,
    networks: Vec<String>,
}

impl FakeContainer {
    pub(crate) fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            running: true,
            env: Vec::new(),
            labels: HashMap::new(),
            ports: Vec::new(),
            networks: Vec::new(),
        }
    }

    pub(crate) fn env(mut self, entry: &str) -> Self {
        self.env.push(entry.to_string());
        self
    }

    pub(crate) fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub(crate) fn port(mut self, container_port: &str, host_port: &str) -> Self {
        self.ports.push(PortBinding {
            container_port: container_port.to_string(),
            host_ip: Some("0.0.0.0".to_string()),
            host_port: Some(host_port.to_string()),
        });
        self
    }

    /// Networks the container is attached to while running.
    pub(crate) fn on(mut self, networks: &[&str]) -> Self {
        self.networks = networks.iter().map(|n| n.to_string()).collect();
        self
    }

    pub(crate) fn stopped(mut self) -> Self {
        self.running = false;
        self
    }
}

#[derive(Debug, Clone)]
struct FakeNetwork {
    name: String,
    driver: String,
    options: HashMap<String, String>,
    /// Options reported by inspect but missing from listings.
    inspect_options: HashMap<String, String>,
    has_gateway: bool,
    index: usize,
    next_host: u32,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Times(u32),
    Always,
}

impl Failure {
    /// Consume one failure; returns whether this attempt fails.
    fn take(&mut self) -> bool {
        match self {
            Failure::Always => true,
            Failure::Times(0) => false,
            Failure::Times(n) => {
                *n -= 1;
                true
            }
        }
    }
}

#[derive(Default)]
struct FakeState {
    containers: BTreeMap<String, FakeContainer>,
    networks: BTreeMap<String, FakeNetwork>,
    /// (container id, network id) -> assigned IP.
    endpoints: BTreeMap<(String, String), String>,
    calls: Vec<Call>,
    connect_failures: HashMap<String, Failure>,
    disconnect_failures: HashMap<String, Failure>,
    failing_network_inspects: Vec<String>,
    failing_container_inspects: Vec<String>,
    /// Container inspection starts failing once this call succeeds.
    break_inspect_on: Option<Call>,
    inspect_broken: bool,
    /// Gateways vanish after this call succeeds and return after its inverse.
    lose_connectivity_on: Option<Call>,
    connectivity_lost: bool,
    scripts: VecDeque<Vec<ScriptStep>>,
    subscribe_failures: u32,
    subscriptions: u32,
}

impl FakeState {
    fn resolve_container(&self, key: &str) -> Option<String> {
        self.containers
            .values()
            .find(|c| c.id == key || c.name == key || (key.len() >= 12 && c.id.starts_with(key)))
            .map(|c| c.id.clone())
    }

    fn attach(&mut self, container: &str, network: &str) {
        let Some(net) = self.networks.get_mut(network) else {
            return;
        };
        net.next_host += 1;
        let ip = format!("172.{}.0.{}", 18 + net.index, net.next_host);
        self.endpoints
            .insert((container.to_string(), network.to_string()), ip);
    }

    fn gateway_of(&self, network: &str) -> String {
        match self.networks.get(network) {
            Some(net) if net.has_gateway && !self.connectivity_lost => {
                format!("172.{}.0.1", 18 + net.index)
            }
            _ => String::new(),
        }
    }

    fn record_success(&mut self, call: Call) {
        let inverse = match &call {
            Call::Connect(n) => Call::Disconnect(n.clone()),
            Call::Disconnect(n) => Call::Connect(n.clone()),
        };
        if self.break_inspect_on.as_ref() == Some(&call) {
            self.inspect_broken = true;
        }
        match &self.lose_connectivity_on {
            Some(trigger) if *trigger == call => self.connectivity_lost = true,
            Some(trigger) if *trigger == inverse && self.connectivity_lost => {
                self.connectivity_lost = false;
                self.lose_connectivity_on = None;
            }
            _ => {}
        }
    }

    fn apply(&mut self, step: &ScriptStep) -> Option<Result<ContainerEvent, EventError>> {
        match step {
            ScriptStep::Start(key) => {
                let id = self.resolve_container(key)?;
                let (name, networks) = {
                    let c = self.containers.get_mut(&id)?;
                    c.running = true;
                    (c.name.clone(), c.networks.clone())
                };
                for network in networks {
                    self.attach(&id, &network);
                }
                Some(Ok(ContainerEvent {
                    action: ContainerAction::Start,
                    actor: ContainerId::new(id),
                    name: Some(name),
                }))
            }
            ScriptStep::Die(key) => {
                let id = self.resolve_container(key)?;
                let name = {
                    let c = self.containers.get_mut(&id)?;
                    c.running = false;
                    c.name.clone()
                };
                self.endpoints.retain(|(c, _), _| *c != id);
                Some(Ok(ContainerEvent {
                    action: ContainerAction::Die,
                    actor: ContainerId::new(id),
                    name: Some(name),
                }))
            }
            ScriptStep::Fail(message) => Some(Err(EventError::Stream(message.clone()))),
        }
    }
}

/// Shared in-memory daemon. Clones observe the same state.
#[derive(Clone, Default)]
pub(crate) struct FakeRuntime {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeRuntime {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap()
    }

    fn add_network(self, id: &str, name: &str, driver: &str, has_gateway: bool) -> Self {
        {
            let mut state = self.state();
            let index = state.networks.len();
            state.networks.insert(
                id.to_string(),
                FakeNetwork {
                    name: name.to_string(),
                    driver: driver.to_string(),
                    options: HashMap::new(),
                    inspect_options: HashMap::new(),
                    has_gateway,
                    index,
                    next_host: 1,
                },
            );
        }
        self
    }

    /// A bridge network with a gateway.
    pub(crate) fn with_network(self, id: &str, name: &str) -> Self {
        self.add_network(id, name, "bridge", true)
    }

    /// A bridge network without a gateway (`--internal`).
    pub(crate) fn with_internal_network(self, id: &str, name: &str) -> Self {
        self.add_network(id, name, "bridge", false)
    }

    pub(crate) fn with_driver_network(self, id: &str, name: &str, driver: &str) -> Self {
        self.add_network(id, name, driver, true)
    }

    /// The platform default bridge, named `bridge`.
    pub(crate) fn with_default_bridge(self, id: &str) -> Self {
        self.with_network(id, "bridge")
    }

    pub(crate) fn with_network_option(self, id: &str, key: &str, value: &str) -> Self {
        if let Some(net) = self.state().networks.get_mut(id) {
            net.options.insert(key.to_string(), value.to_string());
        }
        self
    }

    /// Set an option that only network inspection reports.
    pub(crate) fn with_inspect_option(self, id: &str, key: &str, value: &str) -> Self {
        if let Some(net) = self.state().networks.get_mut(id) {
            net.inspect_options.insert(key.to_string(), value.to_string());
        }
        self
    }

    /// Add a container; running containers are attached to their networks.
    pub(crate) fn with_container(self, container: FakeContainer) -> Self {
        {
            let mut state = self.state();
            let id = container.id.clone();
            let attach = if container.running {
                container.networks.clone()
            } else {
                Vec::new()
            };
            state.containers.insert(id.clone(), container);
            for network in attach {
                state.attach(&id, &network);
            }
        }
        self
    }

    /// Fail connects to `network`; `None` fails every attempt.
    pub(crate) fn fail_connect(self, network: &str, times: Option<u32>) -> Self {
        let failure = times.map(Failure::Times).unwrap_or(Failure::Always);
        self.state()
            .connect_failures
            .insert(network.to_string(), failure);
        self
    }

    pub(crate) fn fail_disconnect(self, network: &str, times: Option<u32>) -> Self {
        let failure = times.map(Failure::Times).unwrap_or(Failure::Always);
        self.state()
            .disconnect_failures
            .insert(network.to_string(), failure);
        self
    }

    pub(crate) fn fail_network_inspect(self, network: &str) -> Self {
        self.state()
            .failing_network_inspects
            .push(network.to_string());
        self
    }

    pub(crate) fn fail_container_inspect(self, container: &str) -> Self {
        self.state()
            .failing_container_inspects
            .push(container.to_string());
        self
    }

    /// Fail every container inspection once `call` succeeds.
    pub(crate) fn fail_container_inspect_after(self, call: Call) -> Self {
        self.state().break_inspect_on = Some(call);
        self
    }

    /// Drop every gateway once `call` succeeds; the inverse call restores them.
    pub(crate) fn lose_connectivity_after(self, call: Call) -> Self {
        self.state().lose_connectivity_on = Some(call);
        self
    }

    /// Queue an event stream for the next subscription. Once the queue is
    /// drained, subscriptions stay open without yielding.
    pub(crate) fn script_events(self, steps: Vec<ScriptStep>) -> Self {
        self.state().scripts.push_back(steps);
        self
    }

    pub(crate) fn fail_subscribe(self, times: u32) -> Self {
        self.state().subscribe_failures = times;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub(crate) fn subscriptions(&self) -> u32 {
        self.state().subscriptions
    }

    /// IDs of the networks `container` is attached to, sorted.
    pub(crate) fn networks_of(&self, container: &str) -> Vec<String> {
        let state = self.state();
        let Some(id) = state.resolve_container(container) else {
            return Vec::new();
        };
        state
            .endpoints
            .keys()
            .filter(|(c, _)| *c == id)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

impl Sealed for FakeRuntime {}

#[async_trait]
impl RuntimeInfo for FakeRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        Ok(RuntimeMetadata {
            name: "Fake".to_string(),
            version: "0.0.0".to_string(),
            api_version: "1.52".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let state = self.state();
        let resolved = state
            .resolve_container(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        let container = &state.containers[&resolved];
        if state.inspect_broken
            || state
                .failing_container_inspects
                .iter()
                .any(|c| *c == container.id || *c == container.name)
        {
            return Err(ContainerError::Runtime("injected inspect failure".to_string()));
        }

        let mut network_settings = NetworkSettings {
            ports: container.ports.clone(),
            ..Default::default()
        };
        for ((_, network_id), ip) in state.endpoints.iter().filter(|((c, _), _)| *c == resolved)
        {
            let net = &state.networks[network_id];
            network_settings.networks.insert(
                net.name.clone(),
                EndpointInfo {
                    network_id: network_id.clone(),
                    ip_address: ip.clone(),
                    gateway: state.gateway_of(network_id),
                },
            );
        }

        Ok(ContainerInfo {
            id: ContainerId::new(&container.id),
            name: container.name.clone(),
            state: if container.running {
                ContainerState::Running
            } else {
                ContainerState::Exited
            },
            env: container.env.clone(),
            labels: container.labels.clone(),
            network_settings,
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let state = self.state();
        Ok(state
            .containers
            .values()
            .filter(|c| filters.all || c.running)
            .filter(|c| filters.name.as_ref().is_none_or(|n| c.name.contains(n.as_str())))
            .filter(|c| {
                filters.network.as_ref().is_none_or(|n| {
                    state
                        .endpoints
                        .contains_key(&(c.id.clone(), n.as_str().to_string()))
                })
            })
            .filter(|c| {
                filters
                    .labels
                    .iter()
                    .all(|(k, v)| c.labels.get(k) == Some(v))
            })
            .map(|c| ContainerSummary {
                id: ContainerId::new(&c.id),
                name: c.name.clone(),
                state: if c.running { "running" } else { "exited" }.to_string(),
                labels: c.labels.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl NetworkOps for FakeRuntime {
    async fn list_networks(
        &self,
        filters: &NetworkFilters,
    ) -> Result<Vec<NetworkSummary>, NetworkError> {
        let state = self.state();
        Ok(state
            .networks
            .iter()
            .filter(|(_, n)| filters.driver.as_ref().is_none_or(|d| n.driver == *d))
            .filter(|(_, n)| filters.name.as_ref().is_none_or(|f| n.name.contains(f.as_str())))
            .map(|(id, n)| NetworkSummary {
                id: NetworkId::new(id),
                name: n.name.clone(),
                driver: n.driver.clone(),
                options: n.options.clone(),
            })
            .collect())
    }

    async fn inspect_network(&self, id: &NetworkId) -> Result<NetworkDetails, NetworkError> {
        let state = self.state();
        if state.failing_network_inspects.iter().any(|n| n == id.as_str()) {
            return Err(NetworkError::Runtime("injected inspect failure".to_string()));
        }
        let net = state
            .networks
            .get(id.as_str())
            .ok_or_else(|| NetworkError::NotFound(id.to_string()))?;
        let containers = state
            .endpoints
            .keys()
            .filter(|(_, n)| n == id.as_str())
            .map(|(c, _)| (c.clone(), state.containers[c].name.clone()))
            .collect();
        let mut options = net.options.clone();
        options.extend(net.inspect_options.clone());
        Ok(NetworkDetails {
            id: id.clone(),
            name: net.name.clone(),
            driver: net.driver.clone(),
            options,
            containers,
        })
    }

    async fn connect_to_network(
        &self,
        container: &ContainerId,
        network: &NetworkId,
    ) -> Result<(), NetworkError> {
        let mut state = self.state();
        state.calls.push(Call::Connect(network.to_string()));
        let id = state
            .resolve_container(container.as_str())
            .ok_or_else(|| NetworkError::ContainerNotFound(container.to_string()))?;
        if !state.networks.contains_key(network.as_str()) {
            return Err(NetworkError::NotFound(network.to_string()));
        }
        let injected = state
            .connect_failures
            .get_mut(network.as_str())
            .is_some_and(Failure::take);
        if injected {
            return Err(NetworkError::Runtime("injected connect failure".to_string()));
        }
        if state
            .endpoints
            .contains_key(&(id.clone(), network.to_string()))
        {
            return Err(NetworkError::AlreadyConnected(network.to_string()));
        }
        state.attach(&id, network.as_str());
        state.record_success(Call::Connect(network.to_string()));
        Ok(())
    }

    async fn disconnect_from_network(
        &self,
        container: &ContainerId,
        network: &NetworkId,
        _force: bool,
    ) -> Result<(), NetworkError> {
        let mut state = self.state();
        state.calls.push(Call::Disconnect(network.to_string()));
        let id = state
            .resolve_container(container.as_str())
            .ok_or_else(|| NetworkError::ContainerNotFound(container.to_string()))?;
        let injected = state
            .disconnect_failures
            .get_mut(network.as_str())
            .is_some_and(Failure::take);
        if injected {
            return Err(NetworkError::Runtime("injected disconnect failure".to_string()));
        }
        if state
            .endpoints
            .remove(&(id, network.to_string()))
            .is_none()
        {
            return Err(NetworkError::NotConnected(network.to_string()));
        }
        state.record_success(Call::Disconnect(network.to_string()));
        Ok(())
    }
}

#[async_trait]
impl EventOps for FakeRuntime {
    async fn container_events(&self, _filter: &EventFilter) -> Result<EventStream, EventError> {
        let script = {
            let mut state = self.state();
            state.subscriptions += 1;
            if state.subscribe_failures > 0 {
                state.subscribe_failures -= 1;
                return Err(EventError::Subscribe("injected subscribe failure".to_string()));
            }
            state.scripts.pop_front()
        };

        let Some(steps) = script else {
            return Ok(Box::pin(futures::stream::pending::<
                Result<ContainerEvent, EventError>,
            >()));
        };

        // Steps are applied lazily so state changes land when the event is read.
        let inner = Arc::clone(&self.inner);
        let stream = futures::stream::iter(steps).filter_map(move |step| {
            let event = inner.lock().unwrap().apply(&step);
            futures::future::ready(event)
        });
        Ok(Box::pin(stream))
    }
}
