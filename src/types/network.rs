// ABOUTME: Network references and the ordered network set used for planning.
// ABOUTME: Sets are keyed by network ID so iteration order is deterministic.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::NetworkId;

/// Network driver kind as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NetworkDriver {
    Bridge,
    Other(String),
}

impl NetworkDriver {
    pub fn parse(driver: &str) -> Self {
        if driver.eq_ignore_ascii_case("bridge") {
            NetworkDriver::Bridge
        } else {
            NetworkDriver::Other(driver.to_string())
        }
    }

    pub fn is_bridge(&self) -> bool {
        matches!(self, NetworkDriver::Bridge)
    }
}

impl fmt::Display for NetworkDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkDriver::Bridge => write!(f, "bridge"),
            NetworkDriver::Other(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for NetworkDriver {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identifies a network. The ID is authoritative; the name is for logs only.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkRef {
    pub id: NetworkId,
    pub name: String,
    pub driver: NetworkDriver,
}

impl NetworkRef {
    pub fn new(id: NetworkId, name: impl Into<String>, driver: NetworkDriver) -> Self {
        Self {
            id,
            name: name.into(),
            driver,
        }
    }

    /// Shorthand for a bridge-driver network.
    pub fn bridge(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(NetworkId::new(id), name, NetworkDriver::Bridge)
    }
}

impl PartialEq for NetworkRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NetworkRef {}

impl fmt::Display for NetworkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}

/// A set of networks keyed by ID, iterated in ID order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSet {
    networks: BTreeMap<NetworkId, NetworkRef>,
}

impl NetworkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &NetworkId) -> bool {
        self.networks.contains_key(id)
    }

    /// Add a network. Returns false if a network with the same ID was
    /// already present (the existing entry is kept).
    pub fn insert(&mut self, network: NetworkRef) -> bool {
        if self.networks.contains_key(&network.id) {
            return false;
        }
        self.networks.insert(network.id.clone(), network);
        true
    }

    pub fn remove(&mut self, id: &NetworkId) -> Option<NetworkRef> {
        self.networks.remove(id)
    }

    pub fn get(&self, id: &NetworkId) -> Option<&NetworkRef> {
        self.networks.get(id)
    }

    /// Networks in `self` that are not in `other`.
    pub fn difference(&self, other: &NetworkSet) -> NetworkSet {
        self.networks
            .values()
            .filter(|n| !other.contains(&n.id))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkRef> {
        self.networks.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NetworkId> {
        self.networks.keys()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl FromIterator<NetworkRef> for NetworkSet {
    fn from_iter<I: IntoIterator<Item = NetworkRef>>(iter: I) -> Self {
        let mut set = NetworkSet::new();
        for network in iter {
            set.insert(network);
        }
        set
    }
}

impl IntoIterator for NetworkSet {
    type Item = NetworkRef;
    type IntoIter = std::collections::btree_map::IntoValues<NetworkId, NetworkRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.networks.into_values()
    }
}

impl Serialize for NetworkSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.networks.values())
    }
}

impl Extend<NetworkRef> for NetworkSet {
    fn extend<I: IntoIterator<Item = NetworkRef>>(&mut self, iter: I) {
        for network in iter {
            self.insert(network);
        }
    }
}
