// ABOUTME: Manageability predicate for containers the proxy should route to.
// ABOUTME: Checks the host-routing env marker and the routing label namespace.

use serde::Deserialize;
use std::collections::HashMap;

use crate::runtime::{ContainerError, ContainerFilters, ContainerOps};
use crate::types::NetworkId;

use super::inventory::ContainerIdentity;

/// Decides whether a container advertises itself for routing.
///
/// Evaluated from live metadata every time; nothing is cached.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Classifier {
    /// Environment variable whose non-empty value marks a routable host.
    pub env: String,
    /// Label namespace carrying routing configuration.
    pub label_prefix: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            env: "VIRTUAL_HOST".to_string(),
            label_prefix: "traefik.".to_string(),
        }
    }
}

impl Classifier {
    pub fn is_manageable(&self, env: &[String], labels: &HashMap<String, String>) -> bool {
        self.has_env_marker(env) || self.has_routing_label(labels)
    }

    fn has_env_marker(&self, env: &[String]) -> bool {
        env.iter().any(|entry| match entry.split_once('=') {
            Some((key, value)) => key == self.env && !value.is_empty(),
            None => false,
        })
    }

    fn has_routing_label(&self, labels: &HashMap<String, String>) -> bool {
        !self.label_prefix.is_empty() && labels.keys().any(|k| k.starts_with(&self.label_prefix))
    }
}

/// Whether any running container on `network`, other than `exclude`, is manageable.
///
/// Stops at the first match. Containers that vanish between listing and
/// inspection are ignored.
///
/// # Errors
///
/// Returns the runtime error if listing fails or a member cannot be inspected.
pub async fn network_has_manageable_member<R: ContainerOps>(
    runtime: &R,
    classifier: &Classifier,
    network: &NetworkId,
    exclude: &ContainerIdentity,
) -> Result<bool, ContainerError> {
    let members = runtime
        .list_containers(&ContainerFilters::running_on(network))
        .await?;

    for member in members {
        if exclude.is(member.id.as_str(), &member.name) {
            continue;
        }
        let info = match runtime.inspect_container(&member.id).await {
            Ok(info) => info,
            Err(ContainerError::NotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        if !info.is_running() {
            continue;
        }
        if classifier.is_manageable(&info.env, &info.labels) {
            tracing::debug!(
                network = %network,
                container = %member.name,
                "found manageable member"
            );
            return Ok(true);
        }
    }

    Ok(false)
}
