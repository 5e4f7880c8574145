// ABOUTME: Desired-state calculation: which networks to join and which to leave.
// ABOUTME: The default bridge is never a leave candidate.

use serde::Serialize;

use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::{ContainerOps, NetworkOps};
use crate::types::{ContainerId, NetworkRef, NetworkSet};

use super::classifier::network_has_manageable_member;
use super::error::ReconcileError;
use super::inventory::{
    ContainerNetworkState, DiscoveryOptions, capture_state, detect_default_bridge,
    list_bridge_networks, list_manageable_bridge_networks,
};

/// Networks in `desired` the container is not yet a member of.
pub fn plan_join(current: &NetworkSet, desired: &NetworkSet) -> NetworkSet {
    desired.difference(current)
}

/// Networks in `current` that are not desired, never including the default bridge.
///
/// With `default_bridge` unknown the exclusion cannot be applied; callers
/// record a warning in that case.
pub fn plan_leave(
    current: &NetworkSet,
    desired: &NetworkSet,
    default_bridge: Option<&NetworkRef>,
) -> NetworkSet {
    let mut leave = current.difference(desired);
    if let Some(default) = default_bridge {
        leave.remove(&default.id);
    }
    leave
}

/// Everything one reconciliation pass will do, computed up front.
#[derive(Debug, Clone, Serialize)]
pub struct OperationPlan {
    pub container_id: ContainerId,
    pub to_join: NetworkSet,
    pub to_leave: NetworkSet,
    pub default_bridge: Option<NetworkRef>,
    pub original_state: ContainerNetworkState,
}

impl OperationPlan {
    pub fn is_empty(&self) -> bool {
        self.to_join.is_empty() && self.to_leave.is_empty()
    }
}

/// Capture state, discover manageable networks, and compute the full plan.
///
/// Networks skipped during discovery are never leave candidates: their
/// status is unknown, and leaving is only ever done on evidence.
pub async fn build_plan<R: ContainerOps + NetworkOps>(
    runtime: &R,
    container: &ContainerId,
    options: &DiscoveryOptions,
    diagnostics: &mut Diagnostics,
) -> Result<OperationPlan, ReconcileError> {
    let original_state = capture_state(runtime, container).await?;
    let discovery =
        list_manageable_bridge_networks(runtime, &original_state.container, options, diagnostics)
            .await?;

    if discovery.default_bridge.is_none() {
        diagnostics.warn(Warning::default_bridge_unknown(
            "default bridge not identified; planning without its protection",
        ));
    }

    let current = original_state.member_networks(&discovery.bridges);
    let to_join = plan_join(&current, &discovery.manageable);
    let mut to_leave = plan_leave(
        &current,
        &discovery.manageable,
        discovery.default_bridge.as_ref(),
    );
    for skipped in discovery.skipped.ids() {
        to_leave.remove(skipped);
    }

    tracing::debug!(
        current = current.len(),
        desired = discovery.manageable.len(),
        join = to_join.len(),
        leave = to_leave.len(),
        "planned pass"
    );

    Ok(OperationPlan {
        container_id: original_state.container_id().clone(),
        to_join,
        to_leave,
        default_bridge: discovery.default_bridge,
        original_state,
    })
}

/// Plan for a container death: leave every current bridge network, other
/// than the default, that no longer has a manageable member.
///
/// Never joins. A network whose members cannot be inspected is kept.
pub async fn build_prune_plan<R: ContainerOps + NetworkOps>(
    runtime: &R,
    container: &ContainerId,
    options: &DiscoveryOptions,
    diagnostics: &mut Diagnostics,
) -> Result<OperationPlan, ReconcileError> {
    let original_state = capture_state(runtime, container).await?;
    let bridges = list_bridge_networks(runtime).await?;
    let default_bridge = detect_default_bridge(runtime, &bridges, &options.default_bridge).await;
    if default_bridge.is_none() {
        diagnostics.warn(Warning::default_bridge_unknown(
            "default bridge not identified; pruning without its protection",
        ));
    }

    let bridges: NetworkSet = bridges.into_iter().map(|b| b.network).collect();
    let mut candidates = original_state.member_networks(&bridges);
    if let Some(default) = &default_bridge {
        candidates.remove(&default.id);
    }

    let mut desired = NetworkSet::new();
    for network in candidates.iter() {
        match network_has_manageable_member(
            runtime,
            &options.classifier,
            &network.id,
            &original_state.container,
        )
        .await
        {
            Ok(true) => {
                desired.insert(network.clone());
            }
            Ok(false) => {}
            Err(e) => {
                diagnostics.warn(Warning::network_skipped(format!(
                    "keeping network {}: {}",
                    network, e
                )));
                desired.insert(network.clone());
            }
        }
    }

    Ok(OperationPlan {
        container_id: original_state.container_id().clone(),
        to_join: NetworkSet::new(),
        to_leave: plan_leave(&candidates, &desired, default_bridge.as_ref()),
        default_bridge,
        original_state,
    })
}
