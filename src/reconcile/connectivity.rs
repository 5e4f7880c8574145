// ABOUTME: Connectivity gate run after every network change.
// ABOUTME: A container is reachable if some membership has a gateway and an address.

use crate::runtime::ContainerOps;
use crate::types::ContainerId;

use super::error::ReconcileError;
use super::inventory::capture_state;

/// Fresh inspection; true iff at least one membership carries both a
/// gateway and an assigned IP.
pub async fn has_connectivity<R: ContainerOps>(
    runtime: &R,
    container: &ContainerId,
) -> Result<bool, ReconcileError> {
    let state = capture_state(runtime, container).await?;
    Ok(state.has_connectivity())
}
