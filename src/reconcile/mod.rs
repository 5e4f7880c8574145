// ABOUTME: Network membership reconciliation using the type state pattern.
// ABOUTME: Inventory, classification, planning and the transactional executor.

mod classifier;
mod connectivity;
mod error;
mod executor;
mod inventory;
mod pass;
mod plan;
mod retry;
mod state;
mod transaction;
mod undo;

pub use classifier::{Classifier, network_has_manageable_member};
pub use connectivity::has_connectivity;
pub use error::{ConnectivityStage, InspectErrorExt, ReconcileError, ReconcileErrorKind};
pub use executor::{Executor, PassReport};
pub use inventory::{
    BridgeNetwork, ContainerIdentity, ContainerNetworkState, DefaultBridge, Discovery,
    DiscoveryOptions, DiscoveryStrategy, NetworkMembership, capture_state, detect_default_bridge,
    find_default_bridge, list_bridge_networks, list_manageable_bridge_networks,
};
#[cfg(test)]
pub(crate) use inventory::StateBuilder;
pub use pass::{PlannedPass, ReconcileSettings, Reconciler};
pub use plan::{OperationPlan, build_plan, build_prune_plan, plan_join, plan_leave};
pub use retry::{RetryError, RetryPolicy};
pub(crate) use retry::sleep_or_cancel;
pub use state::{Committed, Joined, Left, PassPhase, Planned};
pub use transaction::{Transaction, TransitionResult};
pub use undo::{CompensatingAction, UndoStack};
