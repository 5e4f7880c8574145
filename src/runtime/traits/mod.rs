// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ContainerOps, NetworkOps, EventOps, RuntimeInfo and FullRuntime.

mod container;
mod events;
mod network;
mod runtime_info;
pub(crate) mod sealed;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use events::{
    ContainerAction, ContainerEvent, EventError, EventFilter, EventOps, EventStream,
};
pub use network::{NetworkError, NetworkFilters, NetworkOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Everything the controller needs from a runtime.
pub trait FullRuntime: ContainerOps + NetworkOps + EventOps + RuntimeInfo {}

impl<T> FullRuntime for T where T: ContainerOps + NetworkOps + EventOps + RuntimeInfo {}
