// ABOUTME: Type-safe identifiers and network set types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;
mod network;

pub use id::{ContainerId, NetworkId};
pub use network::{NetworkDriver, NetworkRef, NetworkSet};
