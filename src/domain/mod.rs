//! Domain layer: identifiers, peer descriptors, workspaces, and the VNI
//! pool interface.
//!
//! Nothing here performs I/O; these are the values the transport and
//! service layers pass around.

pub mod channel_id;
pub mod model;
pub mod vni;
pub mod workspace;

pub use channel_id::ChannelId;
pub use model::{
    Dataplane, DataplaneSource, NetworkServiceEndpoint, NetworkServiceManager, NseRegistration,
};
pub use vni::{Vni, VniAllocator};
pub use workspace::{InMemoryWorkspaceDirectory, Workspace, WorkspaceDirectory, WorkspaceLayout};
