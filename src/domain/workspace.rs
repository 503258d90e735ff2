//! Endpoint workspaces and the directory that resolves them.
//!
//! A [`Workspace`] is the per-endpoint filesystem namespace holding the
//! client- and server-facing sockets. [`WorkspaceLayout`] fixes where those
//! live on disk; [`WorkspaceDirectory`] maps an endpoint identity to its
//! workspace and is consulted read-only by the resolver.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Default root for workspaces and the control socket.
pub const DEFAULT_WORKSPACE_ROOT: &str = "/var/lib/networkservicemesh/";

/// File name of the server-facing socket inside a workspace.
pub const SERVER_SOCKET_NAME: &str = "nsm.server.io.sock";

/// File name of the client-facing socket inside a workspace.
pub const CLIENT_SOCKET_NAME: &str = "nsm.client.io.sock";

/// Resolved workspace metadata for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    name: String,
    base_dir: PathBuf,
    client_socket: PathBuf,
    server_socket: PathBuf,
}

impl Workspace {
    /// Logical workspace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the workspace sockets.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Socket the endpoint serves its local network-service API on.
    #[must_use]
    pub fn client_socket(&self) -> &Path {
        &self.client_socket
    }

    /// Socket the endpoint uses to reach the control plane.
    #[must_use]
    pub fn server_socket(&self) -> &Path {
        &self.server_socket
    }
}

/// On-disk conventions for workspaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: String,
    server_socket_name: String,
    client_socket_name: String,
}

impl WorkspaceLayout {
    /// Creates a layout rooted at `root`, which is normalised to end with `/`.
    #[must_use]
    pub fn new(root: &str) -> Self {
        let mut root = root.to_string();
        if !root.ends_with('/') {
            root.push('/');
        }
        Self {
            root,
            server_socket_name: SERVER_SOCKET_NAME.to_string(),
            client_socket_name: CLIENT_SOCKET_NAME.to_string(),
        }
    }

    /// Normalised root, always ending with `/`.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Base directory as seen from the host.
    #[must_use]
    pub fn host_base_dir(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }

    /// Base directory as seen from the control plane.
    #[must_use]
    pub fn nsm_base_dir(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }

    /// Base directory as seen from clients.
    #[must_use]
    pub fn client_base_dir(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }

    /// Server-facing socket file name.
    #[must_use]
    pub fn server_socket_name(&self) -> &str {
        &self.server_socket_name
    }

    /// Client-facing socket file name.
    #[must_use]
    pub fn client_socket_name(&self) -> &str {
        &self.client_socket_name
    }

    /// Builds the workspace named `name` under this layout.
    #[must_use]
    pub fn workspace(&self, name: &str) -> Workspace {
        let base_dir = self.nsm_base_dir().join(name);
        Workspace {
            name: name.to_string(),
            client_socket: base_dir.join(&self.client_socket_name),
            server_socket: base_dir.join(&self.server_socket_name),
            base_dir,
        }
    }
}

impl Default for WorkspaceLayout {
    fn default() -> Self {
        Self::new(DEFAULT_WORKSPACE_ROOT)
    }
}

/// Maps an endpoint identity to its workspace.
#[async_trait]
pub trait WorkspaceDirectory: Send + Sync + std::fmt::Debug {
    /// Returns the workspace for `endpoint_name`, if one is registered.
    async fn lookup(&self, endpoint_name: &str) -> Option<Workspace>;
}

/// In-process [`WorkspaceDirectory`] backed by a `RwLock<HashMap<...>>`.
///
/// Lookups take the read lock and may run concurrently; registration and
/// removal are serialized.
#[derive(Debug, Default)]
pub struct InMemoryWorkspaceDirectory {
    workspaces: RwLock<HashMap<String, Workspace>>,
}

impl InMemoryWorkspaceDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `endpoint_name` with `workspace`, returning any previous
    /// association.
    pub async fn register(&self, endpoint_name: &str, workspace: Workspace) -> Option<Workspace> {
        let mut map = self.workspaces.write().await;
        tracing::debug!(endpoint = endpoint_name, workspace = workspace.name(), "workspace registered");
        map.insert(endpoint_name.to_string(), workspace)
    }

    /// Removes the association for `endpoint_name`.
    pub async fn remove(&self, endpoint_name: &str) -> Option<Workspace> {
        self.workspaces.write().await.remove(endpoint_name)
    }

    /// Returns the number of registered endpoints.
    pub async fn len(&self) -> usize {
        self.workspaces.read().await.len()
    }

    /// Returns `true` if no endpoint is registered.
    pub async fn is_empty(&self) -> bool {
        self.workspaces.read().await.is_empty()
    }
}

#[async_trait]
impl WorkspaceDirectory for InMemoryWorkspaceDirectory {
    async fn lookup(&self, endpoint_name: &str) -> Option<Workspace> {
        self.workspaces.read().await.get(endpoint_name).cloned()
    }
}
