//! The broker, resolver, and workspace directory wired together from
//! configuration.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::BrokerConfig;
use crate::domain::{InMemoryWorkspaceDirectory, VniAllocator, WorkspaceDirectory, WorkspaceLayout};
use crate::service::{ConnectionBroker, PeerResolver};
use crate::transport::{Dialer, TransportDialer};

/// Everything a control-plane component needs to reach its peers.
///
/// Built once at startup and passed by value (it is cheap to clone) to
/// whoever needs it.
#[derive(Debug, Clone)]
pub struct Services {
    /// Shared registry connection.
    pub broker: ConnectionBroker,
    /// One-shot peer connections.
    pub resolver: PeerResolver,
    /// Endpoint workspaces known to this instance.
    pub directory: Arc<InMemoryWorkspaceDirectory>,
    /// On-disk workspace conventions.
    pub layout: WorkspaceLayout,
    /// Address published to other control-plane instances.
    pub public_api: String,
    /// Device-plugin path override, if configured.
    ///
    /// Passed through for the component that registers with the kubelet;
    /// nothing in this crate dials it.
    pub device_plugin_path: Option<PathBuf>,
}

impl Services {
    /// Wires real sockets according to `config`.
    ///
    /// The VNI pool belongs to the embedding process, which passes it in
    /// here; with `None` the broker exposes no pool.
    ///
    /// Must be called from within a Tokio runtime; the broker's
    /// reconciliation task is spawned here.
    #[must_use]
    pub fn from_config(config: &BrokerConfig, vni_allocator: Option<Arc<dyn VniAllocator>>) -> Self {
        let dialer: Arc<dyn Dialer> = Arc::new(TransportDialer::new(config.dial_timeout));
        Self::with_dialer(config, dialer, vni_allocator)
    }

    /// Same as [`Services::from_config`] but dials through `dialer`.
    #[must_use]
    pub fn with_dialer(
        config: &BrokerConfig,
        dialer: Arc<dyn Dialer>,
        vni_allocator: Option<Arc<dyn VniAllocator>>,
    ) -> Self {
        let mut builder = ConnectionBroker::builder(config.registry_address.as_str())
            .dialer(Arc::clone(&dialer))
            .poll_interval(config.registry_poll_interval);
        if let Some(vni_allocator) = vni_allocator {
            builder = builder.vni_allocator(vni_allocator);
        }

        let directory = Arc::new(InMemoryWorkspaceDirectory::new());
        let resolver = PeerResolver::new(
            dialer,
            Arc::clone(&directory) as Arc<dyn WorkspaceDirectory>,
            config.server_socket.as_path(),
        )
        .with_dataplane_poll_interval(config.dataplane_poll_interval);

        Self {
            broker: builder.build(),
            resolver,
            directory,
            layout: WorkspaceLayout::new(&config.workspace_root),
            public_api: config.public_api(),
            device_plugin_path: config.device_plugin_path.clone(),
        }
    }

    /// Stops the broker. Resolver calls are unaffected.
    pub fn stop(&self) {
        self.broker.stop();
    }
}
