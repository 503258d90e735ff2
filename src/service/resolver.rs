//! One-shot connections to dataplanes, local endpoints, and sibling
//! control-plane instances.
//!
//! Nothing here is cached or locked. Every call opens its own channel and
//! hands ownership to the caller, who closes it when done.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    Dataplane, DataplaneSource, NetworkServiceManager, NseRegistration, WorkspaceDirectory,
};
use crate::error::BrokerError;
use crate::rpc::{DataplaneClient, EndpointClient, NsmdApiClient, RemoteNetworkServiceClient};
use crate::transport::{AvailabilityWaiter, Channel, Dialer, Target};

/// Default path of the local control socket.
pub const DEFAULT_SERVER_SOCKET: &str = "/var/lib/networkservicemesh/nsm.io.sock";

/// Default interval between dataplane selection attempts.
pub const DEFAULT_DATAPLANE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Opens uncached connections to individual peers.
#[derive(Debug, Clone)]
pub struct PeerResolver {
    dialer: Arc<dyn Dialer>,
    directory: Arc<dyn WorkspaceDirectory>,
    server_socket: PathBuf,
    remote_waiter: AvailabilityWaiter,
    dataplane_poll_interval: Duration,
}

impl PeerResolver {
    /// Creates a resolver that dials through `dialer`, finds endpoint
    /// workspaces in `directory`, and expects the sibling control plane at
    /// `server_socket`.
    #[must_use]
    pub fn new(
        dialer: Arc<dyn Dialer>,
        directory: Arc<dyn WorkspaceDirectory>,
        server_socket: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dialer,
            directory,
            server_socket: server_socket.into(),
            remote_waiter: AvailabilityWaiter::default(),
            dataplane_poll_interval: DEFAULT_DATAPLANE_POLL_INTERVAL,
        }
    }

    /// Sets how often remote managers are probed before dialing.
    #[must_use]
    pub fn with_remote_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.remote_waiter = AvailabilityWaiter::new(poll_interval);
        self
    }

    /// Sets how often [`PeerResolver::wait_for_dataplane`] retries.
    #[must_use]
    pub fn with_dataplane_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.dataplane_poll_interval = poll_interval;
        self
    }

    /// Local control socket path.
    #[must_use]
    pub fn server_socket(&self) -> &Path {
        &self.server_socket
    }

    /// Dials the dataplane's advertised socket. No reachability polling.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::DialFailure`] if the socket does not accept
    /// the connection.
    pub async fn dataplane_connection(
        &self,
        dataplane: &Dataplane,
    ) -> Result<(DataplaneClient, Channel), BrokerError> {
        let channel = self
            .open(Target::unix(&dataplane.socket_location))
            .await
            .inspect_err(|e| {
                tracing::error!(dataplane = %dataplane.registered_name, error = %e, "unable to connect to dataplane");
            })?;
        Ok((DataplaneClient::new(channel.clone()), channel))
    }

    /// Dials the client-facing socket of the endpoint's workspace.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotFound`] without dialing if the endpoint
    /// has no workspace, or [`BrokerError::DialFailure`] if the dial fails.
    pub async fn endpoint_connection(
        &self,
        registration: &NseRegistration,
    ) -> Result<(EndpointClient, Channel), BrokerError> {
        let endpoint = registration.endpoint_name();
        let Some(workspace) = self.directory.lookup(endpoint).await else {
            let err = BrokerError::NotFound(format!("workspace for endpoint {endpoint}"));
            tracing::error!(endpoint, error = %err, "cannot find workspace for endpoint");
            return Err(err);
        };

        let channel = self
            .open(Target::unix(workspace.client_socket()))
            .await
            .inspect_err(|e| {
                tracing::error!(endpoint, workspace = workspace.name(), error = %e, "unable to connect to endpoint");
            })?;
        Ok((EndpointClient::new(channel.clone()), channel))
    }

    /// Dials the local control socket after checking that the socket file
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotFound`] immediately if the socket file is
    /// missing, or [`BrokerError::DialFailure`] if the dial fails.
    pub async fn sibling_connection(&self) -> Result<(NsmdApiClient, Channel), BrokerError> {
        tracing::info!(socket = %self.server_socket.display(), "connecting to nsmd");
        if let Err(e) = tokio::fs::metadata(&self.server_socket).await {
            return Err(BrokerError::NotFound(format!(
                "control-plane socket {}: {e}",
                self.server_socket.display()
            )));
        }

        let channel = self.open(Target::unix(&self.server_socket)).await?;
        tracing::info!(channel = %channel.id(), "nsmd client connection ready");
        Ok((NsmdApiClient::new(channel.clone()), channel))
    }

    /// Waits until the remote manager's URL accepts connections, then dials
    /// it.
    ///
    /// The wait has no deadline; drop the future to give up.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::DialFailure`] if the dial fails after the
    /// port became reachable.
    pub async fn remote_connection(
        &self,
        manager: &NetworkServiceManager,
    ) -> Result<(RemoteNetworkServiceClient, Channel), BrokerError> {
        let target = Target::tcp(manager.url.as_str());
        self.remote_waiter
            .wait_until_reachable(self.dialer.as_ref(), &target)
            .await;
        tracing::info!(manager = %manager.name, url = %manager.url, "remote network service manager available, attempting to connect");

        let channel = self.open(target).await.inspect_err(|e| {
            tracing::error!(manager = %manager.name, url = %manager.url, error = %e, "failed to dial remote network service manager");
        })?;
        Ok((RemoteNetworkServiceClient::new(channel.clone()), channel))
    }

    /// Name of the endpoint's workspace, or an empty string if none is
    /// registered.
    pub async fn workspace_name(&self, registration: &NseRegistration) -> String {
        self.directory
            .lookup(registration.endpoint_name())
            .await
            .map(|workspace| workspace.name().to_string())
            .unwrap_or_default()
    }

    /// Polls `source` until it selects a dataplane.
    pub async fn wait_for_dataplane(&self, source: &dyn DataplaneSource) -> Dataplane {
        tracing::info!("waiting for dataplane available");
        loop {
            if let Some(dataplane) = source.select_dataplane() {
                tracing::info!(dataplane = %dataplane.registered_name, "dataplane available");
                return dataplane;
            }
            tokio::time::sleep(self.dataplane_poll_interval).await;
        }
    }

    async fn open(&self, target: Target) -> Result<Channel, BrokerError> {
        let transport = self.dialer.dial(&target).await?;
        Ok(Channel::new(target, transport))
    }
}
