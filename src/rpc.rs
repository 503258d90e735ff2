//! Typed RPC client handles.
//!
//! An [`RpcClient`] is a [`Channel`] tagged with the API surface it speaks.
//! The encoding of calls over the channel lives outside this crate; the
//! handle only fixes which peer and which surface a caller is talking to.

use std::fmt;
use std::marker::PhantomData;

use crate::transport::Channel;

/// Marker for an RPC surface.
pub trait RpcSurface: Send + Sync + 'static {
    /// Service name, used in logs.
    const NAME: &'static str;
}

/// Registry API: registering endpoints and managers.
#[derive(Debug)]
pub enum Registry {}

/// Discovery API: finding network services and their endpoints.
#[derive(Debug)]
pub enum Discovery {}

/// Dataplane API.
#[derive(Debug)]
pub enum Dataplane {}

/// Local network-service API served by an endpoint.
#[derive(Debug)]
pub enum LocalNetworkService {}

/// Control-plane API on the local control socket.
#[derive(Debug)]
pub enum NsmdApi {}

/// Remote network-service API served by another control-plane instance.
#[derive(Debug)]
pub enum RemoteNetworkService {}

impl RpcSurface for Registry {
    const NAME: &'static str = "registry.NetworkServiceRegistry";
}

impl RpcSurface for Discovery {
    const NAME: &'static str = "registry.NetworkServiceDiscovery";
}

impl RpcSurface for Dataplane {
    const NAME: &'static str = "dataplane.Dataplane";
}

impl RpcSurface for LocalNetworkService {
    const NAME: &'static str = "networkservice.NetworkService";
}

impl RpcSurface for NsmdApi {
    const NAME: &'static str = "nsmdapi.NSMD";
}

impl RpcSurface for RemoteNetworkService {
    const NAME: &'static str = "remote.networkservice.NetworkService";
}

/// Client for surface `S` bound to one channel.
pub struct RpcClient<S: RpcSurface> {
    channel: Channel,
    surface: PhantomData<fn() -> S>,
}

impl<S: RpcSurface> RpcClient<S> {
    /// Binds a client to `channel`.
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            surface: PhantomData,
        }
    }

    /// Channel the client issues calls on.
    #[must_use]
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Name of the API surface.
    #[must_use]
    pub fn surface(&self) -> &'static str {
        S::NAME
    }

    /// Releases the client, keeping the channel.
    #[must_use]
    pub fn into_channel(self) -> Channel {
        self.channel
    }
}

impl<S: RpcSurface> Clone for RpcClient<S> {
    fn clone(&self) -> Self {
        Self::new(self.channel.clone())
    }
}

impl<S: RpcSurface> fmt::Debug for RpcClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("surface", &S::NAME)
            .field("channel", &self.channel.id())
            .field("peer", self.channel.target())
            .finish()
    }
}

/// Client for the registry API.
pub type RegistryClient = RpcClient<Registry>;
/// Client for the discovery API.
pub type DiscoveryClient = RpcClient<Discovery>;
/// Client for a dataplane agent.
pub type DataplaneClient = RpcClient<Dataplane>;
/// Client for a local endpoint.
pub type EndpointClient = RpcClient<LocalNetworkService>;
/// Client for the local control socket.
pub type NsmdApiClient = RpcClient<NsmdApi>;
/// Client for a remote control-plane instance.
pub type RemoteNetworkServiceClient = RpcClient<RemoteNetworkService>;
