//! Shared registry connection: lazy connect, reuse while healthy, redial on
//! loss.
//!
//! One background task owns the connection. It sleeps until a caller asks
//! for a client, dials the registry (polling until the port accepts
//! connections), and publishes every transition through a
//! [`tokio::sync::watch`] channel. Callers wait on that channel; none of
//! them holds a lock across the retry loop, and only the task ever dials,
//! so there is at most one live registry channel at a time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;

use crate::domain::VniAllocator;
use crate::error::BrokerError;
use crate::rpc::{DiscoveryClient, RegistryClient};
use crate::transport::{AvailabilityWaiter, Channel, ChannelState, Dialer, Target, TransportDialer};

/// Default registry address.
pub const DEFAULT_REGISTRY_ADDRESS: &str = "127.0.0.1:5000";

/// Lifecycle of the shared registry connection.
#[derive(Debug, Clone)]
pub enum ConnectionState {
    /// Nothing has asked for the registry yet.
    Unconnected,
    /// The reconciliation task is polling or dialing.
    Dialing,
    /// A channel is cached. It may since have degraded; see
    /// [`Channel::connectivity`].
    Ready(Channel),
    /// The broker was stopped. Terminal.
    Closed,
}

impl ConnectionState {
    /// Cached channel, if any.
    #[must_use]
    pub fn channel(&self) -> Option<&Channel> {
        match self {
            Self::Ready(channel) => Some(channel),
            _ => None,
        }
    }

    /// Returns `true` once the broker has been stopped.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconnected => f.write_str("unconnected"),
            Self::Dialing => f.write_str("dialing"),
            Self::Ready(channel) => write!(f, "ready({})", channel.id()),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Hands out registry and discovery clients over one shared connection.
///
/// Cloning is cheap; clones share the connection and the stop signal.
#[derive(Debug, Clone)]
pub struct ConnectionBroker {
    inner: Arc<BrokerInner>,
}

#[derive(Debug)]
struct BrokerInner {
    target: Target,
    state: Arc<watch::Sender<ConnectionState>>,
    demand: Arc<Notify>,
    stop: CancellationToken,
    vni_allocator: Option<Arc<dyn VniAllocator>>,
}

impl Drop for BrokerInner {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Builder for [`ConnectionBroker`].
#[derive(Debug)]
pub struct ConnectionBrokerBuilder {
    address: String,
    dialer: Option<Arc<dyn Dialer>>,
    poll_interval: Duration,
    vni_allocator: Option<Arc<dyn VniAllocator>>,
}

impl ConnectionBrokerBuilder {
    /// Uses `dialer` instead of a [`TransportDialer`].
    #[must_use]
    pub fn dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// Sets how often the registry address is probed while unreachable.
    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Attaches the VNI pool exposed through
    /// [`ConnectionBroker::vni_allocator`].
    #[must_use]
    pub fn vni_allocator(mut self, vni_allocator: Arc<dyn VniAllocator>) -> Self {
        self.vni_allocator = Some(vni_allocator);
        self
    }

    /// Builds the broker and spawns its reconciliation task.
    ///
    /// Must be called from within a Tokio runtime. No connection is
    /// attempted until the first client is requested.
    #[must_use]
    pub fn build(self) -> ConnectionBroker {
        let target = Target::tcp(self.address);
        let (state, _) = watch::channel(ConnectionState::Unconnected);
        let state = Arc::new(state);
        let demand = Arc::new(Notify::new());
        let stop = CancellationToken::new();

        let reconciler = Reconciler {
            target: target.clone(),
            dialer: self
                .dialer
                .unwrap_or_else(|| Arc::new(TransportDialer::default())),
            waiter: AvailabilityWaiter::new(self.poll_interval),
            state: Arc::clone(&state),
            demand: Arc::clone(&demand),
            stop: stop.clone(),
        };
        tokio::spawn(reconciler.run());

        ConnectionBroker {
            inner: Arc::new(BrokerInner {
                target,
                state,
                demand,
                stop,
                vni_allocator: self.vni_allocator,
            }),
        }
    }
}

impl ConnectionBroker {
    /// Starts building a broker for the registry at `address` (`host:port`).
    #[must_use]
    pub fn builder(address: impl Into<String>) -> ConnectionBrokerBuilder {
        ConnectionBrokerBuilder {
            address: address.into(),
            dialer: None,
            poll_interval: AvailabilityWaiter::DEFAULT_POLL_INTERVAL,
            vni_allocator: None,
        }
    }

    /// Registry address this broker dials.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    /// Snapshot of the connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Returns `true` once [`ConnectionBroker::stop`] has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stop.is_cancelled()
    }

    /// The VNI pool handed to the builder, if any.
    ///
    /// The pool is owned by the embedding process; the broker only passes
    /// it along.
    #[must_use]
    pub fn vni_allocator(&self) -> Option<Arc<dyn VniAllocator>> {
        self.inner.vni_allocator.as_ref().map(Arc::clone)
    }

    /// Returns a registry client on the shared connection, waiting for the
    /// registry to become reachable if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Stopped`] if the broker is stopped before a
    /// connection is ready.
    pub async fn registry_client(&self) -> Result<RegistryClient, BrokerError> {
        tracing::info!("requesting registry client");
        self.ready_channel().await.map(RegistryClient::new)
    }

    /// Returns a discovery client on the same shared connection as
    /// [`ConnectionBroker::registry_client`].
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Stopped`] if the broker is stopped before a
    /// connection is ready.
    pub async fn discovery_client(&self) -> Result<DiscoveryClient, BrokerError> {
        tracing::info!("requesting discovery client");
        self.ready_channel().await.map(DiscoveryClient::new)
    }

    /// Stops redialing and closes the cached channel. Idempotent.
    ///
    /// Every pending and later client request fails with
    /// [`BrokerError::Stopped`].
    pub fn stop(&self) {
        self.inner.stop.cancel();
        match self.inner.state.send_replace(ConnectionState::Closed) {
            ConnectionState::Closed => {
                tracing::debug!(registry = %self.inner.target, "broker already stopped");
            }
            ConnectionState::Ready(channel) => {
                channel.close();
                tracing::info!(registry = %self.inner.target, channel = %channel.id(), "broker stopped, registry connection closed");
            }
            ConnectionState::Unconnected | ConnectionState::Dialing => {
                tracing::info!(registry = %self.inner.target, "broker stopped");
            }
        }
    }

    async fn ready_channel(&self) -> Result<Channel, BrokerError> {
        let mut rx = self.inner.state.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                match &*state {
                    ConnectionState::Ready(channel)
                        if channel.connectivity() == ChannelState::Ready =>
                    {
                        return Ok(channel.clone());
                    }
                    ConnectionState::Closed => return Err(BrokerError::Stopped),
                    _ => {}
                }
            }
            if self.inner.stop.is_cancelled() {
                return Err(BrokerError::Stopped);
            }
            self.inner.demand.notify_one();
            if rx.changed().await.is_err() {
                return Err(BrokerError::Stopped);
            }
        }
    }
}

/// Background owner of the registry connection.
struct Reconciler {
    target: Target,
    dialer: Arc<dyn Dialer>,
    waiter: AvailabilityWaiter,
    state: Arc<watch::Sender<ConnectionState>>,
    demand: Arc<Notify>,
    stop: CancellationToken,
}

impl Reconciler {
    async fn run(self) {
        loop {
            tokio::select! {
                biased;
                () = self.stop.cancelled() => break,
                () = self.demand.notified() => {}
            }

            let healthy = self
                .state
                .borrow()
                .channel()
                .is_some_and(|channel| channel.connectivity() == ChannelState::Ready);
            if healthy {
                continue;
            }

            // Retire a degraded channel before dialing its replacement.
            let dialing = self.state.send_if_modified(|state| {
                if state.is_closed() {
                    return false;
                }
                if let ConnectionState::Ready(stale) = &*state {
                    tracing::warn!(registry = %self.target, channel = %stale.id(), state = %stale.state(), "registry connection lost, redialing");
                    stale.close();
                }
                *state = ConnectionState::Dialing;
                true
            });
            if !dialing {
                break;
            }

            let Some(channel) = self.connect().await else {
                break;
            };
            if !self.publish_ready(channel) {
                break;
            }
        }
        self.state.send_replace(ConnectionState::Closed);
        tracing::debug!(registry = %self.target, "registry reconciliation finished");
    }

    /// Polls and dials until a channel is open or the broker stops.
    async fn connect(&self) -> Option<Channel> {
        while !self.stop.is_cancelled() {
            tokio::select! {
                biased;
                () = self.stop.cancelled() => return None,
                _ = self.waiter.wait_until_reachable(self.dialer.as_ref(), &self.target) => {}
            }
            tracing::info!(registry = %self.target, "registry port now available, attempting to connect");

            match self.dialer.dial(&self.target).await {
                Ok(transport) => {
                    let channel = Channel::new(self.target.clone(), transport);
                    tracing::info!(registry = %self.target, channel = %channel.id(), "successfully connected to registry");
                    return Some(channel);
                }
                Err(e) => {
                    tracing::error!(registry = %self.target, error = %e, "failed to dial network service registry");
                    tokio::select! {
                        biased;
                        () = self.stop.cancelled() => return None,
                        () = tokio::time::sleep(self.waiter.poll_interval()) => {}
                    }
                }
            }
        }
        None
    }

    /// Publishes `channel` unless the broker stopped while it was dialed,
    /// in which case the channel is closed instead.
    fn publish_ready(&self, channel: Channel) -> bool {
        let published = self.state.send_if_modified(|state| {
            if state.is_closed() {
                return false;
            }
            *state = ConnectionState::Ready(channel.clone());
            true
        });
        if !published {
            tracing::debug!(registry = %self.target, channel = %channel.id(), "broker stopped during dial, discarding channel");
            channel.close();
        }
        published
    }
}
