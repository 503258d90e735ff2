//! Opening connections to peers.
//!
//! [`Dialer`] is the seam between the broker and the network: the broker
//! and resolver never touch sockets directly, so tests can count dial
//! attempts and hand out in-process streams instead.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpStream, UnixStream};

use super::{Target, Transport};
use crate::error::BrokerError;

/// Default bound on a single connect attempt.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens transports and probes reachability.
#[async_trait]
pub trait Dialer: Send + Sync + std::fmt::Debug {
    /// Opens a fresh connection to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::DialFailure`] if the connection cannot be
    /// established.
    async fn dial(&self, target: &Target) -> Result<Transport, BrokerError>;

    /// Lightweight check that something is accepting connections at
    /// `target`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Unavailable`] if nothing accepts yet.
    async fn probe(&self, target: &Target) -> Result<(), BrokerError>;
}

/// [`Dialer`] backed by real TCP and Unix sockets.
#[derive(Debug, Clone, Copy)]
pub struct TransportDialer {
    dial_timeout: Duration,
}

impl TransportDialer {
    /// Creates a dialer that gives up on a single attempt after
    /// `dial_timeout`.
    #[must_use]
    pub const fn new(dial_timeout: Duration) -> Self {
        Self { dial_timeout }
    }

    /// Bound on a single connect attempt.
    #[must_use]
    pub const fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    async fn connect(&self, target: &Target) -> io::Result<Transport> {
        let attempt = async {
            match target {
                Target::Tcp(address) => {
                    let stream = TcpStream::connect(address.as_str()).await?;
                    stream.set_nodelay(true)?;
                    Ok::<_, io::Error>(Transport::Tcp(stream))
                }
                Target::Unix(path) => UnixStream::connect(path).await.map(Transport::Unix),
            }
        };
        tokio::time::timeout(self.dial_timeout, attempt)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "dial timed out"))?
    }
}

impl Default for TransportDialer {
    fn default() -> Self {
        Self::new(DEFAULT_DIAL_TIMEOUT)
    }
}

#[async_trait]
impl Dialer for TransportDialer {
    async fn dial(&self, target: &Target) -> Result<Transport, BrokerError> {
        tracing::debug!(peer = %target, "dialing");
        self.connect(target)
            .await
            .map_err(|e| BrokerError::dial_failure(target, e))
    }

    async fn probe(&self, target: &Target) -> Result<(), BrokerError> {
        match self.connect(target).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::trace!(peer = %target, error = %e, "probe failed");
                Err(BrokerError::Unavailable(target.clone()))
            }
        }
    }
}
