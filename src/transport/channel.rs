//! Shared handle over one opened transport.
//!
//! A [`Channel`] is cheap to clone; every clone refers to the same
//! connection. Its connectivity state only moves forward:
//! `Ready -> TransientFailure -> Shutdown` (or straight to `Shutdown`).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{Mutex, MutexGuard};

use super::{Target, Transport};
use crate::domain::ChannelId;

const READY: u8 = 0;
const TRANSIENT_FAILURE: u8 = 1;
const SHUTDOWN: u8 = 2;

/// Connectivity state of a [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Connected and usable.
    Ready,
    /// A call over the channel failed; the connection should be replaced.
    TransientFailure,
    /// Closed by its owner.
    Shutdown,
}

impl ChannelState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            READY => Self::Ready,
            TRANSIENT_FAILURE => Self::TransientFailure,
            _ => Self::Shutdown,
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ready => "ready",
            Self::TransientFailure => "transient_failure",
            Self::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}

/// Shared, cloneable handle over one connection.
#[derive(Debug, Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

#[derive(Debug)]
struct ChannelInner {
    id: ChannelId,
    target: Target,
    state: AtomicU8,
    transport: Mutex<Option<Transport>>,
}

impl Channel {
    pub(crate) fn new(target: Target, transport: Transport) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                id: ChannelId::new(),
                target,
                state: AtomicU8::new(READY),
                transport: Mutex::new(Some(transport)),
            }),
        }
    }

    /// Identity of the underlying connection.
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// Where this channel was dialed.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    /// Current connectivity state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        ChannelState::from_raw(self.inner.state.load(Ordering::Acquire))
    }

    /// Returns `true` while the channel is [`ChannelState::Ready`].
    ///
    /// Reads the recorded state only; see [`Channel::connectivity`].
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ChannelState::Ready
    }

    /// Refreshes the state from the underlying stream and returns it.
    ///
    /// A `Ready` channel whose peer has hung up moves to
    /// [`ChannelState::TransientFailure`]. A stream currently locked by a
    /// call through [`Channel::transport`] is not inspected.
    pub fn connectivity(&self) -> ChannelState {
        if self.is_ready() {
            let hung_up = self
                .inner
                .transport
                .try_lock()
                .is_ok_and(|transport| transport.as_ref().is_some_and(Transport::peer_closed));
            if hung_up {
                self.degrade("peer closed connection");
            }
        }
        self.state()
    }

    /// Returns `true` if `other` refers to the same connection.
    #[must_use]
    pub fn same_channel(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Marks the channel degraded after a failed call.
    ///
    /// The shared registry connection notices this on its next request and
    /// redials. Has no effect on a channel that is already shut down.
    pub fn report_failure(&self) {
        self.degrade("call failed");
    }

    fn degrade(&self, reason: &str) {
        let moved = self
            .inner
            .state
            .compare_exchange(READY, TRANSIENT_FAILURE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            tracing::warn!(channel = %self.inner.id, peer = %self.inner.target, reason, "channel degraded");
        }
    }

    /// Shuts the channel down. Idempotent.
    ///
    /// The stream is dropped right away unless someone holds it through
    /// [`Channel::transport`]; in that case it goes with the last clone.
    pub fn close(&self) {
        let previous = self.inner.state.swap(SHUTDOWN, Ordering::AcqRel);
        if previous == SHUTDOWN {
            return;
        }
        if let Ok(mut transport) = self.inner.transport.try_lock() {
            transport.take();
        }
        tracing::debug!(channel = %self.inner.id, peer = %self.inner.target, "channel closed");
    }

    /// Locks the underlying stream for exclusive use by an RPC call.
    ///
    /// Yields `None` once the channel has been closed.
    pub async fn transport(&self) -> MutexGuard<'_, Option<Transport>> {
        let mut guard = self.inner.transport.lock().await;
        if self.state() == ChannelState::Shutdown {
            guard.take();
        }
        guard
    }
}
