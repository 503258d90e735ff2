//! In-process [`Dialer`] used by unit tests.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UnixStream;

use super::{Dialer, Target, Transport};
use crate::error::BrokerError;

/// Counts probes and dials and hands out `UnixStream` pairs.
#[derive(Debug, Default)]
pub(crate) struct FakeDialer {
    reachable: AtomicBool,
    failing_dials: AtomicUsize,
    dial_delay_ms: AtomicU64,
    probes: AtomicUsize,
    dials: AtomicUsize,
    dialed: Mutex<Vec<Target>>,
    peers: Mutex<Vec<UnixStream>>,
}

impl FakeDialer {
    pub(crate) fn reachable() -> Self {
        let dialer = Self::default();
        dialer.set_reachable(true);
        dialer
    }

    pub(crate) fn unreachable() -> Self {
        Self::default()
    }

    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes the next `count` dials fail even while reachable.
    pub(crate) fn fail_next_dials(&self, count: usize) {
        self.failing_dials.store(count, Ordering::SeqCst);
    }

    /// Makes every successful dial take `delay` before returning.
    pub(crate) fn set_dial_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.dial_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Hangs up the far end of every connection handed out so far.
    pub(crate) fn drop_peers(&self) {
        drop(self.take_peers());
    }

    /// Far ends of the connections handed out so far.
    pub(crate) fn take_peers(&self) -> Vec<UnixStream> {
        self.peers
            .lock()
            .map(|mut peers| std::mem::take(&mut *peers))
            .unwrap_or_default()
    }

    pub(crate) fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub(crate) fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub(crate) fn dialed_targets(&self) -> Vec<Target> {
        self.dialed.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Dialer for FakeDialer {
    async fn dial(&self, target: &Target) -> Result<Transport, BrokerError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut dialed) = self.dialed.lock() {
            dialed.push(target.clone());
        }

        let forced_failure = self
            .failing_dials
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced_failure || !self.reachable.load(Ordering::SeqCst) {
            return Err(BrokerError::dial_failure(
                target,
                io::Error::from(io::ErrorKind::ConnectionRefused),
            ));
        }

        let delay = self.dial_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let (local, peer) = UnixStream::pair().map_err(|e| BrokerError::dial_failure(target, e))?;
        if let Ok(mut peers) = self.peers.lock() {
            peers.push(peer);
        }
        Ok(Transport::Unix(local))
    }

    async fn probe(&self, target: &Target) -> Result<(), BrokerError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::Unavailable(target.clone()))
        }
    }
}
