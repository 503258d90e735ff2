//! Polling until a peer becomes connectable.

use std::time::Duration;

use super::{Dialer, Target};

/// Repeats a reachability probe at a fixed interval.
///
/// Has no deadline of its own. Callers bound it by dropping the future,
/// e.g. inside `tokio::select!` or `tokio::time::timeout`.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityWaiter {
    poll_interval: Duration,
}

impl AvailabilityWaiter {
    /// Interval used when none is configured.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    /// Creates a waiter that probes every `poll_interval`.
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Time between probes.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Suspends until `dialer` reports `target` reachable.
    ///
    /// Returns the number of failed probes before success.
    pub async fn wait_until_reachable(&self, dialer: &dyn Dialer, target: &Target) -> u64 {
        let mut failed: u64 = 0;
        loop {
            match dialer.probe(target).await {
                Ok(()) => {
                    if failed > 0 {
                        tracing::debug!(peer = %target, failed, "peer reachable");
                    }
                    return failed;
                }
                Err(e) => {
                    failed = failed.saturating_add(1);
                    tracing::trace!(error = %e, failed, "peer not reachable yet");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl Default for AvailabilityWaiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;
    use crate::transport::fakes::FakeDialer;

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_when_reachable() {
        let dialer = FakeDialer::reachable();
        let started = Instant::now();
        let failed = AvailabilityWaiter::default()
            .wait_until_reachable(&dialer, &Target::tcp("127.0.0.1:5000"))
            .await;
        assert_eq!(failed, 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(dialer.probe_count(), 1);
        assert_eq!(dialer.dial_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_at_fixed_interval() {
        let dialer = Arc::new(FakeDialer::unreachable());
        let waiter = AvailabilityWaiter::new(Duration::from_secs(1));

        let task = tokio::spawn({
            let dialer = Arc::clone(&dialer);
            async move {
                waiter
                    .wait_until_reachable(dialer.as_ref(), &Target::tcp("127.0.0.1:5000"))
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(dialer.probe_count(), 4);
        dialer.set_reachable(true);

        let failed = task.await.ok();
        assert_eq!(failed, Some(4));
        assert_eq!(dialer.probe_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_future_cancels_the_wait() {
        let dialer = FakeDialer::unreachable();
        let waiter = AvailabilityWaiter::new(Duration::from_millis(100));
        let result = tokio::time::timeout(
            Duration::from_millis(450),
            waiter.wait_until_reachable(&dialer, &Target::tcp("127.0.0.1:5000")),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(dialer.probe_count(), 5);
    }
}
