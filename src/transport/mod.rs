//! Transport layer: dial targets, shared channels, the dialer seam, and
//! reachability polling.

pub mod channel;
pub mod dialer;
pub mod target;
pub mod waiter;

#[cfg(test)]
pub(crate) mod fakes;

pub use channel::{Channel, ChannelState};
pub use dialer::{Dialer, TransportDialer};
pub use target::{Target, Transport};
pub use waiter::AvailabilityWaiter;
