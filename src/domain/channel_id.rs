//! Channel identity.

use std::fmt;

/// Unique identifier for one opened transport channel.
///
/// Generated when a [`crate::transport::Channel`] is created and never
/// reused. Two client handles with equal `ChannelId`s share the same
/// underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(uuid::Uuid);

impl ChannelId {
    /// Creates a new random `ChannelId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
