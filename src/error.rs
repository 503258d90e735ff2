//! Broker error types.
//!
//! [`BrokerError`] is the central error type for the crate. Every failure is
//! returned to the caller as a typed outcome; nothing here is fatal to the
//! process.

use std::io;

use crate::transport::Target;

/// Error enum for broker, resolver and transport operations.
///
/// # Error Code Ranges
///
/// | Range     | Category      | Retried internally?            |
/// |-----------|---------------|--------------------------------|
/// | 1000–1999 | Configuration | no                             |
/// | 2000–2999 | Lookup        | no                             |
/// | 3000–3999 | Connectivity  | registry only (redial loop)    |
/// | 4000–4999 | Lifecycle     | no                             |
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Peer is not reachable yet.
    #[error("peer at {0} is not reachable")]
    Unavailable(Target),

    /// Workspace or sibling socket is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Broker was shut down before a connection was established.
    #[error("stopped before success trying to dial the network service registry")]
    Stopped,

    /// A one-shot dial failed.
    #[error("failed to dial {target}: {source}")]
    DialFailure {
        /// Where the dial was aimed.
        target: Target,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A configuration value could not be parsed.
    #[error("invalid configuration for {key}: {reason}")]
    InvalidConfig {
        /// Environment key that failed to parse.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl BrokerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidConfig { .. } => 1001,
            Self::NotFound(_) => 2001,
            Self::Unavailable(_) => 3001,
            Self::DialFailure { .. } => 3002,
            Self::Stopped => 4001,
        }
    }

    /// Returns `true` if the caller may reasonably try again.
    ///
    /// `NotFound` and `Stopped` are terminal for the call that produced
    /// them.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::DialFailure { .. })
    }

    /// Builds a [`BrokerError::DialFailure`] for `target`.
    #[must_use]
    pub fn dial_failure(target: &Target, source: io::Error) -> Self {
        Self::DialFailure {
            target: target.clone(),
            source,
        }
    }
}
