//! Service layer: the shared registry connection and one-shot peer
//! connections.
//!
//! [`ConnectionBroker`] owns the single registry connection and serves
//! registry/discovery clients over it. [`PeerResolver`] opens independent,
//! uncached connections to every other peer kind.

pub mod broker;
pub mod resolver;

pub use broker::{ConnectionBroker, ConnectionBrokerBuilder, ConnectionState};
pub use resolver::PeerResolver;
