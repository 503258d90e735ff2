//! # nsm-broker
//!
//! Connection broker for a network service mesh control-plane agent.
//!
//! Produces ready-to-use RPC connections to every peer kind the control
//! plane talks to, tolerating peers that are not listening yet and keeping
//! one stalled peer from affecting callers of another.
//!
//! ## Architecture
//!
//! ```text
//! Callers
//!     │
//!     ├── ConnectionBroker (service/)   registry + discovery, one shared channel
//!     │       └── reconciliation task ── watch ──▶ waiting callers
//!     │
//!     ├── PeerResolver (service/)       dataplane, endpoint, sibling, remote
//!     │       └── WorkspaceDirectory (domain/)
//!     │
//!     ├── AvailabilityWaiter, Dialer, Channel (transport/)
//!     │
//!     └── RpcClient<Surface> (rpc)
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod rpc;
pub mod service;
pub mod services;
pub mod transport;
