//! Peer descriptors handed to the resolver by the rest of the control plane.
//!
//! These mirror the registry API objects closely enough to carry the fields
//! the broker needs; they are deserializable so callers can feed them
//! straight from registry responses.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A network-service provider instance as known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkServiceEndpoint {
    /// Endpoint name; the identity used for workspace lookups.
    pub name: String,
    /// Network service this endpoint provides.
    pub network_service_name: String,
    /// Name of the manager the endpoint registered with.
    #[serde(default)]
    pub network_service_manager_name: String,
    /// Free-form labels.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Registration record for a local endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NseRegistration {
    /// The registered endpoint.
    pub network_service_endpoint: NetworkServiceEndpoint,
}

impl NseRegistration {
    /// Returns the endpoint identity used to locate its workspace.
    #[must_use]
    pub fn endpoint_name(&self) -> &str {
        &self.network_service_endpoint.name
    }
}

/// A sibling control-plane instance reachable over TCP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkServiceManager {
    /// Manager name.
    pub name: String,
    /// `host:port` the manager serves its remote API on.
    pub url: String,
}

/// A per-node dataplane agent and the socket it advertises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataplane {
    /// Name the dataplane registered under.
    pub registered_name: String,
    /// Unix socket the dataplane listens on.
    pub socket_location: PathBuf,
}

/// Source of dataplane selections, typically the control-plane model.
pub trait DataplaneSource: Send + Sync {
    /// Returns a dataplane if one is currently available.
    fn select_dataplane(&self) -> Option<Dataplane>;
}
