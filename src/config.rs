//! Broker configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Blank values are treated as unset.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::workspace::DEFAULT_WORKSPACE_ROOT;
use crate::error::BrokerError;
use crate::service::broker::DEFAULT_REGISTRY_ADDRESS;
use crate::service::resolver::DEFAULT_SERVER_SOCKET;

/// Default bind address of the public API.
pub const DEFAULT_API_ADDRESS: &str = "0.0.0.0:5001";

/// Top-level broker configuration.
///
/// Loaded once at startup via [`BrokerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// `host:port` of the cluster registry (`NSM_REGISTRY_ADDRESS`).
    pub registry_address: String,

    /// Bind address of the public API (`NSMD_API_ADDRESS`).
    pub api_address: SocketAddr,

    /// Address published to peers (`NSMD_PUBLIC_API`). Falls back to
    /// `api_address` when unset.
    pub public_api: Option<String>,

    /// Local control socket (`NSM_SERVER_SOCKET`).
    pub server_socket: PathBuf,

    /// Device-plugin path override (`NSM_DEVICE_PLUGIN`).
    pub device_plugin_path: Option<PathBuf>,

    /// Workspace root directory (`NSM_WORKSPACE_ROOT`).
    pub workspace_root: String,

    /// Probe interval while the registry is unreachable
    /// (`NSM_REGISTRY_POLL_INTERVAL_MS`).
    pub registry_poll_interval: Duration,

    /// Bound on a single connect attempt (`NSM_DIAL_TIMEOUT_MS`).
    pub dial_timeout: Duration,

    /// Interval between dataplane selection attempts
    /// (`NSM_DATAPLANE_POLL_INTERVAL_MS`).
    pub dataplane_poll_interval: Duration,
}

impl BrokerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfig`] if `NSMD_API_ADDRESS` is set
    /// but cannot be parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, BrokerError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Falls back to defaults for missing, blank, or unparsable numeric
    /// values.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfig`] if `NSMD_API_ADDRESS` cannot
    /// be parsed as a [`SocketAddr`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BrokerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| non_blank(&lookup, key);

        let registry_address =
            value("NSM_REGISTRY_ADDRESS").unwrap_or_else(|| DEFAULT_REGISTRY_ADDRESS.to_string());

        let api_address = value("NSMD_API_ADDRESS")
            .unwrap_or_else(|| DEFAULT_API_ADDRESS.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| BrokerError::InvalidConfig {
                key: "NSMD_API_ADDRESS",
                reason: e.to_string(),
            })?;

        Ok(Self {
            registry_address,
            api_address,
            public_api: value("NSMD_PUBLIC_API"),
            server_socket: value("NSM_SERVER_SOCKET")
                .map_or_else(|| PathBuf::from(DEFAULT_SERVER_SOCKET), PathBuf::from),
            device_plugin_path: value("NSM_DEVICE_PLUGIN").map(PathBuf::from),
            workspace_root: value("NSM_WORKSPACE_ROOT")
                .unwrap_or_else(|| DEFAULT_WORKSPACE_ROOT.to_string()),
            registry_poll_interval: parse_millis(&lookup, "NSM_REGISTRY_POLL_INTERVAL_MS", 1000),
            dial_timeout: parse_millis(&lookup, "NSM_DIAL_TIMEOUT_MS", 5000),
            dataplane_poll_interval: parse_millis(&lookup, "NSM_DATAPLANE_POLL_INTERVAL_MS", 100),
        })
    }

    /// Address other control-plane instances should use to reach this one.
    #[must_use]
    pub fn public_api(&self) -> String {
        self.public_api
            .clone()
            .unwrap_or_else(|| self.api_address.to_string())
    }
}

/// Returns the trimmed value for `key`, or `None` if missing or blank.
fn non_blank<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses `key` as a millisecond count, returning `default_ms` on missing
/// or invalid values.
fn parse_millis<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default_ms: u64) -> Duration {
    let millis = non_blank(lookup, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(millis)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<BrokerConfig, BrokerError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        BrokerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let Ok(config) = load(&[]) else {
            panic!("defaults should load");
        };
        assert_eq!(config.registry_address, "127.0.0.1:5000");
        assert_eq!(config.api_address.to_string(), "0.0.0.0:5001");
        assert_eq!(
            config.server_socket,
            PathBuf::from("/var/lib/networkservicemesh/nsm.io.sock")
        );
        assert_eq!(config.workspace_root, "/var/lib/networkservicemesh/");
        assert!(config.device_plugin_path.is_none());
        assert_eq!(config.registry_poll_interval, Duration::from_secs(1));
        assert_eq!(config.dial_timeout, Duration::from_secs(5));
        assert_eq!(config.dataplane_poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn blank_registry_address_falls_back() {
        let Ok(config) = load(&[("NSM_REGISTRY_ADDRESS", "   ")]) else {
            panic!("blank should load");
        };
        assert_eq!(config.registry_address, "127.0.0.1:5000");
    }

    #[test]
    fn values_are_trimmed() {
        let Ok(config) = load(&[
            ("NSM_REGISTRY_ADDRESS", " registry.nsm:5000 \n"),
            ("NSM_DEVICE_PLUGIN", "/var/lib/kubelet/device-plugins"),
            ("NSM_REGISTRY_POLL_INTERVAL_MS", "250"),
        ]) else {
            panic!("config should load");
        };
        assert_eq!(config.registry_address, "registry.nsm:5000");
        assert_eq!(
            config.device_plugin_path,
            Some(PathBuf::from("/var/lib/kubelet/device-plugins"))
        );
        assert_eq!(config.registry_poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let Ok(config) = load(&[("NSM_DIAL_TIMEOUT_MS", "soon")]) else {
            panic!("config should load");
        };
        assert_eq!(config.dial_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_api_address_is_rejected() {
        let result = load(&[("NSMD_API_ADDRESS", "not-an-address")]);
        assert!(matches!(
            result,
            Err(BrokerError::InvalidConfig {
                key: "NSMD_API_ADDRESS",
                ..
            })
        ));
    }

    #[test]
    fn public_api_prefers_explicit_value() {
        let Ok(config) = load(&[("NSMD_PUBLIC_API", "10.1.2.3:5001")]) else {
            panic!("config should load");
        };
        assert_eq!(config.public_api(), "10.1.2.3:5001");

        let Ok(config) = load(&[("NSMD_API_ADDRESS", "127.0.0.1:6001")]) else {
            panic!("config should load");
        };
        assert_eq!(config.public_api(), "127.0.0.1:6001");
    }
}
