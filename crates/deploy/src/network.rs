//! Network profiles.

use std::{path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownNetworkError;

/// Default RPC port of a neo-express node.
pub const NEOEXPRESS_RPC_PORT: u16 = 50012;

/// Network magic of the Neo N3 public test network.
pub const TESTNET_MAGIC: u32 = 894_710_606;
/// Network magic of the Neo N3 production network.
pub const MAINNET_MAGIC: u32 = 860_833_102;
/// Recorded magic for the local network. neo-express picks its own value per
/// descriptor; local invocations go through the descriptor, never this value.
pub const NEOEXPRESS_MAGIC: u32 = 1_234_567_890;

/// Default location of the local-network descriptor.
pub const DEFAULT_LOCAL_DESCRIPTOR: &str = "deploy/neo-express/default.neo-express";

/// The closed set of supported networks.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Local ephemeral network run by neo-express.
    #[default]
    #[strum(to_string = "neoexpress", serialize = "local")]
    NeoExpress,
    /// Public test network.
    Testnet,
    /// Public production network.
    Mainnet,
}

/// Everything needed to address and invoke contracts on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub network: Network,
    pub rpc_url: String,
    pub network_magic: u32,
    /// Only present for the local network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_network_descriptor: Option<PathBuf>,
}

impl NetworkProfile {
    /// The symbolic name used in file names and the state document.
    pub fn name(&self) -> String {
        self.network.to_string()
    }

    pub fn is_local(&self) -> bool {
        self.local_network_descriptor.is_some()
    }

    /// Replace the RPC endpoint.
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Replace the local-network descriptor path. No-op for live networks.
    pub fn with_local_descriptor(mut self, descriptor: impl Into<PathBuf>) -> Self {
        if self.local_network_descriptor.is_some() {
            self.local_network_descriptor = Some(descriptor.into());
        }
        self
    }
}

impl Network {
    pub fn profile(&self) -> NetworkProfile {
        match self {
            Network::NeoExpress => NetworkProfile {
                network: *self,
                rpc_url: format!("http://127.0.0.1:{NEOEXPRESS_RPC_PORT}"),
                network_magic: NEOEXPRESS_MAGIC,
                local_network_descriptor: Some(PathBuf::from(DEFAULT_LOCAL_DESCRIPTOR)),
            },
            Network::Testnet => NetworkProfile {
                network: *self,
                rpc_url: "https://testnet1.neo.coz.io:443".to_string(),
                network_magic: TESTNET_MAGIC,
                local_network_descriptor: None,
            },
            Network::Mainnet => NetworkProfile {
                network: *self,
                rpc_url: "https://mainnet1.neo.coz.io:443".to_string(),
                network_magic: MAINNET_MAGIC,
                local_network_descriptor: None,
            },
        }
    }
}

/// Resolve a symbolic network name to its profile. No network I/O.
pub fn resolve(name: &str) -> Result<NetworkProfile, UnknownNetworkError> {
    Network::from_str(name.trim())
        .map(|network| network.profile())
        .map_err(|_| UnknownNetworkError(name.to_string()))
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_resolve_known_networks() {
        let local = resolve("neoexpress").unwrap();
        assert_eq!(local.network, Network::NeoExpress);
        assert_eq!(local.rpc_url, "http://127.0.0.1:50012");
        assert!(local.is_local());

        let testnet = resolve("testnet").unwrap();
        assert_eq!(testnet.network_magic, TESTNET_MAGIC);
        assert!(testnet.local_network_descriptor.is_none());

        let mainnet = resolve("MainNet").unwrap();
        assert_eq!(mainnet.network_magic, MAINNET_MAGIC);
    }

    #[test]
    fn test_resolve_alias() {
        assert_eq!(resolve("local").unwrap().network, Network::NeoExpress);
    }

    #[test]
    fn test_resolve_unknown() {
        assert_eq!(
            resolve("devnet").unwrap_err(),
            UnknownNetworkError("devnet".to_string())
        );
        assert!(resolve("").is_err());
    }

    #[test]
    fn test_exactly_one_local_profile() {
        let locals = Network::iter().filter(|n| n.profile().is_local()).count();
        assert_eq!(locals, 1);
    }

    #[test]
    fn test_descriptor_override_only_for_local() {
        let testnet = Network::Testnet.profile().with_local_descriptor("x.neo-express");
        assert!(testnet.local_network_descriptor.is_none());

        let local = Network::NeoExpress.profile().with_local_descriptor("x.neo-express");
        assert_eq!(local.local_network_descriptor, Some(PathBuf::from("x.neo-express")));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(Network::NeoExpress.to_string(), "neoexpress");
        assert_eq!(Network::Testnet.profile().name(), "testnet");
    }
}
