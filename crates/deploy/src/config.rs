//! Run settings, built once at startup and passed by reference everywhere else.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{
    Hash160, Network, NetworkProfile, error::ConfigurationError, network, tool::WalletSource,
};

/// The default name of the local, untracked settings file.
pub const SETTINGS_FILENAME: &str = "Slayer.toml";

/// Prefix of the environment variables overriding settings.
pub const ENV_PREFIX: &str = "SLAYER_";

pub const DEFAULT_DEPLOY_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_INVOKE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Administrative signer address. Required to deploy.
    pub deployer: Option<String>,
    /// Trusted execution signer, display byte order.
    pub trusted_signer: Option<String>,
    /// RPC endpoint override for the selected network.
    pub rpc_url: Option<String>,
    /// neo-go wallet file. Only usable when it has no password: tools run without a terminal.
    pub wallet: Option<PathBuf>,
    /// neo-go wallet config (wallet path and password). Takes precedence over `wallet`.
    /// One of the two is required on live networks.
    pub wallet_config: Option<PathBuf>,
    /// neo-express account used to sign local transactions.
    pub signer_alias: String,
    pub neo_go_bin: String,
    pub neoxp_bin: String,
    /// Directory holding `<name>.nef` / `<name>.manifest.json` pairs.
    pub build_dir: PathBuf,
    /// Directory holding `<network>_contracts.json` state files.
    pub state_dir: PathBuf,
    /// Local-network descriptor override.
    pub local_descriptor: Option<PathBuf>,
    pub deploy_timeout_secs: u64,
    pub invoke_timeout_secs: u64,
    /// Gateway used for wiring when the state has no gateway record.
    pub gateway_override: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            deployer: None,
            trusted_signer: None,
            rpc_url: None,
            wallet: None,
            wallet_config: None,
            signer_alias: "genesis".to_string(),
            neo_go_bin: "neo-go".to_string(),
            neoxp_bin: "neoxp".to_string(),
            build_dir: PathBuf::from("contracts/build"),
            state_dir: PathBuf::from("deploy/config"),
            local_descriptor: None,
            deploy_timeout_secs: DEFAULT_DEPLOY_TIMEOUT_SECS,
            invoke_timeout_secs: DEFAULT_INVOKE_TIMEOUT_SECS,
            gateway_override: None,
        }
    }
}

impl Settings {
    /// Defaults, then the settings file, then `SLAYER_*` environment variables.
    ///
    /// `config_path` replaces the default `Slayer.toml`. A missing file is not an error.
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let config_path = config_path.unwrap_or(Path::new(SETTINGS_FILENAME));

        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigurationError> {
        Self::from_figment(Self::figment(config_path))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigurationError> {
        let settings: Self = figment.extract().map_err(Box::new)?;
        settings.validate()?;

        tracing::debug!(?settings, "Settings loaded");
        Ok(settings)
    }

    /// Checks that hold for every command.
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.deploy_timeout_secs == 0 {
            return Err(ConfigurationError::Invalid {
                field: "deploy_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.invoke_timeout_secs == 0 {
            return Err(ConfigurationError::Invalid {
                field: "invoke_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.trusted_signer()?;
        self.gateway_override()?;
        Ok(())
    }

    pub fn require_deployer(&self) -> Result<&str, ConfigurationError> {
        self.deployer
            .as_deref()
            .filter(|deployer| !deployer.trim().is_empty())
            .ok_or(ConfigurationError::MissingField {
                field: "deployer",
                env: "DEPLOYER",
            })
    }

    /// The neo-go signing wallet, required on live networks.
    pub fn require_wallet(&self) -> Result<WalletSource<'_>, ConfigurationError> {
        match (&self.wallet_config, &self.wallet) {
            (Some(config), _) => Ok(WalletSource::Config(config)),
            (None, Some(wallet)) => Ok(WalletSource::File(wallet)),
            (None, None) => Err(ConfigurationError::MissingField {
                field: "wallet_config",
                env: "WALLET_CONFIG",
            }),
        }
    }

    pub fn trusted_signer(&self) -> Result<Option<Hash160>, ConfigurationError> {
        parse_hash160("trusted_signer", self.trusted_signer.as_deref())
    }

    pub fn require_trusted_signer(&self) -> Result<Hash160, ConfigurationError> {
        self.trusted_signer()?
            .ok_or(ConfigurationError::MissingField {
                field: "trusted_signer",
                env: "TRUSTED_SIGNER",
            })
    }

    pub fn gateway_override(&self) -> Result<Option<Hash160>, ConfigurationError> {
        parse_hash160("gateway_override", self.gateway_override.as_deref())
    }

    /// Everything a run needs to submit transactions on `profile`.
    pub fn validate_for_submission(&self, profile: &NetworkProfile) -> Result<(), ConfigurationError> {
        if !profile.is_local()
            && let WalletSource::File(wallet) = self.require_wallet()?
        {
            tracing::warn!(
                wallet = %wallet.display(),
                "Signing with a wallet file: neo-go cannot prompt for a password, set wallet_config if it has one"
            );
        }
        Ok(())
    }

    /// The network's profile with the endpoint and descriptor overrides applied.
    pub fn profile_for(&self, network: Network) -> NetworkProfile {
        let mut profile = network.profile();
        if let Some(rpc_url) = &self.rpc_url {
            profile = profile.with_rpc_url(rpc_url);
        }
        if let Some(descriptor) = &self.local_descriptor {
            profile = profile.with_local_descriptor(descriptor);
        }
        profile
    }

    /// Resolve a network name and apply the overrides.
    pub fn resolve_profile(&self, name: &str) -> Result<NetworkProfile, crate::UnknownNetworkError> {
        let profile = network::resolve(name)?;
        Ok(self.profile_for(profile.network))
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy_timeout_secs)
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout_secs)
    }
}

fn parse_hash160(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<Hash160>, ConfigurationError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().parse::<Hash160>())
        .transpose()
        .map_err(|e| ConfigurationError::Invalid {
            field,
            reason: e.to_string(),
        })
}
