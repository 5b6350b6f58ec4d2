//! slayer-deploy - Deployment library for the service layer contracts.
//!
//! This crate deploys the service layer contracts onto a Neo N3 network, records
//! what was deployed where, wires the deployed contracts together, and provides a
//! simulated harness to exercise them before deployment.

mod artifacts;
pub use artifacts::{
    ArtifactPair, ContractGroup, EXAMPLE_CONTRACTS, GATEWAY, MINIAPP_CONTRACTS,
    PLATFORM_CONTRACTS, SERVICE_CONTRACTS, catalogue, filter_artifacts,
};

mod config;
pub use config::{
    DEFAULT_DEPLOY_TIMEOUT_SECS, DEFAULT_INVOKE_TIMEOUT_SECS, ENV_PREFIX, SETTINGS_FILENAME,
    Settings,
};

mod deployer;
pub use deployer::{DeployAbort, DeployItem, DeployOutcome, Deployer, DeploymentReport};

pub mod error;
pub use error::{
    ConfigurationError, DeployError, FormatError, HarnessError, InitError, ParseError, ToolError,
    UnknownNetworkError,
};

mod export;
pub use export::{ExportFormat, address_env_var, deployed_addresses, export_addresses};

mod extract;
pub use extract::{extract_address, extract_tx_hash};

mod fs;

pub mod harness;

mod hash160;
pub use hash160::{HASH160_LEN, Hash160, reverse_hash160};

mod initializer;
pub use initializer::{
    DATAFEEDS_CONSUMER, InitReport, InitStage, InitStep, Initializer, SERVICE_FEES, StepOutcome,
    UPDATER_CONTRACTS,
};

pub mod network;
pub use network::{Network, NetworkProfile, resolve};

mod state;
pub use state::{
    DeploymentRecord, DeploymentState, DeploymentStatus, StateStore, TEMPLATE_FIELDS,
    load as load_state, save as save_state,
};

pub mod tool;
pub use tool::{ContractArg, ProcessRunner, ToolInvocation, ToolRunner, WalletSource};
