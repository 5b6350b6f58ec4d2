//! Compiled contract artifacts and the fixed deployment catalogue.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which map of the deployment state a contract is recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractGroup {
    /// Platform, service and example contracts (`contracts`).
    Core,
    /// MiniApp contracts (`miniapp_contracts`).
    MiniApp,
}

/// A contract's compiled binary (NEF) and its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPair {
    pub name: String,
    pub binary: PathBuf,
    pub manifest: PathBuf,
    pub group: ContractGroup,
}

impl ArtifactPair {
    pub fn new(
        name: impl Into<String>,
        binary: impl Into<PathBuf>,
        manifest: impl Into<PathBuf>,
        group: ContractGroup,
    ) -> Self {
        Self {
            name: name.into(),
            binary: binary.into(),
            manifest: manifest.into(),
            group,
        }
    }

    /// `<build_dir>/<name>.nef` and `<build_dir>/<name>.manifest.json`.
    pub fn in_build_dir(build_dir: &Path, name: &str, group: ContractGroup) -> Self {
        Self::new(
            name,
            build_dir.join(format!("{name}.nef")),
            build_dir.join(format!("{name}.manifest.json")),
            group,
        )
    }

    /// Artifact files that do not exist on disk.
    pub fn missing_files(&self) -> Vec<&Path> {
        [self.binary.as_path(), self.manifest.as_path()]
            .into_iter()
            .filter(|path| !path.is_file())
            .collect()
    }
}

/// Name of the gateway contract that routes service requests.
pub const GATEWAY: &str = "ServiceLayerGateway";

/// Platform contracts, in deployment order. The gateway comes first: every
/// later stage wires contracts to it.
pub const PLATFORM_CONTRACTS: &[&str] = &[
    GATEWAY,
    "PaymentHub",
    "Governance",
    "PriceFeed",
    "RandomnessLog",
    "AppRegistry",
    "AutomationAnchor",
];

/// Service implementations registered with the gateway, keyed by service type.
pub const SERVICE_CONTRACTS: &[(&str, &str)] = &[
    ("vrf", "VRFService"),
    ("mixer", "MixerService"),
    ("datafeeds", "DataFeedsService"),
    ("automation", "AutomationService"),
];

/// Example consumer contracts.
pub const EXAMPLE_CONTRACTS: &[&str] = &["VRFLottery", "MixerClient", "DeFiPriceConsumer"];

pub const MINIAPP_CONTRACTS: &[&str] = &[
    "MiniAppLottery",
    "MiniAppCoinFlip",
    "MiniAppDiceGame",
    "MiniAppScratchCard",
    "MiniAppPredictionMarket",
    "MiniAppFlashLoan",
    "MiniAppPriceTicker",
    "MiniAppGasSpin",
    "MiniAppPricePredict",
    "MiniAppSecretVote",
    "MiniAppSecretPoker",
    "MiniAppMicroPredict",
    "MiniAppRedEnvelope",
    "MiniAppGasCircle",
    "MiniAppFogChess",
    "MiniAppGovBooster",
    "MiniAppTurboOptions",
    "MiniAppILGuard",
    "MiniAppGuardianPolicy",
    "MiniAppCouncilGovernance",
    "MiniAppAITrader",
    "MiniAppGridBot",
    "MiniAppNFTEvolve",
    "MiniAppBridgeGuardian",
];

/// The full ordered artifact list for a build directory.
pub fn catalogue(build_dir: &Path) -> Vec<ArtifactPair> {
    let core = PLATFORM_CONTRACTS
        .iter()
        .copied()
        .chain(SERVICE_CONTRACTS.iter().map(|(_, name)| *name))
        .chain(EXAMPLE_CONTRACTS.iter().copied())
        .map(|name| ArtifactPair::in_build_dir(build_dir, name, ContractGroup::Core));

    let miniapps = MINIAPP_CONTRACTS
        .iter()
        .map(|name| ArtifactPair::in_build_dir(build_dir, name, ContractGroup::MiniApp));

    core.chain(miniapps).collect()
}

/// Keep the artifacts whose name contains `filter` (case-insensitive).
pub fn filter_artifacts(artifacts: Vec<ArtifactPair>, filter: Option<&str>) -> Vec<ArtifactPair> {
    match filter {
        None => artifacts,
        Some(filter) => {
            let filter = filter.to_lowercase();
            artifacts
                .into_iter()
                .filter(|a| a.name.to_lowercase().contains(&filter))
                .collect()
        }
    }
}
