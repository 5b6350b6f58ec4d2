//! Persisted, resumable record of what has been deployed where.
//!
//! The state file is a pretty-printed JSON document with stable key order. It is
//! rewritten in full after every single successful deployment, under an exclusive
//! lock, so a run that dies halfway keeps every deployment that completed before it.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ContractGroup, Hash160, NetworkProfile,
    error::{ConfigurationError, DeployError},
    fs::FsHandler,
};

/// Template metadata carried over when a record is replaced.
///
/// Any other extra field of the previous record is dropped on replacement.
pub const TEMPLATE_FIELDS: &[&str] = &["display_name", "description", "category"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Deployed,
    Failed,
}

/// Persisted fact that a named contract is live at an address on a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub name: String,
    pub address: Hash160,
    pub network: String,
    pub status: DeploymentStatus,
    pub deployed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Template metadata (e.g. a display name) seeded from another network's record.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DeploymentRecord {
    /// A fresh `deployed` record stamped with the current time.
    pub fn deployed(
        name: impl Into<String>,
        address: Hash160,
        network: impl Into<String>,
        tx_hash: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address,
            network: network.into(),
            status: DeploymentStatus::Deployed,
            deployed_at: Utc::now(),
            tx_hash,
            extra: BTreeMap::new(),
        }
    }

    pub fn is_deployed_on(&self, network: &str) -> bool {
        self.status == DeploymentStatus::Deployed && self.network == network
    }
}

/// Top-level persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentState {
    pub network: String,
    #[serde(default)]
    pub rpc_endpoints: Vec<String>,
    #[serde(default)]
    pub network_magic: u32,
    #[serde(default)]
    pub deployer: String,
    #[serde(default)]
    pub contracts: BTreeMap<String, DeploymentRecord>,
    #[serde(default)]
    pub miniapp_contracts: BTreeMap<String, DeploymentRecord>,
    pub updated_at: DateTime<Utc>,
}

impl Default for DeploymentState {
    fn default() -> Self {
        Self {
            network: String::new(),
            rpc_endpoints: Vec::new(),
            network_magic: 0,
            deployer: String::new(),
            contracts: BTreeMap::new(),
            miniapp_contracts: BTreeMap::new(),
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl DeploymentState {
    /// Refresh the header fields from the active profile, keeping every record.
    pub fn seed(&mut self, profile: &NetworkProfile, deployer: &str) {
        self.network = profile.name();
        self.network_magic = profile.network_magic;
        self.deployer = deployer.to_string();
        self.rpc_endpoints.retain(|url| url != &profile.rpc_url);
        self.rpc_endpoints.insert(0, profile.rpc_url.clone());
    }

    pub fn records(&self, group: ContractGroup) -> &BTreeMap<String, DeploymentRecord> {
        match group {
            ContractGroup::Core => &self.contracts,
            ContractGroup::MiniApp => &self.miniapp_contracts,
        }
    }

    fn records_mut(&mut self, group: ContractGroup) -> &mut BTreeMap<String, DeploymentRecord> {
        match group {
            ContractGroup::Core => &mut self.contracts,
            ContractGroup::MiniApp => &mut self.miniapp_contracts,
        }
    }

    /// Look a contract up in either map.
    pub fn get(&self, name: &str) -> Option<&DeploymentRecord> {
        self.contracts
            .get(name)
            .or_else(|| self.miniapp_contracts.get(name))
    }

    /// Address of a contract deployed on this state's network.
    pub fn deployed_address(&self, name: &str) -> Option<Hash160> {
        self.get(name)
            .filter(|record| record.is_deployed_on(&self.network))
            .map(|record| record.address)
    }

    /// Replace the record under `record.name` wholesale.
    ///
    /// Only the [`TEMPLATE_FIELDS`] of a previous record survive, and only when the new
    /// record does not set them itself.
    pub fn merge_record(&mut self, group: ContractGroup, mut record: DeploymentRecord) {
        let records = self.records_mut(group);

        if let Some(previous) = records.remove(&record.name) {
            for (key, value) in previous.extra {
                if TEMPLATE_FIELDS.contains(&key.as_str()) {
                    record.extra.entry(key).or_insert(value);
                }
            }
        }

        records.insert(record.name.clone(), record);
    }

    /// Advance `updated_at`, strictly past its previous value.
    fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + TimeDelta::microseconds(1)
        };
    }
}

/// Load the state at `path`, or a default state if the file doesn't exist yet.
pub fn load(path: &Path) -> Result<DeploymentState, DeployError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No deployment state yet, starting empty");
        return Ok(DeploymentState::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| DeployError::State {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `state` to `path` in full, advancing its `updated_at`.
pub fn save(path: &Path, state: &mut DeploymentState) -> Result<(), DeployError> {
    state.touch();

    let mut json = serde_json::to_string_pretty(state).map_err(|source| DeployError::State {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');

    FsHandler::write_atomically(path, json.as_bytes())?;
    tracing::debug!(path = %path.display(), updated_at = %state.updated_at, "Deployment state saved");
    Ok(())
}

/// A deployment state file bound to one network.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<state_dir>/<network>_contracts.json`.
    pub fn for_network(state_dir: &Path, profile: &NetworkProfile) -> Self {
        Self::new(state_dir.join(format!("{}_contracts.json", profile.name())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<DeploymentState, DeployError> {
        load(&self.path)
    }

    /// Load a state that must already exist (initialization reads, never creates).
    pub fn load_existing(&self) -> Result<DeploymentState, DeployError> {
        if !self.path.exists() {
            return Err(ConfigurationError::MissingStateFile(self.path.clone()).into());
        }
        self.load()
    }

    /// Refresh the header fields on disk from the active profile.
    pub fn seed(
        &self,
        profile: &NetworkProfile,
        deployer: &str,
    ) -> Result<DeploymentState, DeployError> {
        self.update(|state| state.seed(profile, deployer))
    }

    /// Merge one record and persist the whole state immediately.
    pub fn record_deployment(
        &self,
        group: ContractGroup,
        record: DeploymentRecord,
    ) -> Result<DeploymentState, DeployError> {
        self.update(|state| state.merge_record(group, record))
    }

    /// One load-mutate-save cycle under the store's exclusive lock.
    fn update(
        &self,
        mutate: impl FnOnce(&mut DeploymentState),
    ) -> Result<DeploymentState, DeployError> {
        let _lock = FsHandler::lock_exclusive(&self.path)?;
        let mut state = self.load()?;
        mutate(&mut state);
        save(&self.path, &mut state)?;
        Ok(state)
    }
}
