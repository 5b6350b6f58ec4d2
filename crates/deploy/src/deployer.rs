//! Deployment orchestrator.
//!
//! Contracts are deployed strictly one after the other, in catalogue order: later
//! contracts reference earlier ones, and the network orders transactions per account.

use std::path::PathBuf;

use crate::{
    ArtifactPair, DeploymentRecord, DeploymentState, Hash160, NetworkProfile, Settings,
    StateStore,
    error::{ConfigurationError, DeployError},
    extract::{extract_address, extract_tx_hash},
    tool::{NeoExpressCmdBuilder, NeoGoCmdBuilder, ToolInvocation, ToolRunner},
};

/// What happened to one artifact pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Deployed {
        address: Hash160,
        tx_hash: Option<String>,
    },
    /// A `deployed` record already exists on this network.
    AlreadyDeployed { address: Hash160 },
    /// At least one artifact file is absent. Not a failure.
    Skipped { missing: Vec<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployItem {
    pub name: String,
    pub outcome: DeployOutcome,
}

/// The failure that stopped a deployment run.
#[derive(Debug)]
pub struct DeployAbort {
    /// The contract being deployed when the run stopped.
    pub name: String,
    pub error: DeployError,
}

/// Result of [`Deployer::deploy_all`].
#[derive(Debug)]
pub struct DeploymentReport {
    pub network: String,
    /// Items processed before the run completed or stopped.
    pub items: Vec<DeployItem>,
    /// The state as persisted after the last item.
    pub state: DeploymentState,
    pub aborted: Option<DeployAbort>,
}

impl DeploymentReport {
    fn count(&self, f: impl Fn(&DeployOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| f(&item.outcome)).count()
    }

    pub fn deployed(&self) -> usize {
        self.count(|o| matches!(o, DeployOutcome::Deployed { .. }))
    }

    pub fn already_deployed(&self) -> usize {
        self.count(|o| matches!(o, DeployOutcome::AlreadyDeployed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeployOutcome::Skipped { .. }))
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// Deploys artifact pairs on one network and records every success immediately.
pub struct Deployer<'a, R> {
    settings: &'a Settings,
    profile: &'a NetworkProfile,
    runner: &'a R,
    store: StateStore,
}

impl<'a, R: ToolRunner> Deployer<'a, R> {
    pub fn new(settings: &'a Settings, profile: &'a NetworkProfile, runner: &'a R) -> Self {
        Self {
            settings,
            profile,
            runner,
            store: StateStore::for_network(&settings.state_dir, profile),
        }
    }

    /// Use a specific state file instead of `<state_dir>/<network>_contracts.json`.
    pub fn with_store(mut self, store: StateStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Deploy every artifact pair in order.
    ///
    /// Missing artifacts are skipped. The first tool, extraction or persistence failure
    /// stops the run and is returned in [`DeploymentReport::aborted`] along with the items
    /// processed so far; everything deployed before it stays recorded. Configuration and
    /// state-seeding failures happen before any submission and are returned as errors.
    pub async fn deploy_all(
        &self,
        artifacts: &[ArtifactPair],
        redeploy: bool,
    ) -> Result<DeploymentReport, DeployError> {
        let deployer = self.settings.require_deployer()?;
        self.settings.validate_for_submission(self.profile)?;

        let network = self.profile.name();
        tracing::info!(
            %network,
            rpc_url = %self.profile.rpc_url,
            state = %self.store.path().display(),
            contracts = artifacts.len(),
            "Starting deployment..."
        );

        let mut state = self.store.seed(self.profile, deployer)?;
        let mut items = Vec::with_capacity(artifacts.len());
        let mut aborted = None;

        for artifact in artifacts {
            match self.deploy_and_record(artifact, deployer, &mut state, redeploy).await {
                Ok(outcome) => items.push(DeployItem {
                    name: artifact.name.clone(),
                    outcome,
                }),
                Err(error) => {
                    tracing::error!(contract = %artifact.name, err = %error, "Deployment failed, aborting run");
                    aborted = Some(DeployAbort {
                        name: artifact.name.clone(),
                        error,
                    });
                    break;
                }
            }
        }

        let report = DeploymentReport {
            network,
            items,
            state,
            aborted,
        };
        tracing::info!(
            deployed = report.deployed(),
            already_deployed = report.already_deployed(),
            skipped = report.skipped(),
            aborted = report.is_aborted(),
            "Deployment finished"
        );
        Ok(report)
    }

    async fn deploy_and_record(
        &self,
        artifact: &ArtifactPair,
        deployer: &str,
        state: &mut DeploymentState,
        redeploy: bool,
    ) -> Result<DeployOutcome, DeployError> {
        let outcome = self.deploy_one(artifact, deployer, state, redeploy).await?;

        if let DeployOutcome::Deployed { address, tx_hash } = &outcome {
            let record =
                DeploymentRecord::deployed(&artifact.name, *address, &state.network, tx_hash.clone());
            *state = self.store.record_deployment(artifact.group, record)?;
        }
        Ok(outcome)
    }

    async fn deploy_one(
        &self,
        artifact: &ArtifactPair,
        deployer: &str,
        state: &DeploymentState,
        redeploy: bool,
    ) -> Result<DeployOutcome, DeployError> {
        let missing = artifact.missing_files();
        if !missing.is_empty() {
            tracing::warn!(
                contract = %artifact.name,
                missing = ?missing,
                "Artifacts not found, skipping"
            );
            return Ok(DeployOutcome::Skipped {
                missing: missing.into_iter().map(PathBuf::from).collect(),
            });
        }

        if !redeploy
            && let Some(existing) = state
                .records(artifact.group)
                .get(&artifact.name)
                .filter(|record| record.is_deployed_on(&state.network))
        {
            tracing::info!(
                contract = %artifact.name,
                address = %existing.address,
                "Already deployed, skipping"
            );
            return Ok(DeployOutcome::AlreadyDeployed {
                address: existing.address,
            });
        }

        let expected = self.expected_address(artifact, deployer).await?;
        tracing::info!(contract = %artifact.name, expected = %expected, "Deploying...");

        let output = self.runner.run(&self.deploy_invocation(artifact)?).await?;

        let address = extract_address(&output)?;
        let tx_hash = extract_tx_hash(&output);

        if address != expected {
            tracing::warn!(
                contract = %artifact.name,
                %expected,
                actual = %address,
                "Deployed address differs from the pre-computed one, recording the actual address"
            );
        }

        tracing::info!(
            contract = %artifact.name,
            %address,
            tx_hash = tx_hash.as_deref().unwrap_or("-"),
            "Deployed"
        );
        Ok(DeployOutcome::Deployed { address, tx_hash })
    }

    /// Ask the tool for the deterministic address of `artifact` sent by `deployer`.
    async fn expected_address(
        &self,
        artifact: &ArtifactPair,
        deployer: &str,
    ) -> Result<Hash160, DeployError> {
        let invocation = ToolInvocation::new(
            &self.settings.neo_go_bin,
            NeoGoCmdBuilder::calc_hash(deployer, &artifact.binary, &artifact.manifest),
            self.settings.invoke_timeout(),
        );
        let output = self.runner.run(&invocation).await?;
        Ok(extract_address(&output)?)
    }

    fn deploy_invocation(&self, artifact: &ArtifactPair) -> Result<ToolInvocation, ConfigurationError> {
        let timeout = self.settings.deploy_timeout();

        match &self.profile.local_network_descriptor {
            Some(descriptor) => Ok(ToolInvocation::new(
                &self.settings.neoxp_bin,
                NeoExpressCmdBuilder::new(descriptor, &self.settings.signer_alias)
                    .deploy(&artifact.binary),
                timeout,
            )),
            None => Ok(ToolInvocation::new(
                &self.settings.neo_go_bin,
                NeoGoCmdBuilder::new()
                    .rpc_url(&self.profile.rpc_url)
                    .wallet(self.settings.require_wallet()?)
                    .deploy(&artifact.binary, &artifact.manifest),
                timeout,
            )),
        }
    }
}
