//! Post-deployment configuration.
//!
//! Initialization is planned from the deployment state, then executed one call at a
//! time. Every call is a setter, so re-running is safe. A failed call is reported and
//! the remaining calls are still attempted.

use crate::{
    ContractArg, DeploymentState, Hash160, NetworkProfile, Settings,
    artifacts::{EXAMPLE_CONTRACTS, GATEWAY, SERVICE_CONTRACTS},
    error::{ConfigurationError, InitError},
    extract::extract_tx_hash,
    tool::{NeoExpressCmdBuilder, NeoGoCmdBuilder, ToolInvocation, ToolRunner},
};

/// Contracts whose updater role is given to the trusted signer.
pub const UPDATER_CONTRACTS: &[&str] = &["PriceFeed", "RandomnessLog", "AutomationAnchor"];

/// Per-request fee of each service, in GAS fractions (1 GAS = 10^8).
pub const SERVICE_FEES: &[(&str, i64)] = &[
    ("vrf", 100_000),
    ("mixer", 5_000_000),
    ("datafeeds", 10_000),
    ("automation", 50_000),
];

/// Consumer of the data feeds service, wired to it in addition to the gateway.
pub const DATAFEEDS_CONSUMER: &str = "DeFiPriceConsumer";
const DATAFEEDS_SERVICE: &str = "DataFeedsService";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum InitStage {
    /// Updater roles for the trusted signer.
    Roles,
    /// Trusted signer registration with the gateway.
    TeeSigner,
    /// Per-service fee schedule.
    Fees,
    /// Service implementations registered with the gateway.
    Services,
    /// Consumers pointed at the gateway and their secondary services.
    Wiring,
}

#[derive(Debug)]
pub enum StepOutcome {
    Succeeded { tx_hash: Option<String> },
    /// A precondition is absent from the state.
    Skipped { reason: String },
    /// The step cannot be automated on this network.
    Refused(InitError),
    Failed(InitError),
}

#[derive(Debug)]
pub struct InitStep {
    pub stage: InitStage,
    /// The contract (or service type) the step configures.
    pub target: String,
    pub method: &'static str,
    pub outcome: StepOutcome,
}

/// Result of [`Initializer::initialize`].
#[derive(Debug)]
pub struct InitReport {
    pub network: String,
    pub steps: Vec<InitStep>,
    /// Whether a filter selected the steps. Refusals only count as failures then.
    pub filtered: bool,
}

impl InitReport {
    pub fn is_failure(&self, step: &InitStep) -> bool {
        match step.outcome {
            StepOutcome::Failed(_) => true,
            StepOutcome::Refused(_) => self.filtered,
            _ => false,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Succeeded { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Skipped { .. }))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| self.is_failure(s)).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }
}

enum Action {
    Invoke {
        contract: Hash160,
        args: Vec<ContractArg>,
    },
    Skip(String),
    Refuse,
}

struct PlannedStep {
    stage: InitStage,
    target: String,
    method: &'static str,
    action: Action,
}

impl PlannedStep {
    fn new(stage: InitStage, target: impl Into<String>, method: &'static str, action: Action) -> Self {
        Self {
            stage,
            target: target.into(),
            method,
            action,
        }
    }

    fn matches(&self, filter: &str) -> bool {
        [self.stage.to_string().as_str(), self.target.as_str(), self.method]
            .iter()
            .any(|field| field.to_lowercase().contains(filter))
    }
}

fn not_deployed(name: &str) -> Action {
    Action::Skip(format!("{name} is not deployed"))
}

/// Runs the initialization stages against one network.
pub struct Initializer<'a, R> {
    settings: &'a Settings,
    profile: &'a NetworkProfile,
    runner: &'a R,
}

impl<'a, R: ToolRunner> Initializer<'a, R> {
    pub fn new(settings: &'a Settings, profile: &'a NetworkProfile, runner: &'a R) -> Self {
        Self {
            settings,
            profile,
            runner,
        }
    }

    /// Plan and execute every selected step.
    ///
    /// Only configuration problems are returned as errors; per-step failures are
    /// recorded in the report.
    pub async fn initialize(
        &self,
        state: &DeploymentState,
        filter: Option<&str>,
    ) -> Result<InitReport, ConfigurationError> {
        let filter = filter.map(str::to_lowercase);
        let gateway = match state.deployed_address(GATEWAY) {
            Some(address) => Some(address),
            None => self.settings.gateway_override()?,
        };

        let planned: Vec<_> = self
            .plan(state, gateway)
            .into_iter()
            .filter(|step| filter.as_deref().is_none_or(|f| step.matches(f)))
            .collect();

        // Only ask for credentials when a selected step will actually submit something.
        if planned.iter().any(|s| matches!(s.action, Action::Invoke { .. })) {
            self.settings.validate_for_submission(self.profile)?;
            if !self.profile.is_local() {
                self.settings.require_deployer()?;
            }
        }
        let signer_needed = planned.iter().any(|s| {
            matches!(s.stage, InitStage::Roles | InitStage::TeeSigner)
                && matches!(s.action, Action::Invoke { .. })
        });
        let signer = if signer_needed {
            Some(self.settings.require_trusted_signer()?)
        } else {
            None
        };

        tracing::info!(
            network = %self.profile.name(),
            steps = planned.len(),
            gateway = %gateway.map_or_else(|| "-".to_string(), |g| g.to_string()),
            "Starting initialization..."
        );

        let mut steps = Vec::with_capacity(planned.len());
        for step in planned {
            let outcome = self.execute(&step, signer).await;
            steps.push(InitStep {
                stage: step.stage,
                target: step.target,
                method: step.method,
                outcome,
            });
        }

        let report = InitReport {
            network: self.profile.name(),
            steps,
            filtered: filter.is_some(),
        };
        tracing::info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failures(),
            "Initialization complete"
        );
        Ok(report)
    }

    /// The ordered list of steps for `state`, before filtering.
    fn plan(&self, state: &DeploymentState, gateway: Option<Hash160>) -> Vec<PlannedStep> {
        let mut steps = Vec::new();

        // Role arguments are filled in with the trusted signer at execution time.
        for name in UPDATER_CONTRACTS {
            let action = match state.deployed_address(name) {
                None => not_deployed(name),
                Some(_) if !self.profile.is_local() => Action::Refuse,
                Some(contract) => Action::Invoke {
                    contract,
                    args: Vec::new(),
                },
            };
            steps.push(PlannedStep::new(InitStage::Roles, *name, "setUpdater", action));
        }

        let Some(gateway) = gateway else {
            for stage in [InitStage::TeeSigner, InitStage::Fees, InitStage::Services, InitStage::Wiring] {
                steps.push(PlannedStep::new(stage, GATEWAY, "-", not_deployed(GATEWAY)));
            }
            return steps;
        };

        steps.push(PlannedStep::new(
            InitStage::TeeSigner,
            GATEWAY,
            "registerTEEAccount",
            Action::Invoke {
                contract: gateway,
                args: Vec::new(),
            },
        ));

        for (service, fee) in SERVICE_FEES {
            steps.push(PlannedStep::new(
                InitStage::Fees,
                *service,
                "setServiceFee",
                Action::Invoke {
                    contract: gateway,
                    args: vec![ContractArg::from(*service), ContractArg::from(*fee)],
                },
            ));
        }

        for (service, name) in SERVICE_CONTRACTS {
            let action = match state.deployed_address(name) {
                None => not_deployed(name),
                Some(implementation) => Action::Invoke {
                    contract: gateway,
                    args: vec![ContractArg::from(*service), ContractArg::from(implementation)],
                },
            };
            steps.push(PlannedStep::new(InitStage::Services, *service, "registerService", action));
        }

        let consumers = EXAMPLE_CONTRACTS
            .iter()
            .map(|name| name.to_string())
            .chain(state.miniapp_contracts.keys().cloned());
        for name in consumers {
            let action = match state.deployed_address(&name) {
                None => not_deployed(&name),
                Some(contract) => Action::Invoke {
                    contract,
                    args: vec![ContractArg::from(gateway)],
                },
            };
            steps.push(PlannedStep::new(InitStage::Wiring, name, "setGateway", action));
        }

        let action = match (
            state.deployed_address(DATAFEEDS_CONSUMER),
            state.deployed_address(DATAFEEDS_SERVICE),
        ) {
            (None, _) => not_deployed(DATAFEEDS_CONSUMER),
            (_, None) => not_deployed(DATAFEEDS_SERVICE),
            (Some(contract), Some(feeds)) => Action::Invoke {
                contract,
                args: vec![ContractArg::from(feeds)],
            },
        };
        steps.push(PlannedStep::new(
            InitStage::Wiring,
            DATAFEEDS_CONSUMER,
            "setDataFeedsContract",
            action,
        ));

        steps
    }

    async fn execute(&self, step: &PlannedStep, signer: Option<Hash160>) -> StepOutcome {
        let (contract, mut args) = match &step.action {
            Action::Skip(reason) => {
                tracing::warn!(stage = %step.stage, target = %step.target, %reason, "Skipping");
                return StepOutcome::Skipped {
                    reason: reason.clone(),
                };
            }
            Action::Refuse => {
                let err = InitError::ManualActionRequired {
                    stage: step.stage,
                    network: self.profile.name(),
                };
                tracing::warn!(stage = %step.stage, target = %step.target, "{err}");
                return StepOutcome::Refused(err);
            }
            Action::Invoke { contract, args } => (*contract, args.clone()),
        };

        if matches!(step.stage, InitStage::Roles | InitStage::TeeSigner)
            && let Some(signer) = signer
        {
            args.push(ContractArg::from(signer));
        }

        let invocation = match self.invocation(&contract, step.method, &args) {
            Ok(invocation) => invocation,
            Err(e) => {
                return StepOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        match self.runner.run(&invocation).await {
            Ok(output) => {
                let tx_hash = extract_tx_hash(&output);
                tracing::info!(
                    stage = %step.stage,
                    target = %step.target,
                    method = step.method,
                    tx_hash = tx_hash.as_deref().unwrap_or("-"),
                    "Done"
                );
                StepOutcome::Succeeded { tx_hash }
            }
            Err(e) => {
                tracing::error!(
                    stage = %step.stage,
                    target = %step.target,
                    method = step.method,
                    err = %e,
                    "Failed"
                );
                StepOutcome::Failed(e.into())
            }
        }
    }

    fn invocation(
        &self,
        contract: &Hash160,
        method: &str,
        args: &[ContractArg],
    ) -> Result<ToolInvocation, ConfigurationError> {
        let timeout = self.settings.invoke_timeout();
        let contract = contract.to_string();

        match &self.profile.local_network_descriptor {
            Some(descriptor) => Ok(ToolInvocation::new(
                &self.settings.neoxp_bin,
                NeoExpressCmdBuilder::new(descriptor, &self.settings.signer_alias)
                    .invoke(&contract, method, args),
                timeout,
            )),
            None => Ok(ToolInvocation::new(
                &self.settings.neo_go_bin,
                NeoGoCmdBuilder::new()
                    .rpc_url(&self.profile.rpc_url)
                    .wallet(self.settings.require_wallet()?)
                    .invoke(&contract, method, args, Some(self.settings.require_deployer()?)),
                timeout,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{ContractGroup, DeploymentRecord, Network, error::ToolError};

    const SIGNER: &str = "0x0102030405060708090a0b0c0d0e0f1011121314";

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<ToolInvocation>>,
        fail_method: Option<&'static str>,
    }

    impl RecordingRunner {
        fn methods(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| {
                    let run = c.args.iter().position(|a| a == "run" || a == "invokefunction")?;
                    // Skip the flags between the subcommand and the contract.
                    c.args[run..]
                        .iter()
                        .skip_while(|a| !a.starts_with("0x"))
                        .nth(1)
                        .cloned()
                })
                .collect()
        }
    }

    impl ToolRunner for RecordingRunner {
        async fn run(&self, invocation: &ToolInvocation) -> Result<String, ToolError> {
            self.calls.lock().unwrap().push(invocation.clone());
            if let Some(method) = self.fail_method
                && invocation.args.iter().any(|a| a == method)
            {
                return Err(ToolError::Exited {
                    program: invocation.program.clone(),
                    exit_code: Some(1),
                    stdout: String::new(),
                    stderr: "FAULT".to_string(),
                });
            }
            Ok("{\"state\": \"HALT\"}".to_string())
        }
    }

    fn addr(byte: u8) -> Hash160 {
        Hash160::from_bytes([byte; 20])
    }

    fn state_with(profile: &NetworkProfile, names: &[&str]) -> DeploymentState {
        let mut state = DeploymentState::default();
        state.seed(profile, "deployer");
        for (i, name) in names.iter().enumerate() {
            let group = if name.starts_with("MiniApp") {
                ContractGroup::MiniApp
            } else {
                ContractGroup::Core
            };
            state.merge_record(
                group,
                DeploymentRecord::deployed(*name, addr(i as u8 + 1), profile.name(), None),
            );
        }
        state
    }

    fn settings() -> Settings {
        Settings {
            deployer: Some("NbnjKGMBJzJ6j5PHeYhjJDaQ5Vy5UYu4Fv".to_string()),
            trusted_signer: Some(SIGNER.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_local_initialization_order() {
        let profile = Network::NeoExpress.profile();
        let state = state_with(
            &profile,
            &[GATEWAY, "PriceFeed", "VRFService", "DataFeedsService", "DeFiPriceConsumer", "MiniAppLottery"],
        );
        let settings = settings();
        let runner = RecordingRunner::default();

        let report = Initializer::new(&settings, &profile, &runner)
            .initialize(&state, None)
            .await
            .unwrap();

        assert!(!report.has_failures());
        assert_eq!(
            runner.methods(),
            vec![
                "setUpdater",
                "registerTEEAccount",
                "setServiceFee",
                "setServiceFee",
                "setServiceFee",
                "setServiceFee",
                "registerService",
                "registerService",
                "setGateway",
                "setGateway",
                "setDataFeedsContract",
            ]
        );
    }

    #[tokio::test]
    async fn test_signer_passed_in_invocation_order() {
        let profile = Network::NeoExpress.profile();
        let state = state_with(&profile, &["PriceFeed"]);
        let settings = settings();
        let runner = RecordingRunner::default();

        Initializer::new(&settings, &profile, &runner)
            .initialize(&state, Some("roles"))
            .await
            .unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0]
            .args
            .contains(&"0x14131211100f0e0d0c0b0a090807060504030201".to_string()));
        // The contract itself is addressed in display order.
        assert!(calls[0].args.contains(&addr(1).to_string()));
    }

    #[tokio::test]
    async fn test_without_gateway_skips_dependent_stages() {
        let profile = Network::NeoExpress.profile();
        let state = state_with(&profile, &["PriceFeed", "VRFService"]);
        let settings = settings();
        let runner = RecordingRunner::default();

        let report = Initializer::new(&settings, &profile, &runner)
            .initialize(&state, None)
            .await
            .unwrap();

        assert!(!report.has_failures());
        assert_eq!(runner.methods(), vec!["setUpdater"]);
        for stage in [InitStage::TeeSigner, InitStage::Fees, InitStage::Services, InitStage::Wiring] {
            assert!(report
                .steps
                .iter()
                .filter(|s| s.stage == stage)
                .all(|s| matches!(s.outcome, StepOutcome::Skipped { .. })));
        }
    }

    #[tokio::test]
    async fn test_gateway_override_used_when_not_deployed() {
        let profile = Network::NeoExpress.profile();
        let state = state_with(&profile, &["VRFLottery"]);
        let settings = Settings {
            gateway_override: Some("0xabababababababababababababababababababab".to_string()),
            ..settings()
        };
        let runner = RecordingRunner::default();

        Initializer::new(&settings, &profile, &runner)
            .initialize(&state, Some("wiring"))
            .await
            .unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0]
            .args
            .contains(&"0xabababababababababababababababababababab".to_string()));
    }

    #[tokio::test]
    async fn test_failures_are_independent() {
        let profile = Network::NeoExpress.profile();
        let state = state_with(&profile, &[GATEWAY, "PriceFeed", "RandomnessLog"]);
        let settings = settings();
        let runner = RecordingRunner {
            fail_method: Some("setUpdater"),
            ..Default::default()
        };

        let report = Initializer::new(&settings, &profile, &runner)
            .initialize(&state, None)
            .await
            .unwrap();

        assert_eq!(report.failures(), 2);
        let fees = report
            .steps
            .iter()
            .filter(|s| s.stage == InitStage::Fees)
            .filter(|s| matches!(s.outcome, StepOutcome::Succeeded { .. }))
            .count();
        assert_eq!(fees, SERVICE_FEES.len());
    }

    #[tokio::test]
    async fn test_live_network_refuses_roles() {
        let profile = Network::Testnet.profile();
        let state = state_with(&profile, &["PriceFeed"]);
        let settings = Settings {
            wallet_config: Some("deploy/wallets/deployer.yml".into()),
            ..settings()
        };
        let runner = RecordingRunner::default();
        let initializer = Initializer::new(&settings, &profile, &runner);

        let report = initializer.initialize(&state, None).await.unwrap();
        let refused = report
            .steps
            .iter()
            .find(|s| s.target == "PriceFeed")
            .unwrap();
        assert!(matches!(
            refused.outcome,
            StepOutcome::Refused(InitError::ManualActionRequired { stage: InitStage::Roles, .. })
        ));
        assert!(!report.has_failures());

        // Explicitly asked for: the refusal is a failure.
        let report = initializer.initialize(&state, Some("roles")).await.unwrap();
        assert!(report.has_failures());
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_trusted_signer_is_configuration_error() {
        let profile = Network::NeoExpress.profile();
        let state = state_with(&profile, &[GATEWAY]);
        let settings = Settings {
            trusted_signer: None,
            ..settings()
        };
        let runner = RecordingRunner::default();

        let err = Initializer::new(&settings, &profile, &runner)
            .initialize(&state, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingField { field: "trusted_signer", .. }
        ));

        // Steps that don't need the signer run without it.
        let report = Initializer::new(&settings, &profile, &runner)
            .initialize(&state, Some("fees"))
            .await
            .unwrap();
        assert_eq!(report.succeeded(), SERVICE_FEES.len());
    }
}
