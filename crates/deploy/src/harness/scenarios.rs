//! Functional scenarios, registered per service type.

use std::collections::BTreeMap;

use crate::{
    ContractArg, Hash160,
    artifacts::{GATEWAY, SERVICE_CONTRACTS},
    error::HarnessError,
    harness::session::{FairyClient, InvokeResult, VmState},
};

/// A scenario body. Returns the gas reported by its key invocation, or 0.
pub type ScenarioFn = fn(&mut ScenarioContext<'_>) -> Result<u64, HarnessError>;

#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub run: ScenarioFn,
}

/// The scenarios exercising one service type.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioGroup {
    /// Service type tag, as registered with the gateway.
    pub service: &'static str,
    pub title: &'static str,
    pub scenarios: &'static [Scenario],
}

impl ScenarioGroup {
    /// Scenarios selected by a lowercase `filter`: all of them when the group's tag
    /// or title matches, otherwise those whose name matches.
    pub fn select(&self, filter: Option<&str>) -> Vec<Scenario> {
        let Some(filter) = filter else {
            return self.scenarios.to_vec();
        };
        if self.service.contains(filter) || self.title.to_lowercase().contains(filter) {
            return self.scenarios.to_vec();
        }
        self.scenarios
            .iter()
            .filter(|s| s.name.contains(filter))
            .copied()
            .collect()
    }
}

pub const REGISTRY: &[ScenarioGroup] = &[
    ScenarioGroup {
        service: "vrf",
        title: "VRFServiceTests",
        scenarios: &[
            Scenario {
                name: "vrf_request_creation",
                run: vrf_request_creation,
            },
            Scenario {
                name: "vrf_callback",
                run: vrf_callback,
            },
            Scenario {
                name: "lottery_lifecycle",
                run: lottery_lifecycle,
            },
        ],
    },
    ScenarioGroup {
        service: "mixer",
        title: "MixerServiceTests",
        scenarios: &[
            Scenario {
                name: "mixer_request",
                run: mixer_request,
            },
            Scenario {
                name: "token_validation",
                run: token_validation,
            },
            Scenario {
                name: "mixer_client_flow",
                run: mixer_client_flow,
            },
        ],
    },
    ScenarioGroup {
        service: "datafeeds",
        title: "DataFeedsServiceTests",
        scenarios: &[
            Scenario {
                name: "price_feed",
                run: price_feed,
            },
            Scenario {
                name: "oracle_request",
                run: oracle_request,
            },
            Scenario {
                name: "defi_positions",
                run: defi_positions,
            },
        ],
    },
];

/// A fresh session with the gateway and every available service deployed.
pub struct ScenarioContext<'c> {
    pub client: &'c mut FairyClient,
    pub gateway: Hash160,
    pub services: BTreeMap<&'static str, Hash160>,
}

impl<'c> ScenarioContext<'c> {
    pub fn setup(client: &'c mut FairyClient) -> Result<Self, HarnessError> {
        client.create_session();
        let gateway = client.virtual_deploy(GATEWAY)?;

        let mut services = BTreeMap::new();
        for (service, name) in SERVICE_CONTRACTS {
            if client.has_artifact(name) {
                services.insert(*service, client.virtual_deploy(name)?);
            }
        }

        Ok(Self {
            client,
            gateway,
            services,
        })
    }

    pub fn service(&self, service: &str) -> Result<Hash160, HarnessError> {
        self.services
            .get(service)
            .copied()
            .ok_or_else(|| HarnessError::NotDeployed(service.to_string()))
    }

    fn invoke(
        &mut self,
        contract: Hash160,
        method: &str,
        args: Vec<ContractArg>,
    ) -> Result<InvokeResult, HarnessError> {
        self.client.invoke(contract, method, args)
    }

    /// Deploy a consumer and point it at the gateway.
    fn deploy_consumer(&mut self, name: &str) -> Result<Hash160, HarnessError> {
        let consumer = self.client.virtual_deploy(name)?;
        let gateway = self.gateway;
        self.invoke(consumer, "setGateway", vec![gateway.into()])?;
        Ok(consumer)
    }

    /// Fund `user` with GAS and make them the caller of the next invocation.
    fn as_funded_user(&mut self, user: &str, amount: u64) -> Result<(), HarnessError> {
        self.client.deal(user, "GAS", amount)?;
        self.client.prank(user)
    }

    fn request_service(
        &mut self,
        service: &str,
        payload: &str,
        callback: &str,
    ) -> Result<u64, HarnessError> {
        let gateway = self.gateway;
        let result = self.invoke(
            gateway,
            "requestService",
            vec![
                ContractArg::from(service),
                ContractArg::Bytes(payload.as_bytes().to_vec()),
                ContractArg::from(callback),
            ],
        )?;
        expect_halt(&result)
    }
}

fn expect_halt(result: &InvokeResult) -> Result<u64, HarnessError> {
    match result.state {
        VmState::Halt => Ok(result.gas_consumed),
        state => Err(HarnessError::UnexpectedState(state.to_string())),
    }
}

fn vrf_request_creation(ctx: &mut ScenarioContext<'_>) -> Result<u64, HarnessError> {
    ctx.request_service(
        "vrf",
        r#"{"seed": "test-seed", "num_words": 3}"#,
        "onVRFCallback",
    )
}

fn vrf_callback(ctx: &mut ScenarioContext<'_>) -> Result<u64, HarnessError> {
    let gateway = ctx.gateway;
    let result = ctx.invoke(
        gateway,
        "fulfillRequest",
        vec![
            ContractArg::from(1i64),
            ContractArg::Bytes(vec![0x42, 0x13, 0x37, 0xab, 0xcd, 0xef, 0x12, 0x34]),
            ContractArg::from(1i64),
            ContractArg::Bytes(vec![0; 64]),
        ],
    )?;
    expect_halt(&result)
}

fn lottery_lifecycle(ctx: &mut ScenarioContext<'_>) -> Result<u64, HarnessError> {
    let lottery = ctx.deploy_consumer("VRFLottery")?;
    ctx.invoke(lottery, "startRound", vec![])?;

    for player in ["NPlayer0", "NPlayer1", "NPlayer2"] {
        ctx.as_funded_user(player, 100_000_000)?;
        ctx.invoke(lottery, "buyTicket", vec![100_000_000i64.into()])?;
    }

    ctx.invoke(lottery, "closeRound", vec![1i64.into()])?;

    let session = ctx.client.session()?;
    let buyers: Vec<_> = session
        .calls
        .iter()
        .filter(|call| call.method == "buyTicket")
        .filter_map(|call| call.caller.as_deref())
        .collect();
    if buyers != ["NPlayer0", "NPlayer1", "NPlayer2"] {
        return Err(HarnessError::UnexpectedState(format!(
            "tickets bought by {buyers:?}"
        )));
    }
    Ok(0)
}

fn mixer_request(ctx: &mut ScenarioContext<'_>) -> Result<u64, HarnessError> {
    ctx.request_service(
        "mixer",
        r#"{"amount": 500000000, "token_type": "GAS"}"#,
        "onMixCallback",
    )
}

fn token_validation(ctx: &mut ScenarioContext<'_>) -> Result<u64, HarnessError> {
    let mixer = ctx.service("mixer")?;
    for token in ["GAS", "NEO"] {
        let result = ctx.invoke(mixer, "getTokenConfig", vec![token.into()])?;
        expect_halt(&result)?;
    }
    Ok(0)
}

fn mixer_client_flow(ctx: &mut ScenarioContext<'_>) -> Result<u64, HarnessError> {
    let client = ctx.deploy_consumer("MixerClient")?;
    ctx.as_funded_user("NUser1", 500_000_000)?;
    ctx.invoke(
        client,
        "createMixRequest",
        vec![
            1i64.into(),
            ContractArg::Bytes(b"encrypted-target-data".to_vec()),
            3i64.into(),
        ],
    )?;
    Ok(0)
}

fn price_feed(ctx: &mut ScenarioContext<'_>) -> Result<u64, HarnessError> {
    let datafeeds = ctx.service("datafeeds")?;
    let result = ctx.invoke(datafeeds, "getLatestPrice", vec!["GAS/USD".into()])?;
    expect_halt(&result)
}

fn oracle_request(ctx: &mut ScenarioContext<'_>) -> Result<u64, HarnessError> {
    ctx.request_service(
        "oracle",
        r#"{"url": "https://api.example.com/price", "json_path": "data.price"}"#,
        "onOracleCallback",
    )
}

fn defi_positions(ctx: &mut ScenarioContext<'_>) -> Result<u64, HarnessError> {
    let datafeeds = ctx.service("datafeeds")?;
    let consumer = ctx.deploy_consumer("DeFiPriceConsumer")?;
    ctx.invoke(consumer, "setDataFeedsContract", vec![datafeeds.into()])?;

    ctx.as_funded_user("NUser1", 1_000_000_000)?;
    ctx.invoke(consumer, "isLiquidatable", vec![1i64.into()])?;
    Ok(0)
}
