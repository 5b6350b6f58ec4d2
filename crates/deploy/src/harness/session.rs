//! In-process stand-in for a test network session.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{ContractArg, Hash160, error::HarnessError, hash160::HASH160_LEN};

/// Gas reported for every simulated invocation.
pub const SIMULATED_GAS: u64 = 1_000_000;

/// Disambiguates sessions created within the same millisecond.
static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum VmState {
    Halt,
    Fault,
}

/// Result of a simulated invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvokeResult {
    pub state: VmState,
    pub gas_consumed: u64,
    pub stack: Vec<serde_json::Value>,
    pub session_id: String,
}

/// One intercepted call, with the harness context it was made in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub contract: Hash160,
    pub method: String,
    pub args: Vec<ContractArg>,
    /// Caller set by [`FairyClient::prank`] for this call only.
    pub caller: Option<String>,
    /// Block time set by [`FairyClient::warp`].
    pub block_time: Option<u64>,
}

/// All state of one test session. Snapshots are clones of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSession {
    pub session_id: String,
    pub deployed_contracts: BTreeMap<String, Hash160>,
    /// `(address, token) -> amount`, as set by [`FairyClient::deal`].
    pub balances: BTreeMap<(String, String), u64>,
    pub block_time: Option<u64>,
    pub calls: Vec<CallRecord>,
    pending_caller: Option<String>,
}

impl TestSession {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            deployed_contracts: BTreeMap::new(),
            balances: BTreeMap::new(),
            block_time: None,
            calls: Vec::new(),
            pending_caller: None,
        }
    }

    pub fn balance(&self, address: &str, token: &str) -> u64 {
        self.balances
            .get(&(address.to_string(), token.to_string()))
            .copied()
            .unwrap_or_default()
    }
}

/// Fake address of `name` within `session_id`: the first 20 bytes of
/// `sha256(name ":" session_id)`.
pub fn virtual_address(name: &str, session_id: &str) -> Hash160 {
    let digest = Sha256::new()
        .chain_update(name.as_bytes())
        .chain_update(b":")
        .chain_update(session_id.as_bytes())
        .finalize();

    let mut bytes = [0u8; HASH160_LEN];
    bytes.copy_from_slice(&digest[..HASH160_LEN]);
    Hash160::from_bytes(bytes)
}

/// Foundry-style test client: virtual deployments, snapshots and cheatcodes.
///
/// Invocations are not executed: every call succeeds with [`SIMULATED_GAS`]. The
/// client checks call sequencing and wiring, not contract logic.
#[derive(Debug)]
pub struct FairyClient {
    rpc_url: String,
    build_dir: PathBuf,
    session: Option<TestSession>,
    snapshots: HashMap<String, TestSession>,
}

impl FairyClient {
    pub fn new(rpc_url: impl Into<String>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            build_dir: build_dir.into(),
            session: None,
            snapshots: HashMap::new(),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Start a fresh session, dropping the previous one and its snapshots.
    pub fn create_session(&mut self) -> String {
        let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        let session_id = format!("session_{}_{seq}", Utc::now().timestamp_millis());

        tracing::debug!(%session_id, rpc_url = %self.rpc_url, "Created test session");
        self.snapshots.clear();
        self.session = Some(TestSession::new(session_id.clone()));
        session_id
    }

    pub fn session(&self) -> Result<&TestSession, HarnessError> {
        self.session.as_ref().ok_or(HarnessError::NoSession)
    }

    fn session_mut(&mut self) -> Result<&mut TestSession, HarnessError> {
        self.session.as_mut().ok_or(HarnessError::NoSession)
    }

    /// Deploy `name` in the current session. Memoized per session.
    pub fn virtual_deploy(&mut self, name: &str) -> Result<Hash160, HarnessError> {
        let TestSession {
            session_id,
            deployed_contracts,
            ..
        } = self.session_mut()?;
        let address = *deployed_contracts
            .entry(name.to_string())
            .or_insert_with(|| virtual_address(name, session_id));

        tracing::trace!(contract = name, %address, "Virtual deploy");
        Ok(address)
    }

    /// Whether the artifact pair of `name` exists in the build directory.
    pub fn has_artifact(&self, name: &str) -> bool {
        self.build_dir.join(format!("{name}.nef")).is_file()
    }

    pub fn invoke(
        &mut self,
        contract: Hash160,
        method: &str,
        args: Vec<ContractArg>,
    ) -> Result<InvokeResult, HarnessError> {
        let session = self.session_mut()?;
        let record = CallRecord {
            contract,
            method: method.to_string(),
            args,
            caller: session.pending_caller.take(),
            block_time: session.block_time,
        };
        tracing::trace!(contract = %record.contract, method, caller = ?record.caller, "Invoke");
        session.calls.push(record);

        Ok(InvokeResult {
            state: VmState::Halt,
            gas_consumed: SIMULATED_GAS,
            stack: Vec::new(),
            session_id: session.session_id.clone(),
        })
    }

    /// Cheatcode: the next invocation is made by `address`.
    pub fn prank(&mut self, address: &str) -> Result<(), HarnessError> {
        self.session_mut()?.pending_caller = Some(address.to_string());
        Ok(())
    }

    /// Cheatcode: set the `token` balance of `address`.
    pub fn deal(&mut self, address: &str, token: &str, amount: u64) -> Result<(), HarnessError> {
        self.session_mut()?
            .balances
            .insert((address.to_string(), token.to_string()), amount);
        Ok(())
    }

    /// Cheatcode: set the block time seen by later invocations.
    pub fn warp(&mut self, timestamp: u64) -> Result<(), HarnessError> {
        self.session_mut()?.block_time = Some(timestamp);
        Ok(())
    }

    pub fn snapshot(&mut self) -> Result<String, HarnessError> {
        let session = self.session()?.clone();
        let id = format!("snapshot_{}_{}", session.session_id, self.snapshots.len());
        self.snapshots.insert(id.clone(), session);
        Ok(id)
    }

    /// Restore the session as it was when `snapshot_id` was taken. The snapshot
    /// stays available.
    pub fn revert_to(&mut self, snapshot_id: &str) -> Result<(), HarnessError> {
        let snapshot = self
            .snapshots
            .get(snapshot_id)
            .ok_or_else(|| HarnessError::UnknownSnapshot(snapshot_id.to_string()))?;
        self.session = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FairyClient {
        let mut client = FairyClient::new("http://127.0.0.1:50012", "contracts/build");
        client.create_session();
        client
    }

    #[test]
    fn test_no_session() {
        let mut client = FairyClient::new("http://127.0.0.1:50012", "contracts/build");
        assert_eq!(client.virtual_deploy("VRFService"), Err(HarnessError::NoSession));
        assert_eq!(client.snapshot(), Err(HarnessError::NoSession));
        assert_eq!(client.warp(1), Err(HarnessError::NoSession));
    }

    #[test]
    fn test_session_ids_are_distinct() {
        let mut client = client();
        let first = client.session().unwrap().session_id.clone();
        let second = client.create_session();
        assert_ne!(first, second);
        assert!(second.starts_with("session_"));
    }

    #[test]
    fn test_virtual_deploy_memoized_per_session() {
        let mut client = client();
        let a = client.virtual_deploy("VRFLottery").unwrap();
        assert_eq!(client.virtual_deploy("VRFLottery").unwrap(), a);
        assert_ne!(client.virtual_deploy("MixerClient").unwrap(), a);

        client.create_session();
        assert_ne!(client.virtual_deploy("VRFLottery").unwrap(), a);
    }

    #[test]
    fn test_virtual_address_is_deterministic() {
        assert_eq!(
            virtual_address("ServiceLayerGateway", "session_1_0"),
            virtual_address("ServiceLayerGateway", "session_1_0")
        );
        assert_ne!(
            virtual_address("ServiceLayerGateway", "session_1_0"),
            virtual_address("ServiceLayerGateway", "session_1_1")
        );
    }

    #[test]
    fn test_invoke_always_halts() {
        let mut client = client();
        let gateway = client.virtual_deploy("ServiceLayerGateway").unwrap();
        let result = client
            .invoke(gateway, "requestService", vec![ContractArg::from("vrf")])
            .unwrap();
        assert_eq!(result.state, VmState::Halt);
        assert_eq!(result.gas_consumed, SIMULATED_GAS);
        assert_eq!(result.session_id, client.session().unwrap().session_id);
    }

    #[test]
    fn test_prank_applies_to_next_call_only() {
        let mut client = client();
        let lottery = client.virtual_deploy("VRFLottery").unwrap();

        client.warp(1_700_000_000).unwrap();
        client.prank("NPlayer0").unwrap();
        client.invoke(lottery, "buyTicket", vec![]).unwrap();
        client.invoke(lottery, "closeRound", vec![]).unwrap();

        let calls = &client.session().unwrap().calls;
        assert_eq!(calls[0].caller.as_deref(), Some("NPlayer0"));
        assert_eq!(calls[1].caller, None);
        assert!(calls.iter().all(|c| c.block_time == Some(1_700_000_000)));
    }

    #[test]
    fn test_snapshot_and_revert() {
        let mut client = client();
        client.deal("NUser1", "GAS", 100).unwrap();
        let snapshot = client.snapshot().unwrap();

        client.deal("NUser1", "GAS", 5).unwrap();
        let mixer = client.virtual_deploy("MixerClient").unwrap();
        client.invoke(mixer, "createMixRequest", vec![]).unwrap();

        client.revert_to(&snapshot).unwrap();
        let session = client.session().unwrap();
        assert_eq!(session.balance("NUser1", "GAS"), 100);
        assert!(session.calls.is_empty());
        assert!(session.deployed_contracts.is_empty());

        // Reverting twice to the same snapshot is allowed.
        client.revert_to(&snapshot).unwrap();
        assert_eq!(
            client.revert_to("snapshot_nope"),
            Err(HarnessError::UnknownSnapshot("snapshot_nope".to_string()))
        );
    }
}
