//! Simulated test harness.
//!
//! Exercises contract call sequencing and wiring against virtual deployments,
//! without touching a network:
//! - `session.rs` - sessions, virtual deployments, snapshots and cheatcodes
//! - `scenarios.rs` - the scenario registry, keyed by service type
//! - `runner.rs` - concurrent group execution and result summary

mod runner;
mod scenarios;
mod session;

pub use runner::{GroupResult, TestResult, TestRunner, TestSummary, run_group, run_scenario};
pub use scenarios::{REGISTRY, Scenario, ScenarioContext, ScenarioFn, ScenarioGroup};
pub use session::{
    CallRecord, FairyClient, InvokeResult, SIMULATED_GAS, TestSession, VmState, virtual_address,
};
