//! End-of-run tables and summary lines.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use slayer_deploy::{
    ContractGroup, DeployOutcome, DeploymentReport, DeploymentState, InitReport, StepOutcome,
    deployed_addresses,
    harness::{GroupResult, TestSummary},
};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_deployment(report: &DeploymentReport) {
    let mut table = table(vec!["Contract", "Status", "Address", "Transaction"]);

    for item in &report.items {
        let row = match &item.outcome {
            DeployOutcome::Deployed { address, tx_hash } => vec![
                item.name.clone(),
                "deployed".to_string(),
                address.to_string(),
                tx_hash.clone().unwrap_or_else(|| "-".to_string()),
            ],
            DeployOutcome::AlreadyDeployed { address } => vec![
                item.name.clone(),
                "already deployed".to_string(),
                address.to_string(),
                "-".to_string(),
            ],
            DeployOutcome::Skipped { missing } => vec![
                item.name.clone(),
                "skipped".to_string(),
                "-".to_string(),
                format!("missing {}", missing.len()),
            ],
        };
        table.add_row(row);
    }
    if let Some(aborted) = &report.aborted {
        table.add_row(vec![
            aborted.name.clone(),
            "FAILED".to_string(),
            "-".to_string(),
            "-".to_string(),
        ]);
    }

    println!("{table}");
    println!(
        "Deployment on {}: {} deployed, {} already deployed, {} skipped, {} failed{}",
        report.network,
        report.deployed(),
        report.already_deployed(),
        report.skipped(),
        usize::from(report.is_aborted()),
        if report.is_aborted() { " (aborted)" } else { "" }
    );
}

pub fn print_status(state: &DeploymentState) {
    let mut table = table(vec!["Group", "Contract", "Status", "Address", "Transaction", "Deployed at"]);

    let groups = [
        ("core", state.records(ContractGroup::Core)),
        ("miniapp", state.records(ContractGroup::MiniApp)),
    ];
    for (group, records) in groups {
        for record in records.values() {
            let status = if record.network == state.network {
                record.status.to_string()
            } else {
                format!("{} ({})", record.status, record.network)
            };
            table.add_row(vec![
                group.to_string(),
                record.name.clone(),
                status,
                record.address.to_string(),
                record.tx_hash.clone().unwrap_or_else(|| "-".to_string()),
                record.deployed_at.to_rfc3339(),
            ]);
        }
    }

    println!("{table}");
    println!(
        "Status of {}: {} deployed, updated at {}",
        state.network,
        deployed_addresses(state).len(),
        state.updated_at.to_rfc3339()
    );
}

pub fn print_initialization(report: &InitReport) {
    let mut table = table(vec!["Stage", "Target", "Method", "Outcome", "Detail"]);

    for step in &report.steps {
        let (outcome, detail) = match &step.outcome {
            StepOutcome::Succeeded { tx_hash } => {
                ("ok", tx_hash.clone().unwrap_or_else(|| "-".to_string()))
            }
            StepOutcome::Skipped { reason } => ("skipped", reason.clone()),
            StepOutcome::Refused(e) if report.is_failure(step) => ("REFUSED", e.to_string()),
            StepOutcome::Refused(e) => ("manual", e.to_string()),
            StepOutcome::Failed(e) => ("FAILED", e.to_string()),
        };
        table.add_row(vec![
            step.stage.to_string(),
            step.target.clone(),
            step.method.to_string(),
            outcome.to_string(),
            detail,
        ]);
    }

    println!("{table}");
    println!(
        "Initialization on {}: {} succeeded, {} skipped, {} failed",
        report.network,
        report.succeeded(),
        report.skipped(),
        report.failures()
    );
}

pub fn print_tests(groups: &[GroupResult]) {
    let mut table = table(vec!["Group", "Test", "Result", "Time (ms)", "Gas"]);

    for group in groups {
        for result in &group.results {
            table.add_row(vec![
                group.title.clone(),
                result.name.clone(),
                if result.passed { "PASS" } else { "FAIL" }.to_string(),
                format!("{:.2}", result.duration_ms),
                result.gas_used.to_string(),
            ]);
        }
    }

    let summary = TestSummary::from_groups(groups);
    println!("{table}");
    if !summary.failures.is_empty() {
        println!("Failed tests:");
        for (name, error) in &summary.failures {
            println!("  - {name}: {error}");
        }
    }
    println!(
        "Test Results: {} passed, {} failed ({:.2}ms)",
        summary.passed, summary.failed, summary.total_ms
    );
}
