//! Runs scenario groups and collects their results.

use std::{path::PathBuf, time::Instant};

use futures::future::join_all;
use serde::Serialize;

use crate::harness::{
    scenarios::{REGISTRY, Scenario, ScenarioContext, ScenarioGroup},
    session::FairyClient,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub gas_used: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub title: String,
    pub results: Vec<TestResult>,
}

/// Totals over every group of a run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub total_ms: f64,
    /// `(test, error)` for every failed test.
    pub failures: Vec<(String, String)>,
}

impl TestSummary {
    pub fn from_groups(groups: &[GroupResult]) -> Self {
        let mut summary = Self::default();
        for result in groups.iter().flat_map(|g| &g.results) {
            summary.total_ms += result.duration_ms;
            if result.passed {
                summary.passed += 1;
            } else {
                summary.failed += 1;
                summary.failures.push((
                    result.name.clone(),
                    result.error.clone().unwrap_or_default(),
                ));
            }
        }
        summary
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Run one scenario in a fresh session.
pub fn run_scenario(client: &mut FairyClient, scenario: &Scenario) -> TestResult {
    let start = Instant::now();
    let outcome = ScenarioContext::setup(client).and_then(|mut ctx| (scenario.run)(&mut ctx));
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(gas_used) => TestResult {
            name: scenario.name.to_string(),
            passed: true,
            duration_ms,
            error: None,
            gas_used,
        },
        Err(e) => TestResult {
            name: scenario.name.to_string(),
            passed: false,
            duration_ms,
            error: Some(e.to_string()),
            gas_used: 0,
        },
    }
}

/// Run `scenarios` of `group` sequentially on a client of their own.
pub fn run_group(
    group: &ScenarioGroup,
    scenarios: &[Scenario],
    rpc_url: &str,
    build_dir: PathBuf,
) -> GroupResult {
    let mut client = FairyClient::new(rpc_url, build_dir);
    let results = scenarios
        .iter()
        .map(|scenario| run_scenario(&mut client, scenario))
        .collect();

    GroupResult {
        title: group.title.to_string(),
        results,
    }
}

/// Runs the registered scenario groups, one worker per group.
#[derive(Debug, Clone)]
pub struct TestRunner {
    rpc_url: String,
    build_dir: PathBuf,
    filter: Option<String>,
    groups: &'static [ScenarioGroup],
}

impl TestRunner {
    pub fn new(rpc_url: impl Into<String>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            build_dir: build_dir.into(),
            filter: None,
            groups: REGISTRY,
        }
    }

    /// Only run what matches `filter` (case-insensitive).
    pub fn filter(mut self, filter: Option<impl Into<String>>) -> Self {
        self.filter = filter.map(|f| f.into().to_lowercase());
        self
    }

    pub async fn run(&self) -> Vec<GroupResult> {
        let selected: Vec<_> = self
            .groups
            .iter()
            .map(|group| (group, group.select(self.filter.as_deref())))
            .filter(|(_, scenarios)| !scenarios.is_empty())
            .collect();

        tracing::info!(
            rpc_url = %self.rpc_url,
            filter = self.filter.as_deref().unwrap_or("-"),
            groups = selected.len(),
            "Running contract tests..."
        );

        // Sessions share nothing, so each group gets its own blocking worker.
        let handles = selected.into_iter().map(|(group, scenarios)| {
            let rpc_url = self.rpc_url.clone();
            let build_dir = self.build_dir.clone();
            let title = group.title;
            let count = scenarios.len();
            let handle = tokio::task::spawn_blocking(move || {
                run_group(group, &scenarios, &rpc_url, build_dir)
            });
            async move {
                handle.await.unwrap_or_else(|e| {
                    tracing::error!(group = title, err = %e, "Test group worker failed");
                    GroupResult {
                        title: title.to_string(),
                        results: vec![TestResult {
                            name: title.to_string(),
                            passed: false,
                            duration_ms: 0.0,
                            error: Some(format!("worker failed after {count} scenarios: {e}")),
                            gas_used: 0,
                        }],
                    }
                })
            }
        });

        let groups = join_all(handles).await;
        for group in &groups {
            log_group(group);
        }
        groups
    }
}

fn log_group(group: &GroupResult) {
    tracing::info!("=== {} ===", group.title);
    for result in &group.results {
        if result.passed {
            tracing::info!("  [PASS] {} ({:.2}ms)", result.name, result.duration_ms);
        } else {
            tracing::error!(
                "  [FAIL] {} ({:.2}ms): {}",
                result.name,
                result.duration_ms,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;
    use crate::artifacts::SERVICE_CONTRACTS;

    fn build_dir(services: &[&str]) -> TempDir {
        let dir = TempDir::new("slayer-runner").unwrap();
        for name in services {
            std::fs::write(dir.path().join(format!("{name}.nef")), b"NEF3").unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_all_groups_pass_with_full_build() {
        let services: Vec<_> = SERVICE_CONTRACTS.iter().map(|(_, name)| *name).collect();
        let dir = build_dir(&services);

        let groups = TestRunner::new("http://127.0.0.1:50012", dir.path()).run().await;
        let titles: Vec<_> = groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["VRFServiceTests", "MixerServiceTests", "DataFeedsServiceTests"]);

        let summary = TestSummary::from_groups(&groups);
        assert_eq!(summary.passed, 9);
        assert!(summary.all_passed());
    }

    #[tokio::test]
    async fn test_missing_service_fails_dependent_scenarios() {
        let dir = build_dir(&["VRFService", "MixerService"]);

        let groups = TestRunner::new("http://127.0.0.1:50012", dir.path())
            .filter(Some("DataFeeds"))
            .run()
            .await;
        assert_eq!(groups.len(), 1);

        let summary = TestSummary::from_groups(&groups);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 2);
        let failed: Vec<_> = summary.failures.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(failed, vec!["price_feed", "defi_positions"]);
        assert!(summary.failures[0].1.contains("datafeeds"));
    }

    #[tokio::test]
    async fn test_filter_by_scenario_name() {
        let dir = build_dir(&[]);
        let groups = TestRunner::new("http://127.0.0.1:50012", dir.path())
            .filter(Some("lottery"))
            .run()
            .await;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].results.len(), 1);
        assert!(groups[0].results[0].passed);
    }

    #[tokio::test]
    async fn test_filter_matching_nothing() {
        let dir = build_dir(&[]);
        let groups = TestRunner::new("http://127.0.0.1:50012", dir.path())
            .filter(Some("nothing-matches"))
            .run()
            .await;
        assert!(groups.is_empty());
        assert!(TestSummary::from_groups(&groups).all_passed());
    }
}
