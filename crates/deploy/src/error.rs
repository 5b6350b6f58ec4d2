//! Error taxonomy for deployment and initialization runs.
//!
//! A missing artifact has no error type: it is reported as
//! [`crate::DeployOutcome::Skipped`], never raised.

use std::{path::PathBuf, time::Duration};

/// Failure of an external signing/broadcast/query tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "`{program}` exited with {}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}",
        .exit_code.map_or_else(|| "a signal".to_string(), |code| format!("code {code}"))
    )]
    Exited {
        program: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The process did not finish in time. The underlying transaction may still
    /// have been broadcast.
    #[error("`{program}` did not complete within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// An expected identifier was not found in tool output.
#[derive(Debug, thiserror::Error)]
#[error("no {expected} found in tool output:\n{output}")]
pub struct ParseError {
    pub expected: &'static str,
    pub output: String,
}

/// A malformed fixed-length identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("invalid hex in identifier `{value}`")]
    InvalidHex { value: String },
    #[error("identifier `{value}` decodes to {actual} bytes, expected {expected}")]
    InvalidLength {
        value: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network `{0}` (expected one of: neoexpress, testnet, mainnet)")]
pub struct UnknownNetworkError(pub String);

/// A required credential, setting or state file is absent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("missing required setting `{field}` (set SLAYER_{env} or add `{field}` to Slayer.toml)")]
    MissingField { field: &'static str, env: &'static str },
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("deployment state file not found: {}", .0.display())]
    MissingStateFile(PathBuf),
    #[error("failed to load settings: {0}")]
    Figment(#[from] Box<figment::Error>),
}

/// Umbrella error for the deployment pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    UnknownNetwork(#[from] UnknownNetworkError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed deployment state {}: {source}", .path.display())]
    State {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of a single initialization step. Never aborts the remaining steps.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The step needs key material that is only available on the local network.
    #[error("{stage} on {network} must be performed manually with the administrative signer")]
    ManualActionRequired {
        stage: crate::InitStage,
        network: String,
    },
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Misuse of the simulated test harness.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    #[error("no active test session")]
    NoSession,
    #[error("unknown snapshot `{0}`")]
    UnknownSnapshot(String),
    #[error("contract `{0}` is not deployed in this session")]
    NotDeployed(String),
    #[error("unexpected VM state: {0}")]
    UnexpectedState(String),
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
