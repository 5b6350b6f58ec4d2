//! Adapter around the external signing/broadcast/query tools.
//!
//! Every other component goes through [`ToolRunner`]; nothing else spawns processes.
//! Each tool has its own submodule with a command builder:
//! - `neo_go.rs` - `neo-go` (address calculation, live-network deploy and invoke)
//! - `neo_express.rs` - `neoxp` (local-network deploy and invoke)

mod neo_express;
mod neo_go;

use std::{fmt, future::Future, time::Duration};

use tokio::process::Command;

pub use neo_express::NeoExpressCmdBuilder;
pub use neo_go::{NeoGoCmdBuilder, WalletSource};

use crate::{Hash160, error::ToolError};

/// A typed contract-call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractArg {
    String(String),
    Integer(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    Hash160(Hash160),
}

impl ContractArg {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Render the argument as a neo-go `type:value` parameter.
    ///
    /// Both renderers pass Hash160 values in invocation byte order.
    pub fn to_neo_go_arg(&self) -> String {
        match self {
            Self::String(s) => format!("string:{s}"),
            Self::Integer(i) => format!("int:{i}"),
            Self::Bool(b) => format!("bool:{b}"),
            Self::Bytes(bytes) => format!("bytes:{}", hex::encode(bytes)),
            Self::Hash160(hash) => format!("hash160:{}", hash.to_invocation_hex()),
        }
    }

    /// Render the argument for `neoxp contract run`, which infers the type from the value:
    /// `0x` hex is a Hash160 or byte array, digits an integer, `true`/`false` a boolean.
    pub fn to_neoxp_arg(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
            Self::Hash160(hash) => hash.to_invocation_hex(),
        }
    }
}

impl From<Hash160> for ContractArg {
    fn from(hash: Hash160) -> Self {
        Self::Hash160(hash)
    }
}

impl From<i64> for ContractArg {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for ContractArg {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// A fully-built external tool command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs an external tool and returns its combined output (stdout then stderr).
///
/// A non-zero exit is always an error, whatever the output says. Implementations
/// must not retry: a retried submission can be broadcast twice.
pub trait ToolRunner: Send + Sync {
    fn run(
        &self,
        invocation: &ToolInvocation,
    ) -> impl Future<Output = Result<String, ToolError>> + Send;
}

/// [`ToolRunner`] spawning real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<String, ToolError> {
        tracing::debug!(command = %invocation, timeout = ?invocation.timeout, "Running external tool");

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(invocation.timeout, child)
            .await
            .map_err(|_| ToolError::Timeout {
                program: invocation.program.clone(),
                timeout: invocation.timeout,
            })?
            .map_err(|source| ToolError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        tracing::trace!(program = %invocation.program, %stdout, %stderr, "External tool output");

        if !output.status.success() {
            return Err(ToolError::Exited {
                program: invocation.program.clone(),
                exit_code: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(combine_output(&stdout, &stderr))
    }
}

/// Concatenate stdout and stderr, in that order.
pub fn combine_output(stdout: &str, stderr: &str) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (_, true) => stdout.to_string(),
        (true, false) => stderr.to_string(),
        (false, false) if stdout.ends_with('\n') => format!("{stdout}{stderr}"),
        (false, false) => format!("{stdout}\n{stderr}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash160_arg_uses_invocation_order() {
        let hash: Hash160 = "0x0102030405060708090a0b0c0d0e0f1011121314".parse().unwrap();
        let arg = ContractArg::from(hash);
        assert_eq!(
            arg.to_neo_go_arg(),
            "hash160:0x14131211100f0e0d0c0b0a090807060504030201"
        );
        assert_eq!(arg.to_neoxp_arg(), "0x14131211100f0e0d0c0b0a090807060504030201");
    }

    #[test]
    fn test_neo_go_scalar_args() {
        assert_eq!(ContractArg::from("vrf").to_neo_go_arg(), "string:vrf");
        assert_eq!(ContractArg::from(10_000_000i64).to_neo_go_arg(), "int:10000000");
        assert_eq!(ContractArg::Bool(true).to_neo_go_arg(), "bool:true");
        assert_eq!(ContractArg::Bytes(vec![0xde, 0xad]).to_neo_go_arg(), "bytes:dead");
    }

    #[test]
    fn test_neoxp_scalar_args_are_untyped() {
        assert_eq!(ContractArg::from("vrf").to_neoxp_arg(), "vrf");
        assert_eq!(ContractArg::from(100_000i64).to_neoxp_arg(), "100000");
        assert_eq!(ContractArg::from(-5i64).to_neoxp_arg(), "-5");
        assert_eq!(ContractArg::Bool(false).to_neoxp_arg(), "false");
        assert_eq!(ContractArg::Bytes(vec![0xde, 0xad]).to_neoxp_arg(), "0xdead");
    }

    #[test]
    fn test_combine_output_order() {
        assert_eq!(combine_output("out\n", "err"), "out\nerr");
        assert_eq!(combine_output("out", "err"), "out\nerr");
        assert_eq!(combine_output("", "err"), "err");
        assert_eq!(combine_output("out", ""), "out");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_combines_streams() {
        let invocation = ToolInvocation::new(
            "sh",
            vec!["-c".to_string(), "echo out; echo err 1>&2".to_string()],
            Duration::from_secs(10),
        );
        let output = ProcessRunner.run(&invocation).await.unwrap();
        assert_eq!(output, "out\nerr\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_non_zero_exit_is_error() {
        let invocation = ToolInvocation::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo 'contract hash: 0x0102030405060708090a0b0c0d0e0f1011121314'; exit 3"
                    .to_string(),
            ],
            Duration::from_secs(10),
        );
        match ProcessRunner.run(&invocation).await {
            Err(ToolError::Exited {
                exit_code, stdout, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert!(stdout.contains("contract hash"));
            }
            other => panic!("expected exit error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_timeout() {
        let invocation = ToolInvocation::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string()],
            Duration::from_millis(100),
        );
        assert!(matches!(
            ProcessRunner.run(&invocation).await,
            Err(ToolError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_process_runner_spawn_failure() {
        let invocation = ToolInvocation::new(
            "definitely-not-a-real-binary-slayer",
            vec![],
            Duration::from_secs(1),
        );
        assert!(matches!(
            ProcessRunner.run(&invocation).await,
            Err(ToolError::Spawn { .. })
        ));
    }
}
