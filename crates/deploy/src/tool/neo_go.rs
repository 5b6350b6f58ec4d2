//! Command builder for `neo-go`.

use std::path::Path;

use super::ContractArg;

/// Where neo-go gets its signing key from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletSource<'a> {
    /// `--wallet-config`: a YAML file holding the wallet path and its password.
    Config(&'a Path),
    /// `--wallet`: neo-go prompts for the password on stdin.
    File(&'a Path),
}

/// Builder for `neo-go contract ...` commands.
#[derive(Debug, Clone)]
pub struct NeoGoCmdBuilder {
    rpc_url: Option<String>,
    wallet: Option<(&'static str, String)>,
    await_confirmation: bool,
}

impl NeoGoCmdBuilder {
    pub fn new() -> Self {
        Self {
            rpc_url: None,
            wallet: None,
            await_confirmation: true,
        }
    }

    /// Set the RPC endpoint.
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    /// Set the wallet used for signing.
    pub fn wallet(mut self, source: WalletSource<'_>) -> Self {
        self.wallet = Some(match source {
            WalletSource::Config(path) => ("--wallet-config", path.display().to_string()),
            WalletSource::File(path) => ("--wallet", path.display().to_string()),
        });
        self
    }

    /// Wait for the transaction to be accepted before returning.
    pub fn await_confirmation(mut self, await_confirmation: bool) -> Self {
        self.await_confirmation = await_confirmation;
        self
    }

    fn push_connection(&self, cmd: &mut Vec<String>) {
        if let Some(rpc_url) = &self.rpc_url {
            cmd.push("--rpc-endpoint".to_string());
            cmd.push(rpc_url.clone());
        }
        if let Some((flag, path)) = &self.wallet {
            cmd.push(flag.to_string());
            cmd.push(path.clone());
        }
        if self.await_confirmation {
            cmd.push("--await".to_string());
        }
        // Skip the interactive confirmation prompt.
        cmd.push("--force".to_string());
    }

    /// `contract calc-hash`: the deterministic address for a sender and artifact pair.
    pub fn calc_hash(sender: &str, nef: &Path, manifest: &Path) -> Vec<String> {
        vec![
            "contract".to_string(),
            "calc-hash".to_string(),
            "--sender".to_string(),
            sender.to_string(),
            "--in".to_string(),
            nef.display().to_string(),
            "--manifest".to_string(),
            manifest.display().to_string(),
        ]
    }

    /// `contract deploy`.
    pub fn deploy(self, nef: &Path, manifest: &Path) -> Vec<String> {
        let mut cmd = vec!["contract".to_string(), "deploy".to_string()];
        self.push_connection(&mut cmd);
        cmd.push("--in".to_string());
        cmd.push(nef.display().to_string());
        cmd.push("--manifest".to_string());
        cmd.push(manifest.display().to_string());
        cmd
    }

    /// `contract invokefunction <contract> <method> [args...] -- <signer>`.
    pub fn invoke(
        self,
        contract: &str,
        method: &str,
        args: &[ContractArg],
        signer: Option<&str>,
    ) -> Vec<String> {
        let mut cmd = vec!["contract".to_string(), "invokefunction".to_string()];
        self.push_connection(&mut cmd);
        cmd.push(contract.to_string());
        cmd.push(method.to_string());
        cmd.extend(args.iter().map(ContractArg::to_neo_go_arg));
        if let Some(signer) = signer {
            cmd.push("--".to_string());
            cmd.push(format!("{signer}:CalledByEntry"));
        }
        cmd
    }
}

impl Default for NeoGoCmdBuilder {
    fn default() -> Self {
        Self::new()
    }
}
