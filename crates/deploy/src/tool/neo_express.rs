//! Command builder for `neoxp` (neo-express).

use std::path::Path;

use super::ContractArg;

/// Builder for `neoxp contract ...` commands against a local-network descriptor.
#[derive(Debug, Clone)]
pub struct NeoExpressCmdBuilder {
    descriptor: String,
    account: String,
    json: bool,
}

impl NeoExpressCmdBuilder {
    /// Create a builder bound to a `.neo-express` descriptor and signing account alias.
    pub fn new(descriptor: impl AsRef<Path>, account: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.as_ref().display().to_string(),
            account: account.into(),
            json: true,
        }
    }

    /// Request JSON output.
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn base(&self, subcommand: &str) -> Vec<String> {
        let mut cmd = vec!["contract".to_string(), subcommand.to_string()];
        if self.json {
            cmd.push("--json".to_string());
        }
        cmd.push("--input".to_string());
        cmd.push(self.descriptor.clone());
        cmd
    }

    /// `contract deploy <nef> <account> --force`.
    ///
    /// neo-express locates the manifest next to the NEF file.
    pub fn deploy(self, nef: &Path) -> Vec<String> {
        let mut cmd = self.base("deploy");
        cmd.push(nef.display().to_string());
        cmd.push(self.account);
        cmd.push("--force".to_string());
        cmd
    }

    /// `contract run <contract> <method> [args...] --account <account>`.
    pub fn invoke(self, contract: &str, method: &str, args: &[ContractArg]) -> Vec<String> {
        let mut cmd = self.base("run");
        cmd.push(contract.to_string());
        cmd.push(method.to_string());
        cmd.extend(args.iter().map(ContractArg::to_neoxp_arg));
        cmd.push("--account".to_string());
        cmd.push(self.account);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hash160;

    #[test]
    fn test_deploy_cmd() {
        let cmd = NeoExpressCmdBuilder::new("default.neo-express", "genesis")
            .deploy(Path::new("build/PriceFeed.nef"));
        assert_eq!(
            cmd,
            vec![
                "contract",
                "deploy",
                "--json",
                "--input",
                "default.neo-express",
                "build/PriceFeed.nef",
                "genesis",
                "--force",
            ]
        );
    }

    #[test]
    fn test_invoke_cmd() {
        let service: Hash160 = "0x0102030405060708090a0b0c0d0e0f1011121314".parse().unwrap();
        let cmd = NeoExpressCmdBuilder::new("default.neo-express", "genesis").invoke(
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "registerService",
            &[
                ContractArg::from("vrf"),
                ContractArg::from(100_000i64),
                ContractArg::from(service),
            ],
        );
        assert_eq!(
            cmd,
            vec![
                "contract",
                "run",
                "--json",
                "--input",
                "default.neo-express",
                "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "registerService",
                "vrf",
                "100000",
                "0x14131211100f0e0d0c0b0a090807060504030201",
                "--account",
                "genesis",
            ]
        );
    }

    #[test]
    fn test_invoke_cmd_without_json() {
        let cmd = NeoExpressCmdBuilder::new("default.neo-express", "genesis")
            .json(false)
            .invoke(
                "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "setServiceFee",
                &[ContractArg::from("vrf"), ContractArg::from(10_000_000i64)],
            );
        assert!(!cmd.contains(&"--json".to_string()));
        assert_eq!(cmd[1], "run");
        assert!(cmd.ends_with(&[
            "vrf".to_string(),
            "10000000".to_string(),
            "--account".to_string(),
            "genesis".to_string(),
        ]));
    }
}
