use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use slayer_deploy::ExportFormat;
use tracing::level_filters::LevelFilter;

/// The default network: the local neo-express instance.
const DEFAULT_NETWORK: &str = "neoexpress";

#[derive(Parser)]
#[command(name = "slayer")]
#[command(
    author,
    version,
    about = "Deploy, initialize and test the service layer contracts"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "SLAYER_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the settings file.
    ///
    /// Defaults to ./Slayer.toml. Every setting can also be given as a SLAYER_* environment
    /// variable (e.g. SLAYER_DEPLOYER), which takes precedence over the file.
    #[arg(long, alias = "conf", env = "SLAYER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy the compiled contracts and record their addresses.
    Deploy(DeployArgs),
    /// Configure the deployed contracts: roles, fees, service registration and wiring.
    Init(TargetArgs),
    /// Run the contract scenarios against a simulated session.
    Test(TargetArgs),
    /// List the recorded deployments of a network.
    Status(NetworkArgs),
    /// Print the recorded contract addresses of a network.
    Export(ExportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// The network: neoexpress (or local), testnet or mainnet.
    #[arg(default_value = DEFAULT_NETWORK)]
    pub network: String,

    /// Only handle contracts, stages or tests whose name contains this (case-insensitive).
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct NetworkArgs {
    /// The network: neoexpress (or local), testnet or mainnet.
    #[arg(default_value = DEFAULT_NETWORK)]
    pub network: String,
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub target: NetworkArgs,

    /// Output format: env, json or dotenv.
    #[arg(short, long, default_value_t = ExportFormat::Env)]
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Redeploy contracts that are already recorded as deployed on this network.
    #[arg(long, env = "SLAYER_REDEPLOY", default_value_t = false)]
    pub redeploy: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_network_defaults_to_local() {
        let cli = Cli::parse_from(["slayer", "init"]);
        match cli.command {
            Command::Init(args) => {
                assert_eq!(args.network, DEFAULT_NETWORK);
                assert_eq!(args.filter, None);
            }
            _ => panic!("expected init"),
        }
    }

    #[test]
    fn test_deploy_args() {
        let cli = Cli::parse_from(["slayer", "deploy", "testnet", "Gateway", "--redeploy"]);
        match cli.command {
            Command::Deploy(args) => {
                assert_eq!(args.target.network, "testnet");
                assert_eq!(args.target.filter.as_deref(), Some("Gateway"));
                assert!(args.redeploy);
            }
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn test_status_args() {
        let cli = Cli::parse_from(["slayer", "status"]);
        match cli.command {
            Command::Status(args) => assert_eq!(args.network, DEFAULT_NETWORK),
            _ => panic!("expected status"),
        }
    }

    #[test]
    fn test_export_args() {
        let cli = Cli::parse_from(["slayer", "export", "testnet", "--format", "json"]);
        match cli.command {
            Command::Export(args) => {
                assert_eq!(args.target.network, "testnet");
                assert_eq!(args.format, ExportFormat::Json);
            }
            _ => panic!("expected export"),
        }

        let cli = Cli::parse_from(["slayer", "export"]);
        match cli.command {
            Command::Export(args) => assert_eq!(args.format, ExportFormat::Env),
            _ => panic!("expected export"),
        }

        assert!(Cli::try_parse_from(["slayer", "export", "--format", "yaml"]).is_err());
    }
}
