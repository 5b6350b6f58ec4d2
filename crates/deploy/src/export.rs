//! Deployed addresses rendered for other tools: shell exports, JSON or a dotenv file.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{DeploymentState, GATEWAY, Hash160};

/// Output format of [`export_addresses`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    /// `export CONTRACT_<NAME>_ADDRESS=0x...` lines.
    Env,
    /// A JSON object of contract name to address.
    Json,
    /// `CONTRACT_<NAME>_ADDRESS=0x...` lines under a header.
    Dotenv,
}

/// Environment variable holding the address of `contract`.
///
/// `PaymentHub` becomes `CONTRACT_PAYMENT_HUB_ADDRESS`; the gateway is
/// `CONTRACT_SERVICE_GATEWAY_ADDRESS`.
pub fn address_env_var(contract: &str) -> String {
    if contract == GATEWAY {
        return "CONTRACT_SERVICE_GATEWAY_ADDRESS".to_string();
    }

    let chars: Vec<char> = contract.chars().collect();
    let mut name = String::with_capacity(contract.len() + 8);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                name.push('_');
            }
        }
        name.push(c.to_ascii_uppercase());
    }
    format!("CONTRACT_{name}_ADDRESS")
}

/// Addresses of every contract recorded as deployed on the state's network, by name.
pub fn deployed_addresses(state: &DeploymentState) -> BTreeMap<String, Hash160> {
    state
        .contracts
        .values()
        .chain(state.miniapp_contracts.values())
        .filter(|record| record.is_deployed_on(&state.network))
        .map(|record| (record.name.clone(), record.address))
        .collect()
}

/// Render the deployed addresses of `state`.
///
/// `generated_at` is only used by the dotenv header.
pub fn export_addresses(
    state: &DeploymentState,
    format: ExportFormat,
    generated_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    let addresses = deployed_addresses(state);

    let env_lines = |prefix: &str| {
        addresses
            .iter()
            .map(|(name, address)| format!("{prefix}{}={address}", address_env_var(name)))
            .collect::<Vec<_>>()
    };

    let output = match format {
        ExportFormat::Env => env_lines("export ").join("\n"),
        ExportFormat::Json => serde_json::to_string_pretty(&addresses)?,
        ExportFormat::Dotenv => {
            let mut lines = vec![
                format!("# Neo N3 contract addresses ({})", state.network),
                format!(
                    "# Generated at: {}",
                    generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
                ),
            ];
            lines.extend(env_lines(""));
            lines.join("\n")
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{ContractGroup, DeploymentRecord, DeploymentStatus, Network};

    fn state() -> DeploymentState {
        let profile = Network::Testnet.profile();
        let mut state = DeploymentState::default();
        state.seed(&profile, "deployer");
        for (i, name) in ["PaymentHub", GATEWAY].iter().enumerate() {
            state.merge_record(
                ContractGroup::Core,
                DeploymentRecord::deployed(*name, Hash160::from_bytes([i as u8 + 1; 20]), "testnet", None),
            );
        }
        state.merge_record(
            ContractGroup::MiniApp,
            DeploymentRecord::deployed("MiniAppILGuard", Hash160::from_bytes([9; 20]), "testnet", None),
        );

        let mut failed = DeploymentRecord::deployed("Governance", Hash160::from_bytes([7; 20]), "testnet", None);
        failed.status = DeploymentStatus::Failed;
        state.merge_record(ContractGroup::Core, failed);
        // Seeded from another network: not deployed here.
        state.merge_record(
            ContractGroup::Core,
            DeploymentRecord::deployed("PriceFeed", Hash160::from_bytes([8; 20]), "mainnet", None),
        );
        state
    }

    #[test]
    fn test_address_env_var() {
        assert_eq!(address_env_var("PaymentHub"), "CONTRACT_PAYMENT_HUB_ADDRESS");
        assert_eq!(address_env_var("AutomationAnchor"), "CONTRACT_AUTOMATION_ANCHOR_ADDRESS");
        assert_eq!(address_env_var(GATEWAY), "CONTRACT_SERVICE_GATEWAY_ADDRESS");
        assert_eq!(address_env_var("VRFService"), "CONTRACT_VRF_SERVICE_ADDRESS");
        assert_eq!(address_env_var("MiniAppILGuard"), "CONTRACT_MINI_APP_IL_GUARD_ADDRESS");
        assert_eq!(address_env_var("MiniAppAITrader"), "CONTRACT_MINI_APP_AI_TRADER_ADDRESS");
    }

    #[test]
    fn test_only_deployed_records_on_this_network() {
        let addresses = deployed_addresses(&state());
        let names: Vec<_> = addresses.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["MiniAppILGuard", "PaymentHub", GATEWAY]);
    }

    #[test]
    fn test_env_export() {
        let output = export_addresses(&state(), ExportFormat::Env, Utc::now()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.contains(&"export CONTRACT_PAYMENT_HUB_ADDRESS=0x0101010101010101010101010101010101010101"));
        assert!(lines.contains(&"export CONTRACT_SERVICE_GATEWAY_ADDRESS=0x0202020202020202020202020202020202020202"));
    }

    #[test]
    fn test_json_export() {
        let output = export_addresses(&state(), ExportFormat::Json, Utc::now()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["PaymentHub"], "0x0101010101010101010101010101010101010101");
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_dotenv_export() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let output = export_addresses(&state(), ExportFormat::Dotenv, at).unwrap();
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("# Neo N3 contract addresses (testnet)"));
        assert_eq!(lines.next(), Some("# Generated at: 2026-01-02T03:04:05Z"));
        assert!(lines.all(|l| l.starts_with("CONTRACT_")));
    }

    #[test]
    fn test_format_names() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        let names: Vec<_> = ExportFormat::iter().map(|f| f.to_string()).collect();
        assert_eq!(names, vec!["env", "json", "dotenv"]);
        assert!("yaml".parse::<ExportFormat>().is_err());
    }
}
