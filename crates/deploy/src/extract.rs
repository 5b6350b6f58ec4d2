//! Identifier extraction from free-form tool output.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Hash160, error::ParseError};

// Runs of exactly N hex digits: a longer run (e.g. a tx hash when looking for an
// address) never matches, while any other neighbouring character is allowed.
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9a-fA-F])(?:0[xX])?([0-9a-fA-F]{40})(?:[^0-9a-fA-F]|$)")
        .expect("valid regex")
});

static TX_HASH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9a-fA-F])(?:0[xX])?([0-9a-fA-F]{64})(?:[^0-9a-fA-F]|$)")
        .expect("valid regex")
});

/// Extract the first 20-byte contract address in `output`.
pub fn extract_address(output: &str) -> Result<Hash160, ParseError> {
    ADDRESS_PATTERN
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| ParseError {
            expected: "contract address (40 hex digits)",
            output: output.to_string(),
        })
}

/// Extract the first 32-byte transaction id in `output`, as `0x`-prefixed lowercase hex.
///
/// Some successful tool invocations do not print a transaction id, so absence is not an error.
pub fn extract_tx_hash(output: &str) -> Option<String> {
    TX_HASH_PATTERN
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("0x{}", m.as_str().to_lowercase()))
}
