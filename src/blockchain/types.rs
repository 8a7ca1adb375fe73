// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Avalanche network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Short identifier used in configuration (`fuji`, `mainnet`)
    pub key: &'static str,
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Default RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Avalanche C-Chain Mainnet configuration.
pub const AVAX_MAINNET: NetworkConfig = NetworkConfig {
    key: NETWORK_MAINNET,
    name: "Avalanche C-Chain",
    chain_id: 43114,
    rpc_url: "https://api.avax.network/ext/bc/C/rpc",
    explorer_url: "https://snowtrace.io",
};

/// Avalanche Fuji Testnet configuration.
pub const AVAX_FUJI: NetworkConfig = NetworkConfig {
    key: NETWORK_FUJI,
    name: "Avalanche Fuji Testnet",
    chain_id: 43113,
    rpc_url: "https://api.avax-test.network/ext/bc/C/rpc",
    explorer_url: "https://testnet.snowtrace.io",
};

pub const NETWORK_FUJI: &str = "fuji";
pub const NETWORK_MAINNET: &str = "mainnet";

/// Decimals of the native asset.
pub const NATIVE_DECIMALS: u8 = 18;

/// Display symbol of the native asset.
pub const NATIVE_SYMBOL: &str = "AVAX";

/// Symbol recorded on ledger entries, whose amounts are in base units.
pub const BASE_UNIT_SYMBOL: &str = "wei";

/// Resolve a configured network name. Unset means Fuji.
pub fn network_from_name(raw: Option<&str>) -> Result<NetworkConfig, String> {
    let value = raw.unwrap_or(NETWORK_FUJI).trim().to_ascii_lowercase();
    match value.as_str() {
        NETWORK_FUJI => Ok(AVAX_FUJI),
        NETWORK_MAINNET => Ok(AVAX_MAINNET),
        other => Err(format!(
            "Unknown network `{other}` (expected `{NETWORK_FUJI}` or `{NETWORK_MAINNET}`)"
        )),
    }
}

/// Outcome of a successfully executed native transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    /// Transaction hash (0x prefixed)
    pub digest: String,
    /// Block number where the transaction was included
    pub block_number: Option<u64>,
    /// Raw receipt as returned by the node
    pub raw_receipt: serde_json::Value,
}

/// Chain connectivity report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChainHealth {
    /// Network name
    pub network: String,
    /// Chain ID reported by the node
    pub chain_id: u64,
    /// Latest block number
    pub latest_block: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_defaults_to_fuji() {
        assert_eq!(network_from_name(None).unwrap(), AVAX_FUJI);
        assert_eq!(network_from_name(Some(" FUJI ")).unwrap(), AVAX_FUJI);
    }

    #[test]
    fn network_accepts_mainnet() {
        assert_eq!(network_from_name(Some("mainnet")).unwrap().chain_id, 43114);
    }

    #[test]
    fn network_rejects_unknown() {
        assert!(network_from_name(Some("sepolia")).is_err());
    }
}
