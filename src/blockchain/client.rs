// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only Avalanche C-Chain client.

use std::str::FromStr;

use alloy::{
    network::Ethereum,
    primitives::{Address, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
};

use super::types::*;

/// HTTP provider type for Avalanche C-Chain (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Avalanche C-Chain client for balance and connectivity queries.
pub struct AvaxClient {
    network: NetworkConfig,
    rpc_url: url::Url,
    provider: HttpProvider,
}

impl AvaxClient {
    /// Create a client for `network`, optionally overriding its RPC endpoint.
    pub fn new(network: NetworkConfig, rpc_override: Option<&str>) -> Result<Self, ChainError> {
        let raw = rpc_override.unwrap_or(network.rpc_url);
        let rpc_url: url::Url = raw
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(rpc_url.clone());

        Ok(Self {
            network,
            rpc_url,
            provider,
        })
    }

    /// Native balance of `address` in wei.
    pub async fn get_native_balance(&self, address: &str) -> Result<U256, ChainError> {
        let addr = parse_address(address)?;
        self.provider
            .get_balance(addr)
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))
    }

    /// Get the current block number.
    pub async fn get_block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))
    }

    /// Chain id reported by the node.
    pub async fn get_chain_id(&self) -> Result<u64, ChainError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// RPC endpoint in use.
    pub fn rpc_url(&self) -> &url::Url {
        &self.rpc_url
    }
}

/// Whether `address` is a well-formed `0x`-prefixed 20-byte hex address.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == 42 && address.starts_with("0x") && Address::from_str(address).is_ok()
}

pub(crate) fn parse_address(address: &str) -> Result<Address, ChainError> {
    if !is_valid_address(address) {
        return Err(ChainError::InvalidAddress(address.to_string()));
    }
    Address::from_str(address).map_err(|e| ChainError::InvalidAddress(e.to_string()))
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Transaction {digest} reverted")]
    Reverted { digest: String },

    #[error("Receipt for {digest} unavailable: {reason}")]
    ReceiptUnavailable { digest: String, reason: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Connected to chain {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl ChainError {
    /// Digest of a transaction that was broadcast before the failure, if any.
    pub fn pending_digest(&self) -> Option<&str> {
        match self {
            ChainError::Reverted { digest } | ChainError::ReceiptUnavailable { digest, .. } => {
                Some(digest)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_address_shape() {
        assert!(is_valid_address("0x742d35cc6634c0532925a3b844bc454e4438f44e"));
        assert!(is_valid_address("0x742d35Cc6634C0532925a3b844Bc454e4438f44e"));

        assert!(!is_valid_address(""));
        assert!(!is_valid_address("742d35cc6634c0532925a3b844bc454e4438f44e"));
        assert!(!is_valid_address("0x742d35cc6634c0532925a3b844bc454e4438f4"));
        assert!(!is_valid_address("0x742d35cc6634c0532925a3b844bc454e4438f44z"));
        assert!(!is_valid_address(
            "0x742d35cc6634c0532925a3b844bc454e4438f44e742d35cc6634c0532925a3b8"
        ));
    }

    #[test]
    fn parse_address_reports_input() {
        let err = parse_address("nope").unwrap_err();
        assert!(matches!(err, ChainError::InvalidAddress(ref a) if a == "nope"));
    }

    #[test]
    fn pending_digest_only_for_broadcast_failures() {
        let reverted = ChainError::Reverted {
            digest: "0xabc".to_string(),
        };
        assert_eq!(reverted.pending_digest(), Some("0xabc"));
        assert_eq!(ChainError::RpcError("down".into()).pending_digest(), None);
    }

    #[test]
    fn client_rejects_bad_rpc_override() {
        assert!(matches!(
            AvaxClient::new(AVAX_FUJI, Some("not a url")),
            Err(ChainError::InvalidRpcUrl(_))
        ));
    }

    #[tokio::test]
    async fn client_uses_network_default_rpc() {
        let client = AvaxClient::new(AVAX_FUJI, None).unwrap();
        assert_eq!(client.rpc_url().as_str(), "https://api.avax-test.network/ext/bc/C/rpc");
        assert_eq!(client.network().chain_id, 43113);
    }
}
