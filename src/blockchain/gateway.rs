// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain gateway: the narrow surface the wallet core needs from the network.
//!
//! The core only ever talks to a `dyn ChainGateway`, which keeps the transfer
//! protocol testable without a node. [`AvaxGateway`] is the production
//! implementation over Avalanche C-Chain.

use std::time::Duration;

use alloy::{network::EthereumWallet, primitives::U256, signers::local::PrivateKeySigner};
use async_trait::async_trait;

use super::client::{is_valid_address, AvaxClient, ChainError};
use super::transactions::TxBuilder;
use super::types::{ChainHealth, NetworkConfig, TransferReceipt};

/// How long to wait for a receipt after broadcasting.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Whether `address` is a well-formed address on this chain.
    fn validate_address(&self, address: &str) -> bool;

    /// Native balance of `address`, as a decimal string in base units.
    async fn get_balance(&self, address: &str) -> Result<String, ChainError>;

    /// Sign and submit a native transfer. The signer is consumed so the key
    /// does not outlive the call.
    async fn submit_native_transfer(
        &self,
        signer: PrivateKeySigner,
        recipient: &str,
        amount: U256,
    ) -> Result<TransferReceipt, ChainError>;

    /// Connectivity check used at startup and by readiness probes.
    async fn health_check(&self) -> Result<ChainHealth, ChainError>;
}

/// Avalanche C-Chain gateway.
pub struct AvaxGateway {
    client: AvaxClient,
    receipt_timeout: Duration,
}

impl AvaxGateway {
    pub fn new(network: NetworkConfig, rpc_override: Option<&str>) -> Result<Self, ChainError> {
        Ok(Self {
            client: AvaxClient::new(network, rpc_override)?,
            receipt_timeout: RECEIPT_TIMEOUT,
        })
    }

    pub fn network(&self) -> &NetworkConfig {
        self.client.network()
    }
}

#[async_trait]
impl ChainGateway for AvaxGateway {
    fn validate_address(&self, address: &str) -> bool {
        is_valid_address(address)
    }

    async fn get_balance(&self, address: &str) -> Result<String, ChainError> {
        let balance = self.client.get_native_balance(address).await?;
        Ok(balance.to_string())
    }

    async fn submit_native_transfer(
        &self,
        signer: PrivateKeySigner,
        recipient: &str,
        amount: U256,
    ) -> Result<TransferReceipt, ChainError> {
        let builder = TxBuilder::new(
            self.client.network().clone(),
            self.client.rpc_url().clone(),
            EthereumWallet::from(signer),
        );
        builder
            .send_native(recipient, amount, self.receipt_timeout)
            .await
    }

    async fn health_check(&self) -> Result<ChainHealth, ChainError> {
        let network = self.client.network();
        let chain_id = self.client.get_chain_id().await?;
        if chain_id != network.chain_id {
            return Err(ChainError::ChainMismatch {
                expected: network.chain_id,
                actual: chain_id,
            });
        }
        let latest_block = self.client.get_block_number().await?;

        Ok(ChainHealth {
            network: network.name.to_string(),
            chain_id,
            latest_block,
        })
    }
}
