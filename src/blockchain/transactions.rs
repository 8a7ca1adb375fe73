// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction building and broadcasting for Avalanche C-Chain.
//!
//! This module provides EIP-1559 native transfers and the exact
//! human-amount ⇄ base-unit conversions used by the ledger.

use std::time::Duration;

use alloy::{
    network::EthereumWallet,
    primitives::U256,
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
};

use super::client::{parse_address, ChainError};
use super::types::{NetworkConfig, TransferReceipt};

/// Fallback base fee when the latest block omits one (25 gwei).
const DEFAULT_BASE_FEE: u128 = 25_000_000_000;

/// Standard priority fee for Avalanche (1.5 gwei).
const DEFAULT_PRIORITY_FEE: u128 = 1_500_000_000;

/// Transaction builder for Avalanche C-Chain.
pub struct TxBuilder {
    network: NetworkConfig,
    provider: alloy::providers::fillers::FillProvider<
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::JoinFill<
                alloy::providers::Identity,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::GasFiller,
                    alloy::providers::fillers::JoinFill<
                        alloy::providers::fillers::BlobGasFiller,
                        alloy::providers::fillers::JoinFill<
                            alloy::providers::fillers::NonceFiller,
                            alloy::providers::fillers::ChainIdFiller,
                        >,
                    >,
                >,
            >,
            alloy::providers::fillers::WalletFiller<EthereumWallet>,
        >,
        alloy::providers::RootProvider<alloy::network::Ethereum>,
    >,
}

impl TxBuilder {
    /// Create a new transaction builder with signing capabilities.
    pub fn new(network: NetworkConfig, rpc_url: url::Url, wallet: EthereumWallet) -> Self {
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(rpc_url);
        Self { network, provider }
    }

    /// Current `(max_fee_per_gas, max_priority_fee_per_gas)`.
    async fn get_gas_prices(&self) -> Result<(u128, u128), ChainError> {
        let block = self
            .provider
            .get_block_by_number(alloy::eips::BlockNumberOrTag::Latest)
            .await
            .map_err(|e| ChainError::RpcError(format!("Failed to get block: {}", e)))?
            .ok_or_else(|| ChainError::RpcError("No latest block".to_string()))?;

        let base_fee: u128 = block
            .header
            .base_fee_per_gas
            .map(|f| f as u128)
            .unwrap_or(DEFAULT_BASE_FEE);

        // Max fee = 2 * base_fee + priority_fee (allows for base fee increase)
        let max_fee = base_fee.saturating_mul(2).saturating_add(DEFAULT_PRIORITY_FEE);

        Ok((max_fee, DEFAULT_PRIORITY_FEE))
    }

    /// Send a native transfer and wait for its receipt.
    ///
    /// A transfer that was broadcast but whose receipt could not be obtained
    /// (or which reverted) reports its digest through
    /// [`ChainError::pending_digest`].
    pub async fn send_native(
        &self,
        to: &str,
        amount_wei: U256,
        receipt_timeout: Duration,
    ) -> Result<TransferReceipt, ChainError> {
        let to_addr = parse_address(to)?;
        let (max_fee_per_gas, priority_fee) = self.get_gas_prices().await?;

        let tx = TransactionRequest::default()
            .to(to_addr)
            .value(amount_wei)
            .max_fee_per_gas(max_fee_per_gas)
            .max_priority_fee_per_gas(priority_fee);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::TransactionFailed(format!("Failed to send: {}", e)))?;

        let digest = format!("{:?}", pending.tx_hash());
        tracing::info!(
            digest = %digest,
            network = %self.network.name,
            "Native transfer broadcast"
        );

        let receipt = pending
            .with_timeout(Some(receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| ChainError::ReceiptUnavailable {
                digest: digest.clone(),
                reason: e.to_string(),
            })?;

        if !receipt.status() {
            return Err(ChainError::Reverted { digest });
        }

        let raw_receipt = serde_json::to_value(&receipt)
            .map_err(|e| ChainError::UnexpectedResponse(e.to_string()))?;

        Ok(TransferReceipt {
            digest,
            block_number: receipt.block_number,
            raw_receipt,
        })
    }
}

/// Parse a human-readable amount to wei.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (18 for AVAX)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ChainError> {
    let parts: Vec<&str> = amount.split('.').collect();

    if parts.len() > 2 {
        return Err(ChainError::InvalidAmount("Invalid amount format".to_string()));
    }

    if !parts
        .iter()
        .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(ChainError::InvalidAmount("Amount must be a plain decimal".to_string()));
    }

    let whole = parts[0]
        .parse::<u128>()
        .map_err(|_| ChainError::InvalidAmount("Invalid whole number".to_string()))?;

    let decimal_part = if parts.len() == 2 {
        let dec_str = parts[1];
        if dec_str.len() > decimals as usize {
            return Err(ChainError::InvalidAmount(format!(
                "Too many decimal places (max {})",
                decimals
            )));
        }
        // Pad with zeros to match decimals
        let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
        padded
            .parse::<u128>()
            .map_err(|_| ChainError::InvalidAmount("Invalid decimal".to_string()))?
    } else {
        0u128
    };

    let multiplier = 10u128.pow(decimals as u32);
    let total = whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or_else(|| ChainError::InvalidAmount("Amount overflow".to_string()))?;

    Ok(U256::from(total))
}

/// Format wei to a human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}
