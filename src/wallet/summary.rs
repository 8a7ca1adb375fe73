// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Best-effort balance view over a user's active addresses.

use std::str::FromStr;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use serde::Serialize;
use utoipa::ToSchema;

use super::error::WalletResult;
use super::store::WalletAddressStore;
use crate::blockchain::{format_amount, ChainError, ChainGateway, NATIVE_DECIMALS};
use crate::storage::WalletAddress;

/// Placeholder reported when a balance cannot be fetched.
pub const BALANCE_PLACEHOLDER: &str = "0";

/// Balance lookups issued at once for one listing.
const BALANCE_CONCURRENCY: usize = 8;

/// One active address with its current balance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AddressSummary {
    pub id: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub is_active: bool,
    /// Balance in wei
    pub balance: String,
    /// Balance in AVAX
    pub balance_formatted: String,
    /// False when the balance is the placeholder because the lookup failed
    pub balance_available: bool,
    pub created_at: DateTime<Utc>,
}

/// List `owner_id`'s active addresses with balances.
///
/// Lookups run concurrently and results keep the store's order. A failed
/// lookup degrades that entry to [`BALANCE_PLACEHOLDER`]; it never fails the
/// listing.
pub async fn summarize_wallets(
    store: &WalletAddressStore,
    gateway: &dyn ChainGateway,
    owner_id: &str,
) -> WalletResult<Vec<AddressSummary>> {
    let wallets = store.list_active_addresses(owner_id)?;

    let summaries: Vec<AddressSummary> = stream::iter(wallets)
        .map(|wallet| async move {
            let balance = gateway.get_balance(&wallet.address).await;
            summarize(wallet, balance)
        })
        .buffered(BALANCE_CONCURRENCY)
        .collect()
        .await;

    Ok(summaries)
}

fn summarize(wallet: WalletAddress, balance: Result<String, ChainError>) -> AddressSummary {
    let (balance, balance_available) = match balance {
        Ok(balance) => (balance, true),
        Err(err) => {
            tracing::warn!(
                wallet_address_id = %wallet.id,
                address = %wallet.address,
                error = %err,
                "Balance lookup failed, reporting placeholder"
            );
            (BALANCE_PLACEHOLDER.to_string(), false)
        }
    };

    let balance_formatted = U256::from_str(&balance)
        .map(|wei| format_amount(wei, NATIVE_DECIMALS))
        .unwrap_or_else(|_| BALANCE_PLACEHOLDER.to_string());

    AddressSummary {
        id: wallet.id,
        address: wallet.address,
        nickname: wallet.nickname,
        is_active: wallet.is_active,
        balance,
        balance_formatted,
        balance_available,
        created_at: wallet.created_at,
    }
}
