// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial wallet endpoints.
//!
//! Address generation, balance summary, and native transfers. All operations
//! require authentication and are scoped to the caller's own addresses.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    error::ApiError,
    state::AppState,
    wallet::{summarize_wallets, AddressSummary, TransferAmount, BALANCE_PLACEHOLDER},
};

/// Request to generate a new custodial address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GenerateAddressRequest {
    /// Optional label, at most 100 characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// A freshly generated address. The private key is never returned.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateAddressResponse {
    pub id: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub is_active: bool,
    /// Always "0" for a new address.
    pub balance: String,
    pub created_at: DateTime<Utc>,
}

/// Request to transfer the native asset.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// ID of one of the caller's addresses.
    pub from_wallet_address_id: String,
    /// Destination address (0x + 40 hex chars).
    pub recipient_address: String,
    /// Amount in AVAX, as a decimal string or JSON number (minimum 0.000000001).
    #[schema(value_type = String, example = "0.5")]
    pub amount: TransferAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub message: String,
    /// Chain transaction hash.
    pub digest: String,
    /// Ledger entry recording the transfer.
    pub transaction_log_id: String,
}

/// Generate a new custodial address for the authenticated user.
///
/// The keypair is created server-side and the private key is stored encrypted.
#[utoipa::path(
    post,
    path = "/v1/wallet/generate-address",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    request_body = GenerateAddressRequest,
    responses(
        (status = 201, description = "Address generated", body = GenerateAddressResponse),
        (status = 400, description = "Invalid nickname"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Address collision, retry"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn generate_address(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<GenerateAddressRequest>,
) -> Result<(StatusCode, Json<GenerateAddressResponse>), ApiError> {
    let wallet = state
        .wallets
        .generate_address(&user.user_id, request.nickname)?;

    let response = GenerateAddressResponse {
        id: wallet.id,
        address: wallet.address,
        nickname: wallet.nickname,
        is_active: wallet.is_active,
        balance: BALANCE_PLACEHOLDER.to_string(),
        created_at: wallet.created_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// List the caller's active addresses with current balances.
///
/// A balance that cannot be fetched is reported as "0" for that address.
#[utoipa::path(
    get,
    path = "/v1/wallet/my-wallet-summary",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active addresses with balances", body = [AddressSummary]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn my_wallet_summary(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<AddressSummary>>, ApiError> {
    let summaries =
        summarize_wallets(&state.wallets, state.gateway.as_ref(), &user.user_id).await?;
    Ok(Json(summaries))
}

/// Transfer the native asset from one of the caller's addresses.
///
/// A ledger entry is written before submission and finalized with the
/// outcome; failed transfers are reported with that entry's id.
#[utoipa::path(
    post,
    path = "/v1/wallet/transfer",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer confirmed", body = TransferResponse),
        (status = 400, description = "Invalid recipient"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Wallet address not found"),
        (status = 409, description = "Self transfer or duplicate digest"),
        (status = 422, description = "Invalid amount"),
        (status = 500, description = "Transfer failed")
    )
)]
pub async fn transfer(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let result = state
        .transfers
        .transfer_value(
            &request.from_wallet_address_id,
            &request.recipient_address,
            &request.amount,
            &user.user_id,
        )
        .await?;

    Ok(Json(TransferResponse {
        message: "Transfer completed".to_string(),
        digest: result.digest,
        transaction_log_id: result.ledger_entry.id,
    }))
}
