// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger read endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Auth,
    error::ApiError,
    state::AppState,
    storage::LedgerEntry,
    wallet::DEFAULT_LIST_LIMIT,
};

/// Upper bound on a single page.
const MAX_LIST_LIMIT: usize = 200;

/// Query parameters for transaction list.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionListQuery {
    /// Maximum number of results (default: 50, max: 200)
    #[param(default = 50)]
    pub limit: Option<usize>,
}

/// Transaction list response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionListResponse {
    /// Ledger entries, newest first
    pub transactions: Vec<LedgerEntry>,
    /// Number of entries returned
    pub total: usize,
}

/// List the caller's ledger entries.
#[utoipa::path(
    get,
    path = "/v1/wallet/transactions",
    tag = "Transactions",
    params(TransactionListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transaction list", body = TransactionListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_transactions(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let transactions = state.ledger.list_for_user(&user.user_id, limit)?;
    Ok(Json(TransactionListResponse {
        total: transactions.len(),
        transactions,
    }))
}

/// Get one of the caller's ledger entries.
#[utoipa::path(
    get,
    path = "/v1/wallet/transactions/{transaction_id}",
    tag = "Transactions",
    params(
        ("transaction_id" = String, Path, description = "Ledger entry ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ledger entry", body = LedgerEntry),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let entry = state.ledger.get(&transaction_id, &user.user_id)?;
    Ok(Json(entry))
}
