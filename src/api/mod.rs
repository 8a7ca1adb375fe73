// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    blockchain::ChainHealth,
    state::AppState,
    storage::{LedgerEntry, TransactionStatus, TransactionType},
    wallet::AddressSummary,
};

pub mod health;
pub mod transactions;
pub mod wallet;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/wallet/generate-address", post(wallet::generate_address))
        .route("/wallet/my-wallet-summary", get(wallet::my_wallet_summary))
        .route("/wallet/transfer", post(wallet::transfer))
        .route("/wallet/transactions", get(transactions::list_transactions))
        .route(
            "/wallet/transactions/{transaction_id}",
            get(transactions::get_transaction),
        );

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        wallet::generate_address,
        wallet::my_wallet_summary,
        wallet::transfer,
        transactions::list_transactions,
        transactions::get_transaction
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            ChainHealth,
            wallet::GenerateAddressRequest,
            wallet::GenerateAddressResponse,
            wallet::TransferRequest,
            wallet::TransferResponse,
            AddressSummary,
            transactions::TransactionListResponse,
            LedgerEntry,
            TransactionStatus,
            TransactionType
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Wallet", description = "Custodial addresses and transfers"),
        (name = "Transactions", description = "Transaction ledger")
    )
)]
struct ApiDoc;
