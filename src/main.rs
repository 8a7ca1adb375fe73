// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use relational_custody::{
    api::router,
    blockchain::{gateway::RECEIPT_TIMEOUT, AvaxGateway, ChainGateway},
    config::AppConfig,
    encryption::KeyCipher,
    logging::init_tracing,
    state::{AppState, AuthConfig},
    storage::{CustodyDatabase, StoragePaths},
    tls,
};

type StartupResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Grace period for in-flight requests after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Upper bound on waiting for in-flight transfers after the listener stops.
const TRANSFER_DRAIN_TIMEOUT: Duration = RECEIPT_TIMEOUT.saturating_add(Duration::from_secs(30));

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> StartupResult<()> {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    let db = Arc::new(CustodyDatabase::open_in(&StoragePaths::new(&config.data_dir))?);
    let cipher = Arc::new(KeyCipher::new(config.encryption_key.as_bytes())?);

    let gateway = AvaxGateway::new(config.network.clone(), config.rpc_url.as_deref())?;
    let health = gateway.health_check().await?;
    tracing::info!(
        network = %health.network,
        chain_id = health.chain_id,
        latest_block = health.latest_block,
        "Connected to chain RPC"
    );

    let state = AppState::new(
        db,
        cipher,
        Arc::new(gateway),
        AuthConfig::hs256(&config.jwt_secret, config.jwt_issuer.clone()),
    );
    let transfers = state.transfers.clone();
    let app = router(state);

    let handle = Handle::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    let addr = config.bind_addr;
    match &config.tls {
        Some(paths) => {
            let tls_config = RustlsConfig::from_config(tls::server_config(&paths.cert, &paths.key)?);
            tracing::info!(%addr, "Relational Custody listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::warn!(%addr, "TLS not configured, serving plain HTTP (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    let pending = transfers.in_flight();
    if pending > 0 {
        tracing::info!(pending, "Waiting for in-flight transfers to finalize");
        if tokio::time::timeout(TRANSFER_DRAIN_TIMEOUT, transfers.drain())
            .await
            .is_err()
        {
            tracing::error!(
                pending = transfers.in_flight(),
                "Transfers still running at shutdown; their ledger entries need reconciliation"
            );
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_on_ctrl_c(handle: Handle<std::net::SocketAddr>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown requested, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
