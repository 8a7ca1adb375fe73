// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use jsonwebtoken::DecodingKey;

use crate::blockchain::ChainGateway;
use crate::encryption::KeyCipher;
use crate::storage::CustodyDatabase;
use crate::wallet::{Ledger, TransferOrchestrator, WalletAddressStore};

/// Bearer token verification settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub decoding_key: DecodingKey,
    /// Expected `iss`; unchecked when `None`.
    pub issuer: Option<String>,
}

impl AuthConfig {
    pub fn hs256(secret: &str, issuer: Option<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }
}

/// Shared handles for request handlers.
///
/// Built once at startup: database, then cipher and store, then ledger,
/// then gateway, then the orchestrator over all three.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<CustodyDatabase>,
    pub wallets: WalletAddressStore,
    pub ledger: Ledger,
    pub gateway: Arc<dyn ChainGateway>,
    pub transfers: Arc<TransferOrchestrator>,
    pub auth_config: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(
        db: Arc<CustodyDatabase>,
        cipher: Arc<KeyCipher>,
        gateway: Arc<dyn ChainGateway>,
        auth_config: AuthConfig,
    ) -> Self {
        let wallets = WalletAddressStore::new(db.clone(), cipher);
        let ledger = Ledger::new(db.clone());
        let transfers = Arc::new(TransferOrchestrator::new(
            wallets.clone(),
            ledger.clone(),
            gateway.clone(),
        ));

        Self {
            db,
            wallets,
            ledger,
            gateway,
            transfers,
            auth_config: Arc::new(auth_config),
        }
    }
}
