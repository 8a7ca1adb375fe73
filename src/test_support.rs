// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::U256;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tempfile::TempDir;

use crate::auth::claims::TokenClaims;
use crate::blockchain::signing::signer_address;
use crate::blockchain::{
    is_valid_address, ChainError, ChainGateway, ChainHealth, TransferReceipt, AVAX_FUJI,
};
use crate::encryption::KeyCipher;
use crate::state::{AppState, AuthConfig};
use crate::storage::{CustodyDatabase, UserRepository};
use crate::wallet::WalletAddressStore;

pub const TEST_ENCRYPTION_KEY: &str = "0123456789abcdef0123456789abcdef";

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

/// A well-formed recipient no test wallet will ever own.
pub const RECIPIENT: &str = "0x1111111111111111111111111111111111111111";

pub fn seeded_db(users: &[&str]) -> (Arc<CustodyDatabase>, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = CustodyDatabase::open(&dir.path().join("custody.redb")).unwrap();
    let repo = UserRepository::new(&db);
    for user in users {
        repo.ensure(user).unwrap();
    }
    (Arc::new(db), dir)
}

pub fn seeded_store(users: &[&str]) -> (WalletAddressStore, Arc<CustodyDatabase>, TempDir) {
    let (db, dir) = seeded_db(users);
    let cipher = Arc::new(KeyCipher::new(TEST_ENCRYPTION_KEY.as_bytes()).unwrap());
    (WalletAddressStore::new(db.clone(), cipher), db, dir)
}

/// Full application state over a temp database and a [`MockGateway`].
pub fn test_state() -> (AppState, Arc<MockGateway>, TempDir) {
    let (db, dir) = seeded_db(&[]);
    let cipher = Arc::new(KeyCipher::new(TEST_ENCRYPTION_KEY.as_bytes()).unwrap());
    let gateway = Arc::new(MockGateway::new());
    let state = AppState::new(
        db,
        cipher,
        gateway.clone(),
        AuthConfig::hs256(TEST_JWT_SECRET, None),
    );
    (state, gateway, dir)
}

/// HS256 token for `sub`, valid for an hour.
pub fn bearer_token(sub: &str) -> String {
    token_with(sub, TEST_JWT_SECRET, 3600, None)
}

pub fn token_with(sub: &str, secret: &str, expires_in: i64, issuer: Option<&str>) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = TokenClaims {
        sub: sub.to_string(),
        exp: now + expires_in,
        iat: Some(now),
        iss: issuer.map(str::to_string),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub sender: String,
    pub recipient: String,
    pub amount: U256,
}

/// In-memory [`ChainGateway`] with scripted transfer outcomes.
#[derive(Default)]
pub struct MockGateway {
    balances: Mutex<HashMap<String, String>>,
    failing_balances: Mutex<HashSet<String>>,
    outcomes: Mutex<VecDeque<Result<TransferReceipt, ChainError>>>,
    submitted: Mutex<Vec<Submission>>,
    delay: Mutex<Duration>,
    balance_delay: Mutex<Duration>,
    balance_in_flight: AtomicUsize,
    max_balance_in_flight: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    unhealthy: Mutex<bool>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, address: &str, wei: &str) {
        self.balances
            .lock()
            .unwrap()
            .insert(address.to_lowercase(), wei.to_string());
    }

    pub fn fail_balance(&self, address: &str) {
        self.failing_balances
            .lock()
            .unwrap()
            .insert(address.to_lowercase());
    }

    pub fn script_success(&self, digest: &str) {
        self.outcomes.lock().unwrap().push_back(Ok(TransferReceipt {
            digest: digest.to_string(),
            block_number: Some(1),
            raw_receipt: serde_json::json!({ "transactionHash": digest, "status": "0x1" }),
        }));
    }

    pub fn script_failure(&self, err: ChainError) {
        self.outcomes.lock().unwrap().push_back(Err(err));
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_balance_delay(&self, delay: Duration) {
        *self.balance_delay.lock().unwrap() = delay;
    }

    pub fn max_concurrent_balance_lookups(&self) -> usize {
        self.max_balance_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_unhealthy(&self) {
        *self.unhealthy.lock().unwrap() = true;
    }

    pub fn submitted(&self) -> Vec<Submission> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn max_concurrent_submissions(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainGateway for MockGateway {
    fn validate_address(&self, address: &str) -> bool {
        is_valid_address(address)
    }

    async fn get_balance(&self, address: &str) -> Result<String, ChainError> {
        let now = self.balance_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_balance_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.balance_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.balance_in_flight.fetch_sub(1, Ordering::SeqCst);

        let key = address.to_lowercase();
        if self.failing_balances.lock().unwrap().contains(&key) {
            return Err(ChainError::RpcError("balance unavailable".to_string()));
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| "0".to_string()))
    }

    async fn submit_native_transfer(
        &self,
        signer: PrivateKeySigner,
        recipient: &str,
        amount: U256,
    ) -> Result<TransferReceipt, ChainError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.submitted.lock().unwrap().push(Submission {
            sender: signer_address(&signer),
            recipient: recipient.to_string(),
            amount,
        });
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChainError::RpcError("no scripted outcome".to_string())));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn health_check(&self) -> Result<ChainHealth, ChainError> {
        if *self.unhealthy.lock().unwrap() {
            return Err(ChainError::RpcError("node unreachable".to_string()));
        }
        Ok(ChainHealth {
            network: AVAX_FUJI.key.to_string(),
            chain_id: AVAX_FUJI.chain_id,
            latest_block: 1,
        })
    }
}
