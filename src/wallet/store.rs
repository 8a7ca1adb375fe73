// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet address store: custodial keypair lifecycle.
//!
//! Generation, encrypted persistence and on-demand decryption of signing keys.
//! The plaintext PEM only exists inside [`WalletAddressStore::generate_address`]
//! and [`WalletAddressStore::get_decrypted_signing_key`], in zeroizing buffers,
//! and is never logged.

use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use chrono::Utc;
use k256::elliptic_curve::zeroize::Zeroizing;

use super::error::{WalletError, WalletResult};
use crate::blockchain::signing::{generate_keypair, signer_from_pem};
use crate::encryption::KeyCipher;
use crate::storage::database::{ADDRESS_UNIQUE, WALLET_ID_UNIQUE};
use crate::storage::{
    CustodyDatabase, StorageError, UserRepository, WalletAddress, WalletAddressRepository,
};

/// Maximum nickname length, in characters.
pub const MAX_NICKNAME_LEN: usize = 100;

#[derive(Clone)]
pub struct WalletAddressStore {
    db: Arc<CustodyDatabase>,
    cipher: Arc<KeyCipher>,
}

impl WalletAddressStore {
    pub fn new(db: Arc<CustodyDatabase>, cipher: Arc<KeyCipher>) -> Self {
        Self { db, cipher }
    }

    /// Generate, encrypt and persist a new address for `owner_id`.
    ///
    /// The returned entity carries the encrypted key; callers must not expose it.
    pub fn generate_address(
        &self,
        owner_id: &str,
        nickname: Option<String>,
    ) -> WalletResult<WalletAddress> {
        let nickname = normalize_nickname(nickname)?;

        if !UserRepository::new(&self.db).exists(owner_id)? {
            return Err(WalletError::OwnerNotFound(owner_id.to_string()));
        }

        let generated = generate_keypair()?;
        let encrypted = self.cipher.encrypt(&generated.private_key_pem)?;
        drop(generated.private_key_pem);

        let repo = WalletAddressRepository::new(&self.db);

        // Advisory fast path; the insert below is the authoritative check.
        if repo.find_by_address(&generated.address)?.is_some() {
            return Err(WalletError::AddressCollision(generated.address));
        }

        let now = Utc::now();
        let wallet = WalletAddress {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            address: generated.address,
            encrypted_private_key: Some(encrypted.clone()),
            is_active: true,
            nickname,
            created_at: now,
            updated_at: now,
        };

        repo.insert(&wallet, &encrypted).map_err(|err| match err {
            StorageError::UniqueViolation {
                constraint: ADDRESS_UNIQUE | WALLET_ID_UNIQUE,
                value,
            } => WalletError::AddressCollision(value),
            other => WalletError::Storage(other),
        })?;

        tracing::info!(
            wallet_address_id = %wallet.id,
            owner_id = %owner_id,
            address = %wallet.address,
            "Generated custodial address"
        );

        Ok(wallet)
    }

    /// Active addresses owned by `owner_id`, encrypted keys stripped.
    pub fn list_active_addresses(&self, owner_id: &str) -> WalletResult<Vec<WalletAddress>> {
        let wallets = WalletAddressRepository::new(&self.db).list_by_owner(owner_id)?;
        Ok(wallets.into_iter().filter(|w| w.is_active).collect())
    }

    /// Decrypt the signing key of an address owned by `owner_id`.
    ///
    /// Ownership is part of the lookup: an id owned by another user yields the
    /// same [`WalletError::AddressNotFound`] as an id that does not exist.
    pub fn get_decrypted_signing_key(
        &self,
        wallet_address_id: &str,
        owner_id: &str,
    ) -> WalletResult<PrivateKeySigner> {
        let wallet = WalletAddressRepository::new(&self.db)
            .find_owned_with_key(wallet_address_id, owner_id)?
            .ok_or(WalletError::AddressNotFound)?;

        let ciphertext = wallet
            .encrypted_private_key
            .ok_or(WalletError::KeyDecryptionFailed)?;

        let pem = Zeroizing::new(self.cipher.decrypt(&ciphertext).map_err(|err| {
            tracing::error!(
                wallet_address_id = %wallet_address_id,
                error = %err,
                "Failed to decrypt signing key"
            );
            WalletError::KeyDecryptionFailed
        })?);

        signer_from_pem(&pem).map_err(|_| {
            tracing::error!(
                wallet_address_id = %wallet_address_id,
                "Decrypted key material is not a valid secp256k1 key"
            );
            WalletError::KeyDecryptionFailed
        })
    }
}

fn normalize_nickname(nickname: Option<String>) -> WalletResult<Option<String>> {
    let Some(raw) = nickname else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_NICKNAME_LEN {
        return Err(WalletError::InvalidNickname(format!(
            "must be at most {MAX_NICKNAME_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}
