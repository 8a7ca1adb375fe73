// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet address repository.
//!
//! Address rows and their encrypted private keys live in separate tables.
//! Every default read returns a [`WalletAddress`] with
//! `encrypted_private_key = None`; the key is only attached by
//! [`WalletAddressRepository::find_owned_with_key`].

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::super::database::{
    scope_range, scoped_key, CustodyDatabase, StorageError, StorageResult, ADDRESS_INDEX,
    ADDRESS_UNIQUE, OWNER_ADDRESS_INDEX, WALLET_ADDRESSES, WALLET_ID_UNIQUE, WALLET_KEYS,
};

/// A custodial address owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAddress {
    pub id: String,
    pub owner_id: String,
    /// Chain-native public address (lowercase `0x` hex).
    pub address: String,
    /// Ciphertext of the private key. Only populated on creation and on
    /// explicit opt-in reads; never serialized.
    #[serde(skip)]
    pub encrypted_private_key: Option<String>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletAddress {
    /// Copy without the encrypted key, for handing to anything that reads.
    pub fn redacted(&self) -> Self {
        Self {
            encrypted_private_key: None,
            ..self.clone()
        }
    }
}

/// Lowercase form used by the uniqueness index.
fn index_form(address: &str) -> String {
    address.to_ascii_lowercase()
}

/// Repository for wallet address rows.
pub struct WalletAddressRepository<'a> {
    db: &'a CustodyDatabase,
}

impl<'a> WalletAddressRepository<'a> {
    pub fn new(db: &'a CustodyDatabase) -> Self {
        Self { db }
    }

    /// Insert a new address row together with its encrypted key.
    ///
    /// Fails with [`StorageError::UniqueViolation`] if the address (or id) is
    /// already present. The check runs inside the write transaction.
    pub fn insert(&self, wallet: &WalletAddress, encrypted_key: &str) -> StorageResult<()> {
        let json = serde_json::to_vec(&wallet.redacted())?;
        let indexed = index_form(&wallet.address);

        let write_txn = self.db.raw().begin_write()?;
        {
            let mut address_index = write_txn.open_table(ADDRESS_INDEX)?;
            if address_index.get(indexed.as_str())?.is_some() {
                return Err(StorageError::UniqueViolation {
                    constraint: ADDRESS_UNIQUE,
                    value: wallet.address.clone(),
                });
            }

            let mut rows = write_txn.open_table(WALLET_ADDRESSES)?;
            if rows.get(wallet.id.as_str())?.is_some() {
                return Err(StorageError::UniqueViolation {
                    constraint: WALLET_ID_UNIQUE,
                    value: wallet.id.clone(),
                });
            }

            rows.insert(wallet.id.as_str(), json.as_slice())?;
            address_index.insert(indexed.as_str(), wallet.id.as_str())?;

            let mut keys = write_txn.open_table(WALLET_KEYS)?;
            keys.insert(wallet.id.as_str(), encrypted_key)?;

            let mut owner_index = write_txn.open_table(OWNER_ADDRESS_INDEX)?;
            let owner_key = scoped_key(&wallet.owner_id, wallet.id.as_bytes());
            owner_index.insert(owner_key.as_slice(), wallet.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up an address row by its public address (any case).
    pub fn find_by_address(&self, address: &str) -> StorageResult<Option<WalletAddress>> {
        let read_txn = self.db.raw().begin_read()?;
        let index = read_txn.open_table(ADDRESS_INDEX)?;
        let id = match index.get(index_form(address).as_str())? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };

        let rows = read_txn.open_table(WALLET_ADDRESSES)?;
        match rows.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Fetch a row scoped to its owner. A row owned by someone else is
    /// reported exactly like a missing row.
    pub fn find_owned(&self, id: &str, owner_id: &str) -> StorageResult<Option<WalletAddress>> {
        let read_txn = self.db.raw().begin_read()?;
        let rows = read_txn.open_table(WALLET_ADDRESSES)?;
        let wallet: WalletAddress = match rows.get(id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Ok(None),
        };

        if wallet.owner_id != owner_id {
            return Ok(None);
        }
        Ok(Some(wallet))
    }

    /// Like [`Self::find_owned`] but also loads the encrypted private key.
    pub fn find_owned_with_key(
        &self,
        id: &str,
        owner_id: &str,
    ) -> StorageResult<Option<WalletAddress>> {
        let read_txn = self.db.raw().begin_read()?;
        let rows = read_txn.open_table(WALLET_ADDRESSES)?;
        let mut wallet: WalletAddress = match rows.get(id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Ok(None),
        };

        if wallet.owner_id != owner_id {
            return Ok(None);
        }

        let keys = read_txn.open_table(WALLET_KEYS)?;
        wallet.encrypted_private_key = match keys.get(id)? {
            Some(value) => Some(value.value().to_string()),
            None => return Err(StorageError::NotFound(format!("Key for wallet address {id}"))),
        };
        Ok(Some(wallet))
    }

    /// All rows owned by a user, active or not.
    pub fn list_by_owner(&self, owner_id: &str) -> StorageResult<Vec<WalletAddress>> {
        let read_txn = self.db.raw().begin_read()?;
        let owner_index = read_txn.open_table(OWNER_ADDRESS_INDEX)?;
        let rows = read_txn.open_table(WALLET_ADDRESSES)?;

        let (start, end) = scope_range(owner_id);
        let mut wallets = Vec::new();
        for entry in owner_index.range(start.as_slice()..end.as_slice())? {
            let (_, id) = entry?;
            if let Some(value) = rows.get(id.value())? {
                let wallet: WalletAddress = serde_json::from_slice(value.value())?;
                if wallet.owner_id == owner_id {
                    wallets.push(wallet);
                }
            }
        }
        Ok(wallets)
    }

    /// Flip the active flag on an owned row.
    ///
    /// Deactivation is not offered through the HTTP surface yet; it exists so
    /// that operators and tests can retire an address without deleting it.
    pub fn set_active(
        &self,
        id: &str,
        owner_id: &str,
        active: bool,
    ) -> StorageResult<WalletAddress> {
        let write_txn = self.db.raw().begin_write()?;
        let wallet = {
            let mut rows = write_txn.open_table(WALLET_ADDRESSES)?;
            let mut wallet: WalletAddress = match rows.get(id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StorageError::NotFound(format!("Wallet address {id}"))),
            };
            if wallet.owner_id != owner_id {
                return Err(StorageError::NotFound(format!("Wallet address {id}")));
            }

            wallet.is_active = active;
            wallet.updated_at = Utc::now();
            let json = serde_json::to_vec(&wallet)?;
            rows.insert(id, json.as_slice())?;
            wallet
        };
        write_txn.commit()?;
        Ok(wallet)
    }
}
