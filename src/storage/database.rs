// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded custody database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized UserRecord
//! - `wallet_addresses`: wallet_address_id → serialized WalletAddress (no key)
//! - `wallet_keys`: wallet_address_id → encrypted private key
//! - `address_index`: lowercase address → wallet_address_id (unique)
//! - `owner_address_index`: `owner \0 wallet_address_id` → wallet_address_id
//! - `transactions`: ledger entry id → serialized LedgerEntry
//! - `digest_index`: chain digest → ledger entry id (unique)
//! - `user_tx_index`: `user \0 !created_at \0 id` → ledger entry id
//!
//! Uniqueness is checked inside the same write transaction that inserts the
//! row, so the index tables are the authoritative guard against duplicate
//! addresses and digests. redb serializes writers, which makes the
//! check-then-insert atomic.

use std::path::Path;

use redb::{Database, ReadableDatabase, TableDefinition};

use super::paths::StoragePaths;

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

pub(crate) const WALLET_ADDRESSES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("wallet_addresses");

pub(crate) const WALLET_KEYS: TableDefinition<&str, &str> = TableDefinition::new("wallet_keys");

pub(crate) const ADDRESS_INDEX: TableDefinition<&str, &str> = TableDefinition::new("address_index");

pub(crate) const OWNER_ADDRESS_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("owner_address_index");

pub(crate) const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

pub(crate) const DIGEST_INDEX: TableDefinition<&str, &str> = TableDefinition::new("digest_index");

pub(crate) const USER_TX_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("user_tx_index");

/// Constraint name reported when a derived address already exists.
pub const ADDRESS_UNIQUE: &str = "wallet_addresses.address";

/// Constraint name reported when a wallet address id already exists.
pub const WALLET_ID_UNIQUE: &str = "wallet_addresses.id";

/// Constraint name reported when a chain digest is already claimed.
pub const DIGEST_UNIQUE: &str = "transactions.chain_tx_digest";

/// Constraint name reported when a ledger entry id already exists.
pub const TRANSACTION_ID_UNIQUE: &str = "transactions.id";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unique constraint {constraint} violated by {value}")]
    UniqueViolation {
        constraint: &'static str,
        value: String,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Separator between components of composite index keys. Identifiers never
/// contain NUL.
const KEY_SEPARATOR: u8 = 0x00;

/// `owner \0 suffix` composite key.
pub(crate) fn scoped_key(scope: &str, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(scope.len() + 1 + suffix.len());
    key.extend_from_slice(scope.as_bytes());
    key.push(KEY_SEPARATOR);
    key.extend_from_slice(suffix);
    key
}

/// Half-open range `[scope \0, scope \x01)` covering every key of one scope.
pub(crate) fn scope_range(scope: &str) -> (Vec<u8>, Vec<u8>) {
    let start = scoped_key(scope, &[]);
    let mut end = start.clone();
    if let Some(last) = end.last_mut() {
        *last = KEY_SEPARATOR + 1;
    }
    (start, end)
}

/// Key for the user ledger index: newest entries sort first.
pub(crate) fn user_tx_key(user_id: &str, created_at_micros: i64, entry_id: &str) -> Vec<u8> {
    let mut suffix = Vec::with_capacity(8 + 1 + entry_id.len());
    suffix.extend_from_slice(&(!(created_at_micros as u64)).to_be_bytes());
    suffix.push(KEY_SEPARATOR);
    suffix.extend_from_slice(entry_id.as_bytes());
    scoped_key(user_id, &suffix)
}

// =============================================================================
// CustodyDatabase
// =============================================================================

/// Embedded ACID store for users, wallet addresses and the ledger.
pub struct CustodyDatabase {
    db: Database,
}

impl CustodyDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(WALLET_ADDRESSES)?;
            let _ = write_txn.open_table(WALLET_KEYS)?;
            let _ = write_txn.open_table(ADDRESS_INDEX)?;
            let _ = write_txn.open_table(OWNER_ADDRESS_INDEX)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(DIGEST_INDEX)?;
            let _ = write_txn.open_table(USER_TX_INDEX)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Custody database opened");
        Ok(Self { db })
    }

    /// Open the database file inside a data directory.
    pub fn open_in(paths: &StoragePaths) -> StorageResult<Self> {
        Self::open(&paths.database())
    }

    /// Underlying redb handle for the repositories.
    pub(crate) fn raw(&self) -> &Database {
        &self.db
    }

    /// Cheap readiness probe: a read transaction can be opened and a table read.
    pub fn check(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}
