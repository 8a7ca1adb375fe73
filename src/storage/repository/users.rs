// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Minimal user registry.
//!
//! Users are owned by the identity provider. This table only records that an
//! authenticated subject has been seen so that the wallet core can check
//! existence before attaching addresses or ledger entries to it.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::super::database::{CustodyDatabase, StorageResult, USERS};

/// A known user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Subject identifier issued by the identity provider.
    pub user_id: String,
    /// When the user was first seen.
    pub created_at: DateTime<Utc>,
}

/// Repository for user existence checks.
pub struct UserRepository<'a> {
    db: &'a CustodyDatabase,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a CustodyDatabase) -> Self {
        Self { db }
    }

    /// Whether a user with this id exists.
    pub fn exists(&self, user_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(USERS)?;
        Ok(table.get(user_id)?.is_some())
    }

    /// Fetch a user record.
    pub fn get(&self, user_id: &str) -> StorageResult<Option<UserRecord>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Register a user if not already known. Returns the stored record.
    pub fn ensure(&self, user_id: &str) -> StorageResult<UserRecord> {
        let write_txn = self.db.raw().begin_write()?;
        let record = {
            let mut table = write_txn.open_table(USERS)?;
            let existing = match table.get(user_id)? {
                Some(value) => Some(serde_json::from_slice::<UserRecord>(value.value())?),
                None => None,
            };
            match existing {
                Some(record) => record,
                None => {
                    let record = UserRecord {
                        user_id: user_id.to_string(),
                        created_at: Utc::now(),
                    };
                    let json = serde_json::to_vec(&record)?;
                    table.insert(user_id, json.as_slice())?;
                    tracing::info!(user_id = %user_id, "Registered user");
                    record
                }
            }
        };
        write_txn.commit()?;
        Ok(record)
    }
}
