// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger entry repository.
//!
//! A ledger entry records one attempted or completed value movement. Entries
//! are created before any chain interaction and are never deleted; only their
//! status and outcome fields change afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    scope_range, user_tx_key, CustodyDatabase, StorageError, StorageResult, DIGEST_INDEX,
    DIGEST_UNIQUE, TRANSACTIONS, TRANSACTION_ID_UNIQUE, USER_TX_INDEX,
};

/// Kind of value movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
    NativeChainTransfer,
    ContractCall,
    Fee,
    Reward,
    Refund,
    Exchange,
}

impl TransactionType {
    /// Value flows into the user's custody.
    pub fn is_incoming(self) -> bool {
        matches!(
            self,
            Self::Deposit | Self::TransferIn | Self::Reward | Self::Refund
        )
    }

    /// Value flows out of the user's custody.
    pub fn is_outgoing(self) -> bool {
        matches!(self, Self::Withdrawal | Self::TransferOut | Self::Fee)
    }
}

/// Ledger entry status.
///
/// ```text
/// pending ──► processing ──► completed
///    │            └────────► failed
///    ├──────────────────────► failed
///    └──────────────────────► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move ledger entry from {from} to {to}")]
pub struct InvalidTransition {
    pub from: TransactionStatus,
    pub to: TransactionStatus,
}

/// Stored ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Exact decimal string; never converted through floating point.
    pub amount: String,
    pub currency: String,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    /// On-chain receipt identifier; unique across the ledger when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_tx_digest: Option<String>,
    /// Raw execution receipt returned by the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub chain_details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Move to `next`, refusing transitions the state machine does not allow.
    pub fn transition_to(&mut self, next: TransactionStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    pub fn is_processing(&self) -> bool {
        self.status == TransactionStatus::Processing
    }

    pub fn is_failed(&self) -> bool {
        self.status == TransactionStatus::Failed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == TransactionStatus::Cancelled
    }

    /// Has an on-chain receipt attached.
    pub fn is_on_chain(&self) -> bool {
        self.chain_tx_digest.is_some()
    }

    pub fn is_incoming(&self) -> bool {
        self.tx_type.is_incoming()
    }

    pub fn is_outgoing(&self) -> bool {
        self.tx_type.is_outgoing()
    }

    /// `amount + fee_amount` in exact decimal arithmetic.
    pub fn total_amount(&self) -> Result<Decimal, rust_decimal::Error> {
        let amount = Decimal::from_str(&self.amount)?;
        let fee = match &self.fee_amount {
            Some(fee) => Decimal::from_str(fee)?,
            None => Decimal::ZERO,
        };
        amount
            .checked_add(fee)
            .ok_or(rust_decimal::Error::ExceedsMaximumPossibleValue)
    }
}

/// Repository for ledger entries.
pub struct TransactionRepository<'a> {
    db: &'a CustodyDatabase,
}

impl<'a> TransactionRepository<'a> {
    pub fn new(db: &'a CustodyDatabase) -> Self {
        Self { db }
    }

    /// Store a new entry. A non-null digest must not be claimed already.
    pub fn insert(&self, entry: &LedgerEntry) -> StorageResult<()> {
        let json = serde_json::to_vec(entry)?;

        let write_txn = self.db.raw().begin_write()?;
        {
            let mut rows = write_txn.open_table(TRANSACTIONS)?;
            if rows.get(entry.id.as_str())?.is_some() {
                return Err(StorageError::UniqueViolation {
                    constraint: TRANSACTION_ID_UNIQUE,
                    value: entry.id.clone(),
                });
            }

            if let Some(digest) = &entry.chain_tx_digest {
                let mut digests = write_txn.open_table(DIGEST_INDEX)?;
                if digests.get(digest.as_str())?.is_some() {
                    return Err(StorageError::UniqueViolation {
                        constraint: DIGEST_UNIQUE,
                        value: digest.clone(),
                    });
                }
                digests.insert(digest.as_str(), entry.id.as_str())?;
            }

            rows.insert(entry.id.as_str(), json.as_slice())?;

            let mut user_index = write_txn.open_table(USER_TX_INDEX)?;
            let key = user_tx_key(
                &entry.user_id,
                entry.created_at.timestamp_micros(),
                &entry.id,
            );
            user_index.insert(key.as_slice(), entry.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up one entry by id.
    pub fn get(&self, id: &str) -> StorageResult<Option<LedgerEntry>> {
        let read_txn = self.db.raw().begin_read()?;
        let rows = read_txn.open_table(TRANSACTIONS)?;
        match rows.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Replace an existing entry, keeping the digest index consistent.
    ///
    /// Claiming a digest that already belongs to another entry fails with
    /// [`StorageError::UniqueViolation`] and leaves both entries untouched.
    pub fn update(&self, entry: &LedgerEntry) -> StorageResult<()> {
        let json = serde_json::to_vec(entry)?;

        let write_txn = self.db.raw().begin_write()?;
        {
            let mut rows = write_txn.open_table(TRANSACTIONS)?;
            let previous: LedgerEntry = match rows.get(entry.id.as_str())? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StorageError::NotFound(format!("Ledger entry {}", entry.id))),
            };

            if previous.chain_tx_digest != entry.chain_tx_digest {
                let mut digests = write_txn.open_table(DIGEST_INDEX)?;
                if let Some(digest) = &entry.chain_tx_digest {
                    let owner = digests
                        .get(digest.as_str())?
                        .map(|value| value.value().to_string());
                    if matches!(owner, Some(ref id) if id != &entry.id) {
                        return Err(StorageError::UniqueViolation {
                            constraint: DIGEST_UNIQUE,
                            value: digest.clone(),
                        });
                    }
                    digests.insert(digest.as_str(), entry.id.as_str())?;
                }
                if let Some(old) = &previous.chain_tx_digest {
                    digests.remove(old.as_str())?;
                }
            }

            rows.insert(entry.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up the entry that claimed a digest.
    pub fn find_by_digest(&self, digest: &str) -> StorageResult<Option<LedgerEntry>> {
        let read_txn = self.db.raw().begin_read()?;
        let digests = read_txn.open_table(DIGEST_INDEX)?;
        let id = match digests.get(digest)? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };
        let rows = read_txn.open_table(TRANSACTIONS)?;
        match rows.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// A user's entries, newest first.
    pub fn list_by_user(&self, user_id: &str, limit: usize) -> StorageResult<Vec<LedgerEntry>> {
        let read_txn = self.db.raw().begin_read()?;
        let index = read_txn.open_table(USER_TX_INDEX)?;
        let rows = read_txn.open_table(TRANSACTIONS)?;

        let (start, end) = scope_range(user_id);
        let mut entries = Vec::new();
        for item in index.range(start.as_slice()..end.as_slice())? {
            if entries.len() >= limit {
                break;
            }
            let (_, id) = item?;
            if let Some(value) = rows.get(id.value())? {
                let entry: LedgerEntry = serde_json::from_slice(value.value())?;
                if entry.user_id == user_id {
                    entries.push(entry);
                }
            }
        }
        Ok(entries)
    }
}
