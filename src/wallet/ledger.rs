// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger service: creation and status changes of ledger entries.
//!
//! Entries are written before any chain interaction and are never deleted.
//! Every status change goes through [`LedgerEntry::transition_to`] against the
//! stored row, so a terminal entry cannot be reopened even by a stale caller.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use super::error::{WalletError, WalletResult};
use crate::storage::database::DIGEST_UNIQUE;
use crate::storage::{
    CustodyDatabase, LedgerEntry, StorageError, TransactionRepository, TransactionStatus,
    TransactionType, UserRepository,
};

/// Default page size for ledger listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Fields supplied when recording a new entry.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub tx_type: TransactionType,
    pub amount: String,
    pub currency: String,
    pub status: TransactionStatus,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<Value>,
    pub fee_amount: Option<String>,
    pub fee_currency: Option<String>,
    pub reference_id: Option<String>,
}

impl NewLedgerEntry {
    /// A pending entry with no auxiliary details.
    pub fn pending(tx_type: TransactionType, amount: String, currency: &str) -> Self {
        Self {
            tx_type,
            amount,
            currency: currency.to_string(),
            status: TransactionStatus::Pending,
            from_address: None,
            to_address: None,
            description: None,
            metadata: None,
            fee_amount: None,
            fee_currency: None,
            reference_id: None,
        }
    }
}

/// How a submitted entry ended.
#[derive(Debug, Clone)]
pub enum LedgerOutcome {
    Completed {
        digest: String,
        block_number: Option<u64>,
        chain_details: Value,
    },
    Failed {
        reason: String,
        /// Extra keys merged into `metadata` next to `error`.
        details: Option<Map<String, Value>>,
    },
}

#[derive(Clone)]
pub struct Ledger {
    db: Arc<CustodyDatabase>,
}

impl Ledger {
    pub fn new(db: Arc<CustodyDatabase>) -> Self {
        Self { db }
    }

    /// Persist a new entry for `user_id`.
    pub fn record(&self, user_id: &str, new: NewLedgerEntry) -> WalletResult<LedgerEntry> {
        if !UserRepository::new(&self.db).exists(user_id)? {
            return Err(WalletError::OwnerNotFound(user_id.to_string()));
        }
        validate_decimal("amount", &new.amount)?;
        if let Some(fee) = &new.fee_amount {
            validate_decimal("fee", fee)?;
        }

        let now = Utc::now();
        let entry = LedgerEntry {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            tx_type: new.tx_type,
            amount: new.amount,
            currency: new.currency,
            status: new.status,
            from_address: new.from_address,
            to_address: new.to_address,
            chain_tx_digest: None,
            chain_details: None,
            block_number: None,
            fee_amount: new.fee_amount,
            fee_currency: new.fee_currency,
            exchange_rate: None,
            reference_id: new.reference_id,
            description: new.description,
            metadata: new.metadata,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };

        TransactionRepository::new(&self.db).insert(&entry)?;
        tracing::info!(
            ledger_entry_id = %entry.id,
            user_id = %user_id,
            tx_type = ?entry.tx_type,
            status = %entry.status,
            "Ledger entry recorded"
        );
        Ok(entry)
    }

    /// Owner-scoped lookup.
    pub fn get(&self, id: &str, user_id: &str) -> WalletResult<LedgerEntry> {
        TransactionRepository::new(&self.db)
            .get(id)?
            .filter(|entry| entry.user_id == user_id)
            .ok_or_else(|| WalletError::LedgerEntryNotFound(id.to_string()))
    }

    /// A user's entries, newest first.
    pub fn list_for_user(&self, user_id: &str, limit: usize) -> WalletResult<Vec<LedgerEntry>> {
        Ok(TransactionRepository::new(&self.db).list_by_user(user_id, limit)?)
    }

    /// `pending → processing`, immediately before a chain submission.
    pub fn mark_processing(&self, entry: &LedgerEntry) -> WalletResult<LedgerEntry> {
        let mut current = self.load(&entry.id)?;
        current.transition_to(TransactionStatus::Processing)?;
        TransactionRepository::new(&self.db).update(&current)?;
        Ok(current)
    }

    /// `pending → cancelled`.
    pub fn cancel(&self, id: &str, user_id: &str) -> WalletResult<LedgerEntry> {
        let mut current = self.get(id, user_id)?;
        current.transition_to(TransactionStatus::Cancelled)?;
        TransactionRepository::new(&self.db).update(&current)?;
        tracing::info!(ledger_entry_id = %id, "Ledger entry cancelled");
        Ok(current)
    }

    /// Move an entry to its terminal state.
    ///
    /// A digest already claimed by another entry fails with
    /// [`WalletError::DuplicateDigest`] and leaves this entry unchanged.
    pub fn finalize(&self, entry: &LedgerEntry, outcome: LedgerOutcome) -> WalletResult<LedgerEntry> {
        let mut current = self.load(&entry.id)?;

        match outcome {
            LedgerOutcome::Completed {
                digest,
                block_number,
                chain_details,
            } => {
                current.transition_to(TransactionStatus::Completed)?;
                current.chain_tx_digest = Some(digest);
                current.block_number = block_number;
                current.chain_details = Some(chain_details);
            }
            LedgerOutcome::Failed { reason, details } => {
                current.transition_to(TransactionStatus::Failed)?;
                let mut metadata = match current.metadata.take() {
                    Some(Value::Object(map)) => map,
                    Some(other) => {
                        let mut map = Map::new();
                        map.insert("previous".to_string(), other);
                        map
                    }
                    None => Map::new(),
                };
                if let Some(details) = details {
                    metadata.extend(details);
                }
                metadata.insert("error".to_string(), json!(reason));
                current.metadata = Some(Value::Object(metadata));
                current.failure_reason = Some(reason);
            }
        }

        TransactionRepository::new(&self.db)
            .update(&current)
            .map_err(|err| match err {
                StorageError::UniqueViolation {
                    constraint: DIGEST_UNIQUE,
                    value,
                } => WalletError::DuplicateDigest(value),
                other => WalletError::Storage(other),
            })?;

        tracing::info!(
            ledger_entry_id = %current.id,
            status = %current.status,
            digest = current.chain_tx_digest.as_deref().unwrap_or(""),
            "Ledger entry finalized"
        );
        Ok(current)
    }

    fn load(&self, id: &str) -> WalletResult<LedgerEntry> {
        TransactionRepository::new(&self.db)
            .get(id)?
            .ok_or_else(|| WalletError::LedgerEntryNotFound(id.to_string()))
    }
}

fn validate_decimal(field: &str, value: &str) -> WalletResult<()> {
    Decimal::from_str(value)
        .map(|_| ())
        .map_err(|_| WalletError::InvalidAmount(format!("{field} must be a decimal string")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seeded_db;

    fn ledger(users: &[&str]) -> (Ledger, tempfile::TempDir) {
        let (db, dir) = seeded_db(users);
        (Ledger::new(db), dir)
    }

    fn native(amount: &str) -> NewLedgerEntry {
        NewLedgerEntry::pending(TransactionType::NativeChainTransfer, amount.to_string(), "wei")
    }

    #[test]
    fn record_requires_known_user() {
        let (ledger, _dir) = ledger(&[]);
        assert!(matches!(
            ledger.record("ghost", native("1")),
            Err(WalletError::OwnerNotFound(_))
        ));
    }

    #[test]
    fn record_rejects_non_decimal_amounts() {
        let (ledger, _dir) = ledger(&["alice"]);
        assert!(matches!(
            ledger.record("alice", native("1,5")),
            Err(WalletError::InvalidAmount(_))
        ));

        let mut with_fee = native("1");
        with_fee.fee_amount = Some("lots".to_string());
        assert!(matches!(
            ledger.record("alice", with_fee),
            Err(WalletError::InvalidAmount(_))
        ));
    }

    #[test]
    fn record_keeps_amount_string_verbatim() {
        let (ledger, _dir) = ledger(&["alice"]);
        let entry = ledger.record("alice", native("123456789000000000")).unwrap();
        assert_eq!(entry.amount, "123456789000000000");
        assert!(entry.is_pending());

        let stored = ledger.get(&entry.id, "alice").unwrap();
        assert_eq!(stored, entry);
    }

    #[test]
    fn get_is_owner_scoped() {
        let (ledger, _dir) = ledger(&["alice", "bob"]);
        let entry = ledger.record("alice", native("1")).unwrap();
        assert!(matches!(
            ledger.get(&entry.id, "bob"),
            Err(WalletError::LedgerEntryNotFound(_))
        ));
    }

    #[test]
    fn finalize_success_stores_digest() {
        let (ledger, _dir) = ledger(&["alice"]);
        let entry = ledger.record("alice", native("1")).unwrap();
        let entry = ledger.mark_processing(&entry).unwrap();

        let done = ledger
            .finalize(
                &entry,
                LedgerOutcome::Completed {
                    digest: "0xabc123".to_string(),
                    block_number: Some(7),
                    chain_details: json!({"status": "0x1"}),
                },
            )
            .unwrap();

        assert!(done.is_completed());
        assert!(done.is_on_chain());
        assert_eq!(done.chain_tx_digest.as_deref(), Some("0xabc123"));
        assert_eq!(done.block_number, Some(7));
        assert_eq!(ledger.get(&done.id, "alice").unwrap(), done);
    }

    #[test]
    fn finalize_failure_records_reason_and_metadata() {
        let (ledger, _dir) = ledger(&["alice"]);
        let mut new = native("1");
        new.metadata = Some(json!({"channel": "api"}));
        let entry = ledger.record("alice", new).unwrap();

        let mut details = Map::new();
        details.insert("pending_digest".to_string(), json!("0xfeed"));
        let failed = ledger
            .finalize(
                &entry,
                LedgerOutcome::Failed {
                    reason: "rpc timeout".to_string(),
                    details: Some(details),
                },
            )
            .unwrap();

        assert!(failed.is_failed());
        assert!(!failed.is_on_chain());
        assert_eq!(failed.failure_reason.as_deref(), Some("rpc timeout"));
        let metadata = failed.metadata.unwrap();
        assert_eq!(metadata["error"], "rpc timeout");
        assert_eq!(metadata["channel"], "api");
        assert_eq!(metadata["pending_digest"], "0xfeed");
    }

    #[test]
    fn terminal_entries_cannot_be_refinalized() {
        let (ledger, _dir) = ledger(&["alice"]);
        let entry = ledger.record("alice", native("1")).unwrap();
        ledger
            .finalize(
                &entry,
                LedgerOutcome::Failed {
                    reason: "boom".to_string(),
                    details: None,
                },
            )
            .unwrap();

        let again = ledger.finalize(
            &entry,
            LedgerOutcome::Completed {
                digest: "0x1".to_string(),
                block_number: None,
                chain_details: json!({}),
            },
        );
        assert!(matches!(again, Err(WalletError::InvalidStatusTransition(_))));
        assert!(ledger.get(&entry.id, "alice").unwrap().is_failed());
    }

    #[test]
    fn pending_entry_cannot_complete_without_processing() {
        let (ledger, _dir) = ledger(&["alice"]);
        let entry = ledger.record("alice", native("1")).unwrap();

        let result = ledger.finalize(
            &entry,
            LedgerOutcome::Completed {
                digest: "0x1".to_string(),
                block_number: None,
                chain_details: json!({}),
            },
        );
        assert!(matches!(result, Err(WalletError::InvalidStatusTransition(_))));
        assert!(ledger.get(&entry.id, "alice").unwrap().is_pending());
    }

    #[test]
    fn duplicate_digest_on_finalize_is_distinct() {
        let (ledger, _dir) = ledger(&["alice"]);
        let first = ledger.record("alice", native("1")).unwrap();
        let first = ledger.mark_processing(&first).unwrap();
        let second = ledger.record("alice", native("2")).unwrap();
        let second = ledger.mark_processing(&second).unwrap();

        let completed = |digest: &str| LedgerOutcome::Completed {
            digest: digest.to_string(),
            block_number: None,
            chain_details: json!({}),
        };

        ledger.finalize(&first, completed("0xsame")).unwrap();
        let err = ledger.finalize(&second, completed("0xsame")).unwrap_err();

        assert!(matches!(err, WalletError::DuplicateDigest(ref d) if d == "0xsame"));
        let untouched = ledger.get(&second.id, "alice").unwrap();
        assert!(untouched.is_processing());
        assert!(untouched.chain_tx_digest.is_none());
        assert_eq!(
            ledger.get(&first.id, "alice").unwrap().chain_tx_digest.as_deref(),
            Some("0xsame")
        );
    }

    #[test]
    fn cancel_only_from_pending() {
        let (ledger, _dir) = ledger(&["alice"]);
        let entry = ledger.record("alice", native("1")).unwrap();
        assert!(ledger.cancel(&entry.id, "alice").unwrap().is_cancelled());
        assert!(matches!(
            ledger.cancel(&entry.id, "alice"),
            Err(WalletError::InvalidStatusTransition(_))
        ));

        let processing = ledger.record("alice", native("1")).unwrap();
        ledger.mark_processing(&processing).unwrap();
        assert!(matches!(
            ledger.cancel(&processing.id, "alice"),
            Err(WalletError::InvalidStatusTransition(_))
        ));
    }

    #[test]
    fn list_for_user_returns_newest_first() {
        let (ledger, _dir) = ledger(&["alice"]);
        let first = ledger.record("alice", native("1")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ledger.record("alice", native("2")).unwrap();

        let listed = ledger.list_for_user("alice", DEFAULT_LIST_LIMIT).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn listing_excludes_user_ids_extending_another() {
        let (ledger, _dir) = ledger(&["alice", "alice\0evil"]);
        let mine = ledger.record("alice", native("1")).unwrap();
        ledger.record("alice\0evil", native("2")).unwrap();

        let listed = ledger.list_for_user("alice", DEFAULT_LIST_LIMIT).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
    }
}
