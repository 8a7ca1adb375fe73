// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer orchestration.
//!
//! A transfer runs under the per-address lock:
//!
//! 1. recover the sender's signer (ownership checked by the store)
//! 2. validate the recipient and refuse self transfers
//! 3. record a `pending` ledger entry
//! 4. mark it `processing` and submit through the gateway
//! 5. finalize the entry as `completed` or `failed`
//!
//! The sequence runs on its own task, so a caller that goes away (client
//! disconnect, transport timeout) does not cancel a submission halfway. Every
//! submission attempt therefore leaves exactly one terminal ledger entry
//! behind, whatever the gateway did. [`TransferOrchestrator::drain`] waits for
//! in-flight transfers at shutdown.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::watch;

use super::amount::TransferAmount;
use super::error::{WalletError, WalletResult};
use super::ledger::{Ledger, LedgerOutcome, NewLedgerEntry};
use super::locks::AddressLocks;
use super::store::WalletAddressStore;
use crate::blockchain::signing::signer_address;
use crate::blockchain::{ChainGateway, BASE_UNIT_SYMBOL, NATIVE_SYMBOL};
use crate::storage::{LedgerEntry, TransactionType};

/// Longest recipient string accepted before chain-level validation.
pub const MAX_RECIPIENT_LEN: usize = 66;

/// Failure reason recorded when a receipt digest is already on the ledger.
pub const DUPLICATE_DIGEST_REASON: &str = "duplicate chain digest";

#[derive(Debug, Clone)]
pub struct TransferResult {
    pub ledger_entry: LedgerEntry,
    pub digest: String,
}

#[derive(Clone)]
pub struct TransferOrchestrator {
    store: WalletAddressStore,
    ledger: Ledger,
    gateway: Arc<dyn ChainGateway>,
    locks: AddressLocks,
    in_flight: Arc<watch::Sender<usize>>,
}

/// Counts one running transfer task.
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn start(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl TransferOrchestrator {
    pub fn new(store: WalletAddressStore, ledger: Ledger, gateway: Arc<dyn ChainGateway>) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            store,
            ledger,
            gateway,
            locks: AddressLocks::new(),
            in_flight: Arc::new(in_flight),
        }
    }

    /// Move `amount` of the native asset from one of `user_id`'s addresses.
    ///
    /// Dropping the returned future does not stop the transfer; its outcome
    /// is still written to the ledger entry.
    pub async fn transfer_value(
        &self,
        from_wallet_address_id: &str,
        recipient: &str,
        amount: &TransferAmount,
        user_id: &str,
    ) -> WalletResult<TransferResult> {
        let this = self.clone();
        let from_wallet_address_id = from_wallet_address_id.to_string();
        let recipient = recipient.to_string();
        let amount = amount.clone();
        let user_id = user_id.to_string();
        let in_flight = InFlight::start(&self.in_flight);

        let task = tokio::spawn(async move {
            let _in_flight = in_flight;
            this.run_transfer(&from_wallet_address_id, &recipient, &amount, &user_id)
                .await
        });

        task.await.map_err(|err| {
            tracing::error!(error = %err, "Transfer task did not complete");
            WalletError::TaskAborted(err.to_string())
        })?
    }

    /// Number of transfers currently running.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait until no transfer is running.
    pub async fn drain(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    async fn run_transfer(
        &self,
        from_wallet_address_id: &str,
        recipient: &str,
        amount: &TransferAmount,
        user_id: &str,
    ) -> WalletResult<TransferResult> {
        let _guard = self.locks.acquire(from_wallet_address_id).await;

        let signer = self
            .store
            .get_decrypted_signing_key(from_wallet_address_id, user_id)?;
        let sender = signer_address(&signer);

        let recipient = recipient.trim();
        if recipient.len() > MAX_RECIPIENT_LEN || !self.gateway.validate_address(recipient) {
            return Err(WalletError::InvalidRecipient(recipient.to_string()));
        }
        if sender.eq_ignore_ascii_case(recipient) {
            return Err(WalletError::SelfTransferRejected);
        }

        let mut new = NewLedgerEntry::pending(
            TransactionType::NativeChainTransfer,
            amount.base_units().to_string(),
            BASE_UNIT_SYMBOL,
        );
        new.from_address = Some(sender.clone());
        new.to_address = Some(recipient.to_string());
        new.description = Some(format!("Native transfer to {recipient}"));
        new.metadata = Some(json!({
            "amount": amount.human(),
            "symbol": NATIVE_SYMBOL,
            "from_wallet_address_id": from_wallet_address_id,
        }));
        let entry = self.ledger.record(user_id, new)?;

        let entry = match self.ledger.mark_processing(&entry) {
            Ok(entry) => entry,
            Err(err) => {
                self.fail(&entry, err.to_string(), None);
                return Err(err);
            }
        };

        tracing::info!(
            ledger_entry_id = %entry.id,
            from = %sender,
            to = %recipient,
            amount = %amount.human(),
            "Submitting native transfer"
        );

        let receipt = match self
            .gateway
            .submit_native_transfer(signer, recipient, amount.base_units())
            .await
        {
            Ok(receipt) => receipt,
            Err(chain_err) => {
                let reason = chain_err.to_string();
                let details = chain_err.pending_digest().map(|digest| {
                    let mut map = Map::new();
                    map.insert("pending_digest".to_string(), Value::from(digest));
                    map
                });
                tracing::warn!(
                    ledger_entry_id = %entry.id,
                    error = %reason,
                    "Native transfer failed"
                );
                self.fail(&entry, reason.clone(), details);
                return Err(WalletError::TransferFailed {
                    ledger_entry_id: entry.id,
                    reason,
                });
            }
        };

        let digest = receipt.digest.clone();
        let completed = LedgerOutcome::Completed {
            digest: receipt.digest,
            block_number: receipt.block_number,
            chain_details: receipt.raw_receipt,
        };

        match self.ledger.finalize(&entry, completed) {
            Ok(ledger_entry) => {
                tracing::info!(
                    ledger_entry_id = %ledger_entry.id,
                    digest = %digest,
                    "Native transfer completed"
                );
                Ok(TransferResult {
                    ledger_entry,
                    digest,
                })
            }
            Err(WalletError::DuplicateDigest(dup)) => {
                tracing::error!(
                    ledger_entry_id = %entry.id,
                    digest = %dup,
                    "Receipt digest already recorded on another ledger entry"
                );
                let mut details = Map::new();
                details.insert("digest".to_string(), Value::from(dup.clone()));
                self.fail(&entry, DUPLICATE_DIGEST_REASON.to_string(), Some(details));
                Err(WalletError::DuplicateDigest(dup))
            }
            Err(err) => {
                // Value has moved on chain; the digest must survive in the logs.
                tracing::error!(
                    ledger_entry_id = %entry.id,
                    digest = %digest,
                    error = %err,
                    "Transfer confirmed on chain but ledger finalization failed"
                );
                Err(err)
            }
        }
    }

    fn fail(&self, entry: &LedgerEntry, reason: String, details: Option<Map<String, Value>>) {
        if let Err(err) = self
            .ledger
            .finalize(entry, LedgerOutcome::Failed { reason, details })
        {
            tracing::error!(
                ledger_entry_id = %entry.id,
                error = %err,
                "Failed to record transfer failure"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::time::Duration;

    use alloy::primitives::U256;
    use rust_decimal::Decimal;

    use crate::blockchain::ChainError;
    use crate::storage::{CustodyDatabase, TransactionRepository, TransactionStatus};
    use crate::test_support::{seeded_store, MockGateway, RECIPIENT};

    struct Harness {
        orchestrator: Arc<TransferOrchestrator>,
        store: WalletAddressStore,
        ledger: Ledger,
        gateway: Arc<MockGateway>,
        db: Arc<CustodyDatabase>,
        _dir: tempfile::TempDir,
    }

    fn harness(users: &[&str]) -> Harness {
        let (store, db, dir) = seeded_store(users);
        let ledger = Ledger::new(db.clone());
        let gateway = Arc::new(MockGateway::new());
        let orchestrator = Arc::new(TransferOrchestrator::new(
            store.clone(),
            ledger.clone(),
            gateway.clone(),
        ));
        Harness {
            orchestrator,
            store,
            ledger,
            gateway,
            db,
            _dir: dir,
        }
    }

    fn amount(text: &str) -> TransferAmount {
        TransferAmount::parse(text).unwrap()
    }

    #[tokio::test]
    async fn successful_transfer_completes_ledger_entry() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();
        h.gateway.script_success("0xabc123");

        let result = h
            .orchestrator
            .transfer_value(&wallet.id, RECIPIENT, &amount("0.5"), "alice")
            .await
            .unwrap();

        assert_eq!(result.digest, "0xabc123");
        let entry = h.ledger.get(&result.ledger_entry.id, "alice").unwrap();
        assert_eq!(entry.status, TransactionStatus::Completed);
        assert_eq!(entry.chain_tx_digest.as_deref(), Some("0xabc123"));
        assert_eq!(entry.amount, "500000000000000000");
        assert_eq!(entry.currency, "wei");
        assert_eq!(entry.from_address.as_deref(), Some(wallet.address.as_str()));
        assert_eq!(entry.to_address.as_deref(), Some(RECIPIENT));
        assert_eq!(entry.tx_type, TransactionType::NativeChainTransfer);

        let submitted = h.gateway.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].sender, wallet.address);
        assert_eq!(submitted[0].amount, U256::from(500_000_000_000_000_000u64));
    }

    #[tokio::test]
    async fn gateway_failure_leaves_failed_entry() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();
        h.gateway
            .script_failure(ChainError::RpcError("insufficient funds".to_string()));

        let err = h
            .orchestrator
            .transfer_value(&wallet.id, RECIPIENT, &amount("1"), "alice")
            .await
            .unwrap_err();

        let WalletError::TransferFailed {
            ledger_entry_id,
            reason,
        } = err
        else {
            panic!("expected TransferFailed, got {err:?}");
        };
        assert!(reason.contains("insufficient funds"));

        let entry = h.ledger.get(&ledger_entry_id, "alice").unwrap();
        assert_eq!(entry.status, TransactionStatus::Failed);
        assert!(entry.chain_tx_digest.is_none());
        assert!(entry.failure_reason.unwrap().contains("insufficient funds"));
        assert!(entry.metadata.unwrap()["error"]
            .as_str()
            .unwrap()
            .contains("insufficient funds"));
    }

    #[tokio::test]
    async fn unconfirmed_broadcast_keeps_pending_digest() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();
        h.gateway.script_failure(ChainError::ReceiptUnavailable {
            digest: "0xfeed".to_string(),
            reason: "timed out".to_string(),
        });

        let err = h
            .orchestrator
            .transfer_value(&wallet.id, RECIPIENT, &amount("1"), "alice")
            .await
            .unwrap_err();
        let WalletError::TransferFailed {
            ledger_entry_id, ..
        } = err
        else {
            panic!("expected TransferFailed");
        };

        let entry = h.ledger.get(&ledger_entry_id, "alice").unwrap();
        assert!(entry.is_failed());
        assert!(entry.chain_tx_digest.is_none());
        assert_eq!(entry.metadata.unwrap()["pending_digest"], "0xfeed");
    }

    #[tokio::test]
    async fn self_transfer_is_rejected_without_ledger_entry() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();

        let err = h
            .orchestrator
            .transfer_value(
                &wallet.id,
                &wallet.address.to_uppercase().replacen("0X", "0x", 1),
                &amount("1"),
                "alice",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WalletError::SelfTransferRejected));
        assert!(h.ledger.list_for_user("alice", 10).unwrap().is_empty());
        assert!(h.gateway.submitted().is_empty());
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected_without_ledger_entry() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();

        for recipient in ["0x1234", "not-an-address", &format!("0x{}", "a".repeat(70))] {
            let err = h
                .orchestrator
                .transfer_value(&wallet.id, recipient, &amount("1"), "alice")
                .await
                .unwrap_err();
            assert!(matches!(err, WalletError::InvalidRecipient(_)), "{recipient}");
        }
        assert!(h.ledger.list_for_user("alice", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_address_is_not_found() {
        let h = harness(&["alice", "mallory"]);
        let wallet = h.store.generate_address("alice", None).unwrap();

        let err = h
            .orchestrator
            .transfer_value(&wallet.id, RECIPIENT, &amount("1"), "mallory")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::AddressNotFound));
        assert!(h.gateway.submitted().is_empty());
    }

    #[tokio::test]
    async fn duplicate_digest_fails_second_entry() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();
        h.gateway.script_success("0xdup");
        h.gateway.script_success("0xdup");

        let first = h
            .orchestrator
            .transfer_value(&wallet.id, RECIPIENT, &amount("1"), "alice")
            .await
            .unwrap();
        let err = h
            .orchestrator
            .transfer_value(&wallet.id, RECIPIENT, &amount("2"), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::DuplicateDigest(ref d) if d == "0xdup"));

        let entries = h.ledger.list_for_user("alice", 10).unwrap();
        assert_eq!(entries.len(), 2);
        let second = entries
            .iter()
            .find(|e| e.id != first.ledger_entry.id)
            .unwrap();
        assert!(second.is_failed());
        assert_eq!(second.failure_reason.as_deref(), Some(DUPLICATE_DIGEST_REASON));
        assert!(second.chain_tx_digest.is_none());

        let owner = TransactionRepository::new(&h.db)
            .find_by_digest("0xdup")
            .unwrap()
            .unwrap();
        assert_eq!(owner.id, first.ledger_entry.id);
    }

    #[tokio::test]
    async fn amount_precision_is_preserved() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();
        h.gateway.script_success("0xprecise");

        let result = h
            .orchestrator
            .transfer_value(&wallet.id, RECIPIENT, &amount("0.123456789"), "alice")
            .await
            .unwrap();

        let expected = Decimal::from_str("0.123456789").unwrap() * Decimal::from(10u64.pow(18));
        assert_eq!(result.ledger_entry.total_amount().unwrap(), expected);
        assert_eq!(result.ledger_entry.amount, "123456789000000000");
    }

    #[tokio::test]
    async fn every_attempt_ends_terminal() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();
        h.gateway.script_success("0x01");
        h.gateway
            .script_failure(ChainError::TransactionFailed("nonce too low".to_string()));
        h.gateway.script_success("0x02");

        for _ in 0..3 {
            let _ = h
                .orchestrator
                .transfer_value(&wallet.id, RECIPIENT, &amount("1"), "alice")
                .await;
        }

        let entries = h.ledger.list_for_user("alice", 10).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.status.is_terminal()));
        assert_eq!(entries.iter().filter(|e| e.is_completed()).count(), 2);
        assert!(entries
            .iter()
            .filter(|e| e.is_completed())
            .all(|e| e.chain_tx_digest.is_some()));
    }

    #[tokio::test]
    async fn transfers_from_same_address_do_not_overlap() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();
        h.gateway.set_submit_delay(Duration::from_millis(20));
        for i in 0..4 {
            h.gateway.script_success(&format!("0x{i:02}"));
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let orchestrator = h.orchestrator.clone();
            let id = wallet.id.clone();
            handles.push(tokio::spawn(async move {
                orchestrator
                    .transfer_value(&id, RECIPIENT, &amount("1"), "alice")
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(h.gateway.max_concurrent_submissions(), 1);
        assert_eq!(h.ledger.list_for_user("alice", 10).unwrap().len(), 4);
    }

    async fn wait_until_idle(orchestrator: &TransferOrchestrator) {
        tokio::time::timeout(Duration::from_secs(5), orchestrator.drain())
            .await
            .expect("transfer did not finish");
    }

    #[tokio::test]
    async fn dropped_caller_still_finalizes_entry() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();
        h.gateway.set_submit_delay(Duration::from_millis(200));
        h.gateway.script_success("0xlate");

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            h.orchestrator
                .transfer_value(&wallet.id, RECIPIENT, &amount("1"), "alice"),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(h.orchestrator.in_flight(), 1);

        wait_until_idle(&h.orchestrator).await;

        let entries = h.ledger.list_for_user("alice", 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_completed());
        assert_eq!(entries[0].chain_tx_digest.as_deref(), Some("0xlate"));
    }

    #[tokio::test]
    async fn dropped_caller_still_records_failure() {
        let h = harness(&["alice"]);
        let wallet = h.store.generate_address("alice", None).unwrap();
        h.gateway.set_submit_delay(Duration::from_millis(200));
        h.gateway
            .script_failure(ChainError::RpcError("connection reset".to_string()));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            h.orchestrator
                .transfer_value(&wallet.id, RECIPIENT, &amount("1"), "alice"),
        )
        .await;
        assert!(abandoned.is_err());

        wait_until_idle(&h.orchestrator).await;

        let entries = h.ledger.list_for_user("alice", 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_failed());
        assert!(entries[0]
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("connection reset"));
    }

    #[tokio::test]
    async fn drain_returns_immediately_when_idle() {
        let h = harness(&["alice"]);
        assert_eq!(h.orchestrator.in_flight(), 0);
        wait_until_idle(&h.orchestrator).await;
    }
}
