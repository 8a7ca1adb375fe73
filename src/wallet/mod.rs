// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial wallet core.
//!
//! - [`WalletAddressStore`]: key generation, encrypted persistence, decryption
//! - [`Ledger`]: append-only transaction log with a guarded status machine
//! - [`TransferOrchestrator`]: ledger-first native transfers through a
//!   [`ChainGateway`](crate::blockchain::ChainGateway)
//! - [`summarize_wallets`]: best-effort balances over active addresses

pub mod amount;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod store;
pub mod summary;
pub mod transfer;

pub use amount::{TransferAmount, MIN_TRANSFER_AMOUNT};
pub use error::{ErrorKind, WalletError, WalletResult};
pub use ledger::{Ledger, LedgerOutcome, NewLedgerEntry, DEFAULT_LIST_LIMIT};
pub use locks::{AddressLockGuard, AddressLocks};
pub use store::{WalletAddressStore, MAX_NICKNAME_LEN};
pub use summary::{summarize_wallets, AddressSummary, BALANCE_PLACEHOLDER};
pub use transfer::{TransferOrchestrator, TransferResult, MAX_RECIPIENT_LEN};
