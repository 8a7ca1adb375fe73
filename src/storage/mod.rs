// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single redb database under `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   custody.redb   # users, wallet addresses, encrypted keys, ledger
//! ```
//!
//! ## Important Notes
//!
//! - Private keys are stored only as ciphertext produced by
//!   [`crate::encryption::KeyCipher`], in a table separate from the address rows
//! - Address and digest uniqueness are enforced by index tables inside the
//!   inserting write transaction
//! - Repositories borrow the database; services hold it in an `Arc`

pub mod database;
pub mod paths;
pub mod repository;

pub use database::{CustodyDatabase, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use repository::{
    InvalidTransition, LedgerEntry, TransactionRepository, TransactionStatus, TransactionType,
    UserRecord, UserRepository, WalletAddress, WalletAddressRepository,
};
