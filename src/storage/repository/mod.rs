// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed repositories over the custody database.

pub mod transactions;
pub mod users;
pub mod wallet_addresses;

pub use transactions::{
    InvalidTransition, LedgerEntry, TransactionRepository, TransactionStatus, TransactionType,
};
pub use users::{UserRecord, UserRepository};
pub use wallet_addresses::{WalletAddress, WalletAddressRepository};
