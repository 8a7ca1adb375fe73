// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Closed error set of the wallet core.
//!
//! Every variant maps to one [`ErrorKind`] and to a client-safe message.
//! The `Display` text may carry operator detail (storage or RPC messages) and
//! is only meant for logs.

use crate::blockchain::ChainError;
use crate::encryption::CipherError;
use crate::storage::{InvalidTransition, StorageError};

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("user {0} not found")]
    OwnerNotFound(String),

    #[error("wallet address not found")]
    AddressNotFound,

    #[error("ledger entry {0} not found")]
    LedgerEntryNotFound(String),

    #[error("derived address {0} already exists")]
    AddressCollision(String),

    #[error("chain digest {0} already recorded")]
    DuplicateDigest(String),

    #[error("sender and recipient are the same address")]
    SelfTransferRejected,

    #[error(transparent)]
    InvalidStatusTransition(#[from] InvalidTransition),

    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount is below the minimum of {minimum}")]
    AmountBelowMinimum { minimum: &'static str },

    #[error("invalid nickname: {0}")]
    InvalidNickname(String),

    #[error("ciphertext is malformed")]
    MalformedCiphertext,

    #[error("signing key could not be recovered")]
    KeyDecryptionFailed,

    #[error("transfer recorded as {ledger_entry_id} failed: {reason}")]
    TransferFailed {
        ledger_entry_id: String,
        reason: String,
    },

    #[error("transfer task did not complete: {0}")]
    TaskAborted(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("chain error: {0}")]
    Gateway(#[from] ChainError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type WalletResult<T> = Result<T, WalletError>;

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::OwnerNotFound(_)
            | WalletError::AddressNotFound
            | WalletError::LedgerEntryNotFound(_) => ErrorKind::NotFound,

            WalletError::AddressCollision(_)
            | WalletError::DuplicateDigest(_)
            | WalletError::SelfTransferRejected
            | WalletError::InvalidStatusTransition(_) => ErrorKind::Conflict,

            WalletError::InvalidRecipient(_)
            | WalletError::InvalidAmount(_)
            | WalletError::AmountBelowMinimum { .. }
            | WalletError::InvalidNickname(_)
            | WalletError::MalformedCiphertext => ErrorKind::Validation,

            WalletError::KeyDecryptionFailed
            | WalletError::TransferFailed { .. }
            | WalletError::TaskAborted(_)
            | WalletError::Storage(_)
            | WalletError::Gateway(_)
            | WalletError::Configuration(_) => ErrorKind::Internal,
        }
    }

    /// Message suitable for API clients. Never includes key material,
    /// ciphertext, or text from storage and RPC errors.
    pub fn safe_message(&self) -> String {
        match self {
            WalletError::OwnerNotFound(_) => "User not found".to_string(),
            WalletError::AddressNotFound => "Wallet address not found".to_string(),
            WalletError::LedgerEntryNotFound(_) => "Transaction not found".to_string(),
            WalletError::AddressCollision(_) => {
                "Address generation collided, please retry".to_string()
            }
            WalletError::DuplicateDigest(_) => {
                "Transaction digest is already recorded".to_string()
            }
            WalletError::SelfTransferRejected => "Cannot transfer to the same address".to_string(),
            WalletError::InvalidStatusTransition(e) => {
                format!("Transaction cannot move from {} to {}", e.from, e.to)
            }
            WalletError::InvalidRecipient(_) => "Invalid recipient address".to_string(),
            WalletError::InvalidAmount(reason) => format!("Invalid amount: {reason}"),
            WalletError::AmountBelowMinimum { minimum } => {
                format!("Amount must be at least {minimum}")
            }
            WalletError::InvalidNickname(reason) => format!("Invalid nickname: {reason}"),
            WalletError::MalformedCiphertext => "Stored key is malformed".to_string(),
            WalletError::KeyDecryptionFailed => "Failed to access wallet key".to_string(),
            WalletError::TransferFailed {
                ledger_entry_id, ..
            } => format!("Transfer failed (transaction {ledger_entry_id})"),
            WalletError::TaskAborted(_) => {
                "Transfer outcome unknown, check the transaction list".to_string()
            }
            WalletError::Storage(_) => "Internal storage error".to_string(),
            WalletError::Gateway(_) => "Blockchain network error".to_string(),
            WalletError::Configuration(_) => "Service is misconfigured".to_string(),
        }
    }
}

impl From<StorageError> for WalletError {
    fn from(err: StorageError) -> Self {
        WalletError::Storage(err)
    }
}

impl From<CipherError> for WalletError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::MalformedCiphertext => WalletError::MalformedCiphertext,
            CipherError::DecryptionFailed => WalletError::KeyDecryptionFailed,
            CipherError::InvalidConfiguration(msg) => WalletError::Configuration(msg),
            CipherError::EncryptionFailed => {
                WalletError::Configuration("encryption failed".to_string())
            }
        }
    }
}
