// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Custody - Custodial Avalanche Wallet Core
//!
//! Generates and holds secp256k1 keys on behalf of users, encrypts them at
//! rest, and relays native transfers to Avalanche C-Chain behind an
//! append-only ledger.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token authentication (HS256 JWT)
//! - `blockchain` - Avalanche C-Chain integration and the chain gateway seam
//! - `encryption` - Authenticated encryption of private keys at rest
//! - `storage` - redb-backed repositories
//! - `wallet` - Address store, ledger and transfer orchestration

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod encryption;
pub mod error;
pub mod logging;
pub mod state;
pub mod storage;
pub mod tls;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_support;
