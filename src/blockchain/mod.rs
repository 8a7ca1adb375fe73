// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration module for Avalanche C-Chain.
//!
//! This module provides functionality for:
//! - Generating custodial secp256k1 keys and rebuilding signers from PEM
//! - Querying native balances and chain connectivity
//! - Signing and broadcasting native transfers
//! - The [`ChainGateway`] seam the wallet core depends on

pub mod client;
pub mod gateway;
pub mod signing;
pub mod transactions;
pub mod types;

pub use client::{is_valid_address, AvaxClient, ChainError};
pub use gateway::{AvaxGateway, ChainGateway};
pub use transactions::{format_amount, parse_amount};
pub use types::*;
