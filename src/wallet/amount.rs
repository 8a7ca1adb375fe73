// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Human-scale transfer amounts.
//!
//! Clients send amounts in whole AVAX (`"0.5"`, or a JSON number). They are
//! converted to wei with integer arithmetic; a JSON number is re-read from its
//! shortest decimal spelling so no binary floating point value ever reaches
//! the ledger.

use std::str::FromStr;

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::error::{WalletError, WalletResult};
use crate::blockchain::{format_amount, parse_amount, NATIVE_DECIMALS};

/// Smallest transfer accepted, in human units (1 gwei).
pub const MIN_TRANSFER_AMOUNT: &str = "0.000000001";

/// Validated transfer amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAmount {
    base_units: U256,
}

impl TransferAmount {
    /// Parse a human-scale decimal string and enforce the minimum.
    pub fn parse(input: &str) -> WalletResult<Self> {
        let normalized = normalize(input)?;
        let base_units = parse_amount(&normalized, NATIVE_DECIMALS)
            .map_err(|e| WalletError::InvalidAmount(e.to_string()))?;

        Self::from_base_units(base_units)
    }

    /// Wrap an amount already expressed in base units.
    pub fn from_base_units(base_units: U256) -> WalletResult<Self> {
        if base_units < minimum_base_units() {
            return Err(WalletError::AmountBelowMinimum {
                minimum: MIN_TRANSFER_AMOUNT,
            });
        }
        Ok(Self { base_units })
    }

    pub fn base_units(&self) -> U256 {
        self.base_units
    }

    /// Human-scale rendering, e.g. `"0.5"`.
    pub fn human(&self) -> String {
        format_amount(self.base_units, NATIVE_DECIMALS)
    }
}

fn minimum_base_units() -> U256 {
    // 10^(18 - 9): one nano-unit of the native asset
    U256::from(10u64).pow(U256::from(NATIVE_DECIMALS as u64 - 9))
}

/// Accept plain decimals as-is and rewrite scientific notation exactly.
fn normalize(input: &str) -> WalletResult<String> {
    let trimmed = input.trim();
    if trimmed.contains(['e', 'E']) {
        let value = Decimal::from_scientific(&trimmed.to_ascii_lowercase())
            .map_err(|_| WalletError::InvalidAmount("not a decimal number".to_string()))?;
        return Ok(value.normalize().to_string());
    }
    if trimmed.is_empty() {
        return Err(WalletError::InvalidAmount("amount is empty".to_string()));
    }
    Decimal::from_str(trimmed)
        .map_err(|_| WalletError::InvalidAmount("not a decimal number".to_string()))?;
    Ok(trimmed.to_string())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(serde_json::Number),
}

impl<'de> Deserialize<'de> for TransferAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match RawAmount::deserialize(deserializer)? {
            RawAmount::Text(text) => text,
            RawAmount::Number(number) => number.to_string(),
        };
        TransferAmount::parse(&raw).map_err(|e| serde::de::Error::custom(e.safe_message()))
    }
}

impl Serialize for TransferAmount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.human())
    }
}
