// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-address transfer serialization.
//!
//! Two transfers from the same wallet address must not interleave between key
//! decryption and ledger finalization. [`AddressLocks`] hands out one async
//! mutex per address id. Each slot counts its holder and waiters, and is
//! removed when the last of them leaves, including waiters whose future was
//! dropped before the lock was granted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct AddressLocks {
    slots: Arc<Mutex<HashMap<String, LockSlot>>>,
}

#[derive(Debug)]
struct LockSlot {
    lock: Arc<AsyncMutex<()>>,
    users: usize,
}

/// One holder or waiter of a slot.
struct Registration {
    locks: AddressLocks,
    key: String,
}

/// Held for the duration of one transfer.
pub struct AddressLockGuard {
    // Field order: the mutex is released before the slot is unregistered.
    _guard: OwnedMutexGuard<()>,
    _registration: Registration,
}

impl AddressLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other transfer holds `key`, then hold it.
    pub async fn acquire(&self, key: &str) -> AddressLockGuard {
        let (lock, registration) = {
            let mut slots = self.slots();
            let slot = slots.entry(key.to_string()).or_insert_with(|| LockSlot {
                lock: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            slot.users += 1;
            (
                slot.lock.clone(),
                Registration {
                    locks: self.clone(),
                    key: key.to_string(),
                },
            )
        };

        let guard = lock.lock_owned().await;
        AddressLockGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    /// Number of addresses with a live lock entry.
    pub fn active(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, LockSlot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut slots = self.locks.slots();
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                slots.remove(&self.key);
            }
        }
    }
}
