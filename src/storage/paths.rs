// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-disk layout of the data directory.

use std::path::{Path, PathBuf};

/// Default data directory when `DATA_DIR` is not set.
pub const DATA_ROOT: &str = "./data";

/// File name of the embedded database inside the data directory.
pub const DATABASE_FILE: &str = "custody.redb";

/// Path utilities for the data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the redb database file.
    pub fn database(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_lives_under_root() {
        let paths = StoragePaths::new("/tmp/custody");
        assert_eq!(paths.root(), Path::new("/tmp/custody"));
        assert_eq!(paths.database(), PathBuf::from("/tmp/custody/custody.redb"));
    }

    #[test]
    fn default_root_is_relative_data_dir() {
        assert_eq!(StoragePaths::default().root(), Path::new(DATA_ROOT));
    }
}
