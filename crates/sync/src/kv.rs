// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Bundled [`KeyValueStore`] implementations.
//!
//! Host apps usually bring their own store (the platform KV API); these two
//! cover tests and simple desktop deployments.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Mutex;

use crate::error::Error;
use crate::traits::{KeyValueStore, StorageError};

/// In-process store backed by a map. Contents die with the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            Ok(entries.get(&key).cloned())
        })
    }

    fn set(
        &self,
        key: &str,
        value: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.insert(key, value);
            Ok(())
        })
    }
}

/// File-per-key store under a root directory.
///
/// `set` writes a sibling temp file and renames it over the target, so a
/// crash mid-write never exposes a partial document.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError(e.to_string()))?;
        Ok(FileStore { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are engine-chosen identifiers, not user input; dots and
        // dashes are the only separators in practice.
        self.root.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + '_>> {
        let path = self.path_for(key);
        Box::pin(async move {
            match fs::read_to_string(&path) {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StorageError(e.to_string())),
            }
        })
    }

    fn set(
        &self,
        key: &str,
        value: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>> {
        let path = self.path_for(key);
        let tmp = self.root.join(format!("{key}.tmp"));
        Box::pin(async move {
            fs::write(&tmp, value.as_bytes()).map_err(|e| StorageError(e.to_string()))?;
            fs::rename(&tmp, &path).map_err(|e| StorageError(e.to_string()))?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
