// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record store abstraction.
//!
//! Records are opaque text blobs keyed by filename. The capture side only
//! writes; the replay side lists, reads and optionally removes.
//!
//! # Implementations
//!
//! - `DirectoryStore` -- one file per record in a directory
//! - `MemoryStore` -- in-process, for tests and dry runs

use crate::format::is_record_file;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

/// Key-value blob store for record files.
pub trait RecordStore {
    /// Write (or overwrite) a record.
    fn put(&self, name: &str, contents: &str) -> io::Result<()>;

    /// Read a record.
    fn get(&self, name: &str) -> io::Result<String>;

    /// List record names, oldest first.
    fn list(&self) -> io::Result<Vec<String>>;

    /// Delete a record.
    fn remove(&self, name: &str) -> io::Result<()>;
}

/// Directory-backed record store.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open a store rooted at an existing directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Open a store, creating the directory if needed.
    pub fn create<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self::new(root))
    }

    /// Store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a record.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

// Some file systems do not record a birth time.
fn creation_time(meta: &fs::Metadata) -> SystemTime {
    meta.created()
        .or_else(|_| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

impl RecordStore for DirectoryStore {
    fn put(&self, name: &str, contents: &str) -> io::Result<()> {
        fs::write(self.path_of(name), contents)
    }

    fn get(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.path_of(name))
    }

    fn list(&self) -> io::Result<Vec<String>> {
        let mut entries = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!("Skipping non UTF-8 entry {:?}", entry.file_name());
                continue;
            };

            if is_record_file(&name) {
                entries.push((creation_time(&meta), name));
            }
        }

        // read_dir order is unspecified; name order breaks creation-time ties.
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        entries.sort_by_key(|(created, _)| *created);

        Ok(entries.into_iter().map(|(_, name)| name).collect())
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.path_of(name))
    }
}

/// In-memory record store. Lists in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, String)>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn not_found(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no record named {}", name))
}

impl RecordStore for MemoryStore {
    fn put(&self, name: &str, contents: &str) -> io::Result<()> {
        let mut entries = self.lock();
        match entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = contents.to_string(),
            None => entries.push((name.to_string(), contents.to_string())),
        }
        Ok(())
    }

    fn get(&self, name: &str) -> io::Result<String> {
        self.lock()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| not_found(name))
    }

    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self
            .lock()
            .iter()
            .filter(|(n, _)| is_record_file(n))
            .map(|(n, _)| n.clone())
            .collect())
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(n, _)| n != name);
        if entries.len() == before {
            return Err(not_found(name));
        }
        Ok(())
    }
}
