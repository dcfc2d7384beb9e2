//! In-process token cache with a durable mirror.
//!
//! The store holds at most one [`TokenRecord`] behind an async mutex. Every
//! read-then-maybe-write sequence happens through a [`TokenStoreGuard`]
//! obtained from [`TokenStore::acquire`]; the lock is released when the guard
//! is dropped, on every exit path.
//!
//! Disk failures never escape this module. A record that cannot be read is a
//! cache miss, and a record that cannot be written still lives in memory for
//! the rest of the process.

use crate::cache::TokenFile;
use crate::token::TokenRecord;
use std::path::Path;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

pub struct TokenStore {
    current: Mutex<Option<TokenRecord>>,
    file: TokenFile,
}

impl TokenStore {
    pub fn new(file: TokenFile) -> Self {
        Self {
            current: Mutex::new(None),
            file,
        }
    }

    /// Block until the store is free and take exclusive access to it.
    pub async fn acquire(&self) -> TokenStoreGuard<'_> {
        trace!("Acquiring token store lock");
        TokenStoreGuard {
            current: self.current.lock().await,
            file: &self.file,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Deserialize the persisted record, treating any failure as a miss.
    pub fn load_from_disk(&self) -> Option<TokenRecord> {
        load(&self.file)
    }

    /// Overwrite the persisted record. Failures are logged and swallowed.
    pub fn save_to_disk(&self, record: &TokenRecord) {
        save(&self.file, record)
    }
}

/// Exclusive access to a [`TokenStore`].
pub struct TokenStoreGuard<'a> {
    current: MutexGuard<'a, Option<TokenRecord>>,
    file: &'a TokenFile,
}

impl TokenStoreGuard<'_> {
    /// The in-memory record, if any. No I/O.
    pub fn get_current(&self) -> Option<TokenRecord> {
        self.current.clone()
    }

    /// Replace the in-memory record, then persist it best-effort.
    pub fn set_current(&mut self, record: TokenRecord) {
        let record = self.current.insert(record);
        save(self.file, record);
    }

    pub fn load_from_disk(&self) -> Option<TokenRecord> {
        load(self.file)
    }

    /// Forget the in-memory record and delete the persisted one.
    pub fn clear(&mut self) {
        *self.current = None;
        match self.file.remove() {
            Ok(true) => debug!("Removed token cache file {:?}", self.file.path()),
            Ok(false) => trace!("No token cache file at {:?}", self.file.path()),
            Err(e) => warn!(
                "Failed to remove token cache file {:?}: {}",
                self.file.path(),
                e
            ),
        }
    }

    pub fn release(self) {
        trace!("Releasing token store lock");
    }
}

fn load(file: &TokenFile) -> Option<TokenRecord> {
    match file.read() {
        Ok(Some(record)) => Some(record),
        Ok(None) => {
            debug!("There is no token cache file at {:?}", file.path());
            None
        }
        Err(e) => {
            warn!(
                "Ignoring unreadable token cache file {:?}: {}",
                file.path(),
                e
            );
            None
        }
    }
}

fn save(file: &TokenFile, record: &TokenRecord) {
    if let Err(e) = file.write(record) {
        warn!(
            "Failed to persist token to {:?}, continuing with in-memory cache only: {}",
            file.path(),
            e
        );
    }
}
