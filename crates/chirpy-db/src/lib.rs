pub mod error;
pub mod models;
pub mod queries;

pub use error::{Result, StoreError};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use crate::models::Document;

/// JSON-file-backed record store. Every operation reloads the file, mutates
/// in memory, and rewrites it whole; the lock makes that sequence a single
/// critical section, with mutating accessors holding the write guard across
/// load, mutate, and save.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    lock: RwLock<()>,
}

impl Database {
    /// Opens the store, creating the backing file if missing. `reset`
    /// discards any existing contents first.
    pub fn open(path: &Path, reset: bool) -> Result<Self> {
        let db = Self {
            path: path.to_path_buf(),
            lock: RwLock::new(()),
        };

        {
            let _guard = db.write_guard();
            if reset || !db.path.exists() {
                db.save(&Document::default())?;
            } else {
                // Parse up front so a corrupt file fails at open.
                db.load()?;
            }
        }

        info!("Database opened at {}", db.path.display());
        Ok(db)
    }

    // The guards protect no in-memory state; the file is the source of
    // truth. A poisoned lock is recovered rather than propagated.
    pub(crate) fn read_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_guard(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads and parses the whole file. An empty file is a valid empty
    /// document. Callers must already hold a guard.
    pub(crate) fn load(&self) -> Result<Document> {
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Document::default());
        }

        let mut doc: Document = serde_json::from_str(&content)?;
        doc.sync_counters();
        Ok(doc)
    }

    /// Serializes and rewrites the whole file. Callers must already hold
    /// the write guard.
    pub(crate) fn save(&self, doc: &Document) -> Result<()> {
        let content = serde_json::to_string_pretty(doc)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
