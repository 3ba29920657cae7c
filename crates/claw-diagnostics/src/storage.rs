//! Persistent storage for the diagnostic log.
//!
//! This module provides:
//! - [`LogStorage`]: Abstract backend holding the whole collection
//! - [`FileStorage`]: Single JSON file, written atomically
//! - [`MemoryStorage`]: In-process backend with failure injection
//! - [`NullStorage`]: Persistence disabled
//!
//! Backends always store the full, ordered collection. The store rewrites it
//! after every change, so a crash leaves either the previous or the new
//! snapshot on disk, never a torn one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{DiagnosticError, Result};
use crate::types::LogEntry;

/// Trait for persistence backends.
pub trait LogStorage: Send + Sync {
    /// Returns a short description of the backend for diagnostics.
    fn describe(&self) -> String;

    /// Loads the persisted collection in insertion order.
    ///
    /// A backend with nothing stored yet returns an empty vector.
    fn load(&self) -> Result<Vec<LogEntry>>;

    /// Replaces the persisted collection.
    fn save(&self, entries: &[LogEntry]) -> Result<()>;

    /// Removes the persisted collection.
    fn clear(&self) -> Result<()>;
}

impl<T: LogStorage + ?Sized> LogStorage for Arc<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn load(&self) -> Result<Vec<LogEntry>> {
        (**self).load()
    }

    fn save(&self, entries: &[LogEntry]) -> Result<()> {
        (**self).save(entries)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// File-backed storage: one JSON array per file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Creates storage at the given path. Parent directories are created on
    /// first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the storage file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temp file next to the target, unique per process and per write.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(
            ".{}.{:08x}.tmp",
            std::process::id(),
            rand::random::<u32>()
        ));
        self.path.with_file_name(name)
    }

    fn write_atomically(&self, tmp_path: &Path, json: &[u8]) -> std::io::Result<()> {
        {
            let mut file = fs::File::create(tmp_path)?;
            file.write_all(json)?;
            file.sync_all()?;
        }
        fs::rename(tmp_path, &self.path)
    }
}

impl LogStorage for FileStorage {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn load(&self) -> Result<Vec<LogEntry>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let value: serde_json::Value = serde_json::from_str(&content)?;
        if !value.is_array() {
            return Err(DiagnosticError::Corrupt(format!(
                "{} does not hold an array of entries",
                self.path.display()
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    fn save(&self, entries: &[LogEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec(entries)?;

        // Atomic write: temp + fsync + rename
        let tmp_path = self.temp_path();
        if let Err(e) = self.write_atomically(&tmp_path, &json) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage, used by tests and short-lived tools.
///
/// Holds the serialized JSON so reloads exercise the same round-trip as
/// [`FileStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Option<String>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage pre-seeded with raw content.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            data: Mutex::new(Some(raw.into())),
            ..Self::default()
        }
    }

    /// Makes subsequent writes (save and clear) fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Makes subsequent loads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }

    /// Returns the raw persisted content.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.data.lock().clone()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(DiagnosticError::StorageUnavailable(
                "quota exceeded".to_string(),
            ));
        }
        Ok(())
    }
}

impl LogStorage for MemoryStorage {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<Vec<LogEntry>> {
        if self.fail_reads.load(Ordering::Acquire) {
            return Err(DiagnosticError::StorageUnavailable(
                "storage disabled".to_string(),
            ));
        }
        match self.data.lock().as_deref() {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, entries: &[LogEntry]) -> Result<()> {
        self.check_writable()?;
        let json = serde_json::to_string(entries)?;
        *self.data.lock() = Some(json);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.check_writable()?;
        *self.data.lock() = None;
        Ok(())
    }
}

/// Storage that persists nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStorage;

impl LogStorage for NullStorage {
    fn describe(&self) -> String {
        "none".to_string()
    }

    fn load(&self) -> Result<Vec<LogEntry>> {
        Ok(Vec::new())
    }

    fn save(&self, _entries: &[LogEntry]) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}
