//! The persisted motor angle: the controller's only record of where the slats are.
//!
//! Stored as a single decimal number in a small file that is only ever
//! replaced whole, by rename. Every read-modify-write happens under an
//! exclusive `flock` on a sibling `.lock` file, so a CLI `calibrate` racing
//! the daemon's tick cannot interleave with it.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use fs2::FileExt;

use crate::common::utils::{private_path, write_atomically};

/// Single-record angle store.
pub trait AngleStore: Send {
    fn get(&mut self) -> Result<f64>;
    fn set(&mut self, angle: f64) -> Result<()>;

    /// Store `angle` and return the previous value as one transaction.
    fn replace(&mut self, angle: f64) -> Result<f64> {
        let previous = self.get()?;
        self.set(angle)?;
        Ok(previous)
    }
}

/// File-backed store. A missing file reads as 0°; an empty one is corrupted.
#[derive(Debug, Clone)]
pub struct FileAngleStore {
    path: PathBuf,
}

impl FileAngleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Open (creating if needed) and take the exclusive lock.
    fn acquire(&self) -> Result<File> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", private_path(dir)))?;
        }
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open {}", private_path(&lock_path)))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", private_path(&lock_path)))?;
        Ok(file)
    }

    fn read_locked(&self) -> Result<f64> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0.0),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", private_path(&self.path)));
            }
        };
        parse_angle(&contents)
            .with_context(|| format!("Persisted angle in {} is corrupted", private_path(&self.path)))
    }

    fn write_locked(&self, angle: f64) -> Result<()> {
        if !angle.is_finite() {
            bail!("refusing to persist non-finite angle {angle}");
        }
        write_atomically(&self.path, format!("{angle}\n").as_bytes())
    }

    fn transact<T>(&self, op: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let lock = self.acquire()?;
        let result = op(self);
        let _ = FileExt::unlock(&lock);
        result
    }
}

fn parse_angle(contents: &str) -> Result<f64> {
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        bail!("file is empty");
    }
    let angle: f64 = trimmed.parse()?;
    if !angle.is_finite() {
        bail!("angle '{trimmed}' is not finite");
    }
    Ok(angle)
}

impl AngleStore for FileAngleStore {
    fn get(&mut self) -> Result<f64> {
        self.transact(Self::read_locked)
    }

    fn set(&mut self, angle: f64) -> Result<()> {
        self.transact(|store| store.write_locked(angle))
    }

    fn replace(&mut self, angle: f64) -> Result<f64> {
        self.transact(|store| {
            let previous = store.read_locked()?;
            store.write_locked(angle)?;
            Ok(previous)
        })
    }
}

/// In-memory store; clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct MemoryAngleStore {
    angle: Arc<Mutex<f64>>,
}

impl MemoryAngleStore {
    pub fn new(angle: f64) -> Self {
        Self {
            angle: Arc::new(Mutex::new(angle)),
        }
    }

    pub fn angle(&self) -> f64 {
        *self.angle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AngleStore for MemoryAngleStore {
    fn get(&mut self) -> Result<f64> {
        Ok(self.angle())
    }

    fn set(&mut self, angle: f64) -> Result<()> {
        *self.angle.lock().unwrap_or_else(|e| e.into_inner()) = angle;
        Ok(())
    }

    fn replace(&mut self, angle: f64) -> Result<f64> {
        let mut guard = self.angle.lock().unwrap_or_else(|e| e.into_inner());
        Ok(std::mem::replace(&mut *guard, angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("angle");
        let mut store = FileAngleStore::new(&path);
        assert_eq!(store.get().unwrap(), 0.0);
        assert!(!path.exists());

        store.set(12.0).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "12\n");
    }

    #[test]
    fn test_empty_file_is_corrupted_and_set_recovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("angle");
        std::fs::write(&path, "").unwrap();
        let mut store = FileAngleStore::new(&path);
        assert!(store.get().unwrap_err().to_string().contains("corrupted"));
        assert!(store.replace(0.0).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        store.set(0.0).unwrap();
        assert_eq!(store.get().unwrap(), 0.0);
    }

    #[test]
    fn test_replace_returns_previous() {
        let dir = tempdir().unwrap();
        let mut store = FileAngleStore::new(dir.path().join("angle"));
        assert_eq!(store.replace(45.0).unwrap(), 0.0);
        assert_eq!(store.replace(-12.5).unwrap(), 45.0);
        assert_eq!(store.get().unwrap(), -12.5);
    }

    #[test]
    fn test_value_survives_new_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("angle");
        FileAngleStore::new(&path).set(33.3).unwrap();
        assert_eq!(FileAngleStore::new(&path).get().unwrap(), 33.3);
    }

    #[test]
    fn test_corrupted_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("angle");
        std::fs::write(&path, "forty-five\n").unwrap();
        let mut store = FileAngleStore::new(&path);
        let err = store.get().unwrap_err();
        assert!(err.to_string().contains("corrupted"));

        std::fs::write(&path, "NaN").unwrap();
        assert!(store.get().is_err());
    }

    #[test]
    fn test_concurrent_replacements_do_not_interleave() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("angle");
        FileAngleStore::new(&path).set(0.0).unwrap();

        // Each thread adds 1° by read-modify-write; none may be lost.
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = FileAngleStore::new(&path);
                    for _ in 0..25 {
                        store
                            .transact(|s| {
                                let current = s.read_locked()?;
                                s.write_locked(current + 1.0)
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(FileAngleStore::new(&path).get().unwrap(), 200.0);
    }

    #[test]
    fn test_memory_store_clones_share_value() {
        let store = MemoryAngleStore::new(10.0);
        let mut handle = store.clone();
        assert_eq!(handle.replace(20.0).unwrap(), 10.0);
        assert_eq!(store.angle(), 20.0);
    }
}
