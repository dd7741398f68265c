//! Single-instance lock.
//!
//! One daemon per config directory. The lock lives in `$XDG_RUNTIME_DIR`
//! (or `/tmp`) and holds the owner's PID on its first line so CLI commands
//! can find the daemon to signal.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use fs2::FileExt;

use crate::common::utils::{is_process_running, private_path};

/// Lock path for a config directory (`None` = default).
pub fn lock_path(config_dir: Option<&Path>) -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join(format!(
        "tiltr-{}.lock",
        crate::state::namespace(config_dir)
    ))
}

/// A held lock. Released and removed on drop.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

fn open(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", private_path(path)))
}

fn claim(mut file: File, path: &Path) -> Result<LockFile> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;
    Ok(LockFile {
        file,
        path: path.to_path_buf(),
    })
}

/// Take the lock at `path`, clearing it first if its owner is gone.
pub fn acquire_lock(path: &Path) -> Result<LockFile> {
    let file = open(path)?;
    if file.try_lock_exclusive().is_ok() {
        return claim(file, path);
    }

    match read_lock_pid(path) {
        Some(pid) if is_process_running(pid) => {
            bail!("tiltr is already running (PID: {pid})");
        }
        _ => {
            log_warning!("Removing stale lock file {}", private_path(path));
            let _ = std::fs::remove_file(path);
        }
    }

    let file = open(path)?;
    file.try_lock_exclusive()
        .with_context(|| format!("Failed to lock {} after cleanup", private_path(path)))?;
    claim(file, path)
}

fn read_lock_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}

/// PID of the live daemon holding `path`, if any.
pub fn read_running_pid(path: &Path) -> Option<u32> {
    read_lock_pid(path).filter(|&pid| is_process_running(pid))
}
