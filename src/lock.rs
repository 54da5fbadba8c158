// src/lock.rs

//! Exclusive lock on a recipe for the duration of an update
//!
//! Two updates editing the same recipe would interleave their passes and
//! corrupt each other's backups. Each run holds `flock(LOCK_EX)` on
//! `<recipe>.lock` from the moment the recipe path is known until it exits.
//! The lock file itself is left in place: unlinking it would let a run that
//! already opened the old inode lock it while another run locks a new one.
//!
//! # Example
//!
//! ```ignore
//! use recipe_bump::lock::RecipeLock;
//!
//! let _lock = RecipeLock::try_acquire_for("pkgs/hello/default.nix")?;
//! // ... edit the recipe ...
//! // Lock released on drop; the lock file stays
//! ```

use crate::error::{Error, Result};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Exclusive advisory lock tied to one recipe file
pub struct RecipeLock {
    /// The lock file handle (kept open to maintain lock)
    #[allow(dead_code)]
    file: File,
    /// Path to the lock file
    path: PathBuf,
}

impl RecipeLock {
    /// Path of the lock file guarding a recipe (`hello.nix` -> `hello.nix.lock`)
    pub fn lock_path_for(recipe: &Path) -> PathBuf {
        let mut name = recipe.file_name().map(OsString::from).unwrap_or_default();
        name.push(".lock");
        recipe.with_file_name(name)
    }

    /// Lock a recipe, failing immediately if another run holds it
    pub fn try_acquire_for<P: AsRef<Path>>(recipe: P) -> Result<Self> {
        let path = Self::lock_path_for(recipe.as_ref());
        Self::try_acquire(&path)?.ok_or(Error::Locked(path))
    }

    /// Try to acquire an exclusive lock without blocking
    ///
    /// Returns:
    /// - `Ok(Some(lock))` if lock was acquired
    /// - `Ok(None)` if lock is held by another process
    /// - `Err` on I/O errors
    pub fn try_acquire<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                info!("Acquired recipe lock at {}", path.display());
                Ok(Some(Self { file, path }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                debug!("Recipe lock already held at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(Error::IoError(format!(
                "Failed to try-acquire recipe lock {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Check if a lock is currently held (by any process)
    pub fn is_held<P: AsRef<Path>>(path: P) -> bool {
        let path = path.as_ref();

        if !path.exists() {
            return false;
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(_) => return false,
        };

        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                false
            }
            Err(_) => true,
        }
    }

    /// Get the path to the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RecipeLock {
    fn drop(&mut self) {
        // Lock is automatically released when file is closed
        debug!("Released recipe lock at {}", self.path.display());
    }
}
