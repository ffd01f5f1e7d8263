//! Exclusive run lock.
//!
//! At most one pipeline run may be live per state root. The lock is a file
//! created with `create_new`, so acquisition is atomic even when a scheduled
//! run and a manual run race. Dropping the guard removes the file; a crashed
//! run leaves it behind and an operator deletes it after checking nothing is
//! still running.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another run holds the lock at {path} ({holder}); remove the file if that run is dead")]
    Held { path: String, holder: String },

    #[error("cannot create lock file {path}: {source}")]
    Io { path: String, source: io::Error },
}

/// RAII guard for the run lock file.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Create the lock file, failing when another holder exists.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if let Err(source) = fs::create_dir_all(parent) {
                return Err(LockError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        }
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
                let _ = writeln!(file, "pid {} since {stamp}", process::id());
                Ok(Self { path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path)
                    .map(|text| text.trim().to_string())
                    .unwrap_or_default();
                let holder = if holder.is_empty() {
                    "unknown holder".to_string()
                } else {
                    holder
                };
                Err(LockError::Held {
                    path: path.display().to_string(),
                    holder,
                })
            }
            Err(source) => Err(LockError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
