//! File system utils.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use fs2::FileExt;

use crate::error::DeployError;

pub struct FsHandler;

impl FsHandler {
    /// Create the parent directory of `path` if it doesn't exist.
    pub fn create_parent_directory(path: &Path) -> Result<(), DeployError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DeployError::io(parent, e))?;
            tracing::trace!("Ensured directory exists: {}", parent.display());
        }
        Ok(())
    }

    /// Replace the content of `path` in full.
    ///
    /// The content is written to a sibling temporary file which is then renamed over
    /// the target, so readers never observe a half-written file.
    pub fn write_atomically(path: &Path, content: &[u8]) -> Result<(), DeployError> {
        Self::create_parent_directory(path)?;

        let tmp_path = Self::sibling(path, "tmp");
        let mut tmp = File::create(&tmp_path).map_err(|e| DeployError::io(&tmp_path, e))?;
        tmp.write_all(content)
            .and_then(|_| tmp.sync_all())
            .map_err(|e| DeployError::io(&tmp_path, e))?;
        drop(tmp);

        std::fs::rename(&tmp_path, path).map_err(|e| DeployError::io(path, e))?;
        Ok(())
    }

    /// Take an exclusive advisory lock guarding `path`.
    ///
    /// The lock lives on a `<path>.lock` sibling so that the guarded file itself can be
    /// replaced by rename while the lock is held. Released when the guard is dropped.
    pub fn lock_exclusive(path: &Path) -> Result<FileLock, DeployError> {
        Self::create_parent_directory(path)?;

        let lock_path = Self::sibling(path, "lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| DeployError::io(&lock_path, e))?;

        file.lock_exclusive()
            .map_err(|e| DeployError::io(&lock_path, e))?;

        tracing::trace!(lock = %lock_path.display(), "Acquired exclusive lock");
        Ok(FileLock {
            file,
            path: lock_path,
        })
    }

    fn sibling(path: &Path, extension: &str) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(extension);
        path.with_file_name(name)
    }
}

/// Guard for an exclusive lock taken with [`FsHandler::lock_exclusive`].
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(err = %e, lock = %self.path.display(), "Failed to release lock");
        }
    }
}
