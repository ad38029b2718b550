//! Per-run working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Working directory owned by exactly one run.
///
/// Created fresh under the temp root; an existing directory with the same
/// name is never reused. Removed on drop unless retention is requested.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    retain: bool,
}

impl WorkDir {
    pub fn create(temp_root: impl AsRef<Path>, run_id: &str, retain: bool) -> io::Result<Self> {
        let temp_root = temp_root.as_ref();
        fs::create_dir_all(temp_root)?;

        let path = temp_root.join(run_id);
        // create_dir fails with AlreadyExists instead of adopting a stale directory.
        fs::create_dir(&path)?;

        Ok(Self { path, retain })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.retain {
            tracing::debug!(path = %self.path.display(), "Keeping work directory");
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), "Failed to remove work directory: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn removed_on_drop() {
        let root = tempdir().unwrap();
        let path = {
            let work = WorkDir::create(root.path(), "run-1", false).unwrap();
            fs::write(work.path().join("a.pdf"), b"x").unwrap();
            work.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn retained_when_requested() {
        let root = tempdir().unwrap();
        let path = {
            let work = WorkDir::create(root.path(), "run-2", true).unwrap();
            work.path().to_path_buf()
        };
        assert!(path.is_dir());
    }

    #[test]
    fn never_reuses_existing_directory() {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("run-3")).unwrap();
        let err = WorkDir::create(root.path(), "run-3", false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        // The foreign directory is left alone.
        assert!(root.path().join("run-3").is_dir());
    }
}
