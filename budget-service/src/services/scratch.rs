//! Per-request scratch directory.
//!
//! The directory is removed when the guard is dropped, on every exit path of
//! the handler including early returns and unwinding.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SCRATCH_PREFIX: &str = "budget-files-";

pub struct ScratchDir {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl ScratchDir {
    /// Create a uniquely named directory under `root`.
    pub fn create(root: &Path) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)?;
        let path = dir.path().to_path_buf();

        tracing::debug!(path = %path.display(), "Created scratch directory");

        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match dir.close() {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed scratch directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Error cleaning up temporary directory"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_removes_directory_and_contents() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path()).unwrap();
        let path = scratch.path().to_path_buf();

        std::fs::create_dir(path.join("nested")).unwrap();
        std::fs::write(path.join("nested").join("budget.pdf"), b"%PDF-1.4").unwrap();
        assert!(path.exists());

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn names_are_unique_and_prefixed() {
        let root = tempfile::tempdir().unwrap();
        let a = ScratchDir::create(root.path()).unwrap();
        let b = ScratchDir::create(root.path()).unwrap();

        assert_ne!(a.path(), b.path());
        let name = a.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(SCRATCH_PREFIX));
    }

    #[test]
    fn drop_tolerates_directory_removed_elsewhere() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path()).unwrap();
        std::fs::remove_dir_all(scratch.path()).unwrap();

        drop(scratch);
    }

    #[cfg(unix)]
    #[test]
    fn drop_survives_failed_removal() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path()).unwrap();
        let path = scratch.path().to_path_buf();

        // A regular file where the directory was makes removal fail with
        // something other than NotFound.
        std::fs::remove_dir_all(&path).unwrap();
        std::fs::write(&path, b"not a directory").unwrap();

        drop(scratch);
        assert!(path.is_file());
    }

    #[test]
    fn missing_root_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");
        assert!(ScratchDir::create(&missing).is_err());
    }
}
