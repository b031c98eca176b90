//! The transient file the surface writes its result into.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// File name of the handoff inside its session directory.
pub const HANDOFF_FILE_NAME: &str = "feedback.json";

/// A uniquely named handoff location owned by one session.
///
/// Each handoff lives in its own temporary directory, so the path is unique
/// per invocation and the file is absent until the surface writes it.
/// Dropping the handoff removes the file and its directory.
#[derive(Debug)]
pub struct HandoffFile {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl HandoffFile {
    /// Allocate a fresh handoff location under the system temp directory.
    pub fn allocate() -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("interactive-feedback-")
            .tempdir()?;
        Ok(Self::in_dir(dir))
    }

    /// Allocate a fresh handoff location under `parent`.
    pub fn allocate_in(parent: impl AsRef<Path>) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("interactive-feedback-")
            .tempdir_in(parent)?;
        Ok(Self::in_dir(dir))
    }

    fn in_dir(dir: TempDir) -> Self {
        let path = dir.path().join(HANDOFF_FILE_NAME);
        Self {
            dir: Some(dir),
            path,
        }
    }

    /// Path handed to the surface.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the handoff content, or `None` if the surface never wrote it.
    pub fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete the handoff file (if present) and its directory.
    pub fn finalize(mut self) -> io::Result<()> {
        let dir = self.dir.take();
        remove_if_present(&self.path)?;
        match dir {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

impl Drop for HandoffFile {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let _ = remove_if_present(&self.path);
            drop(dir);
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
