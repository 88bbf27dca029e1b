//! Request-scoped scratch directories
//!
//! Every pipeline call gets its own uniquely named directory under a shared
//! root. The directory lives as long as the [`Workspace`] value and is removed
//! when it is dropped, on success, error and unwinding alike.

use crate::error::{ForecastError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

/// Allocates workspaces under one root directory
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Manager rooted at `root`, which is created if missing
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Manager rooted in the system temporary directory
    pub fn in_temp_dir() -> Result<Self> {
        Self::new(std::env::temp_dir().join("forecast-serve"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh workspace for one request on `series_id`
    pub fn open(&self, series_id: &str) -> Result<Workspace> {
        let request_id = Uuid::new_v4();
        let prefix = format!("{}-{}-", sanitize(series_id), request_id.simple());
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&self.root)
            .map_err(|e| {
                ForecastError::IoError(std::io::Error::new(
                    e.kind(),
                    format!("cannot create workspace under '{}': {}", self.root.display(), e),
                ))
            })?;
        debug!(request = %request_id, path = %dir.path().display(), "workspace opened");

        Ok(Workspace {
            request_id,
            dir: Some(dir),
        })
    }
}

fn sanitize(series_id: &str) -> String {
    series_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(48)
        .collect()
}

/// One request's scratch directory, removed on drop
#[derive(Debug)]
pub struct Workspace {
    request_id: Uuid,
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    /// Remove the directory now, reporting failures instead of ignoring them
    pub fn close(mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => {
                let path = dir.path().to_path_buf();
                dir.close()?;
                debug!(request = %self.request_id, path = %path.display(), "workspace removed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(err) = dir.close() {
                warn!(request = %self.request_id, path = %path.display(), error = %err, "failed to remove workspace");
            }
        }
    }
}
