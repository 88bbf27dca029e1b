//! Directory-backed artifact registry
//!
//! Layout: `<root>/<model_name>/<version>/...` where `<version>` is a positive
//! integer. Downloading copies the version tree into the destination.

use super::{ArtifactRegistry, ModelVersion};
use crate::error::{ForecastError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LocalRegistry {
    root: PathBuf,
}

impl LocalRegistry {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ForecastError::Config(format!(
                "Artifact registry root '{}' does not exist",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn model_dir(&self, model_name: &str) -> Result<PathBuf> {
        // model names become a single path component
        if model_name.is_empty()
            || model_name.contains(['/', '\\'])
            || model_name == "."
            || model_name == ".."
        {
            return Err(ForecastError::ArtifactNotFound {
                model: model_name.to_string(),
                reason: "invalid model name".to_string(),
            });
        }
        Ok(self.root.join(model_name))
    }
}

impl ArtifactRegistry for LocalRegistry {
    fn list_versions(&self, model_name: &str) -> Result<Vec<ModelVersion>> {
        let dir = self.model_dir(model_name)?;
        if !dir.is_dir() {
            return Err(ForecastError::ArtifactNotFound {
                model: model_name.to_string(),
                reason: "model is not registered".to_string(),
            });
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Ok(number) = entry.file_name().to_string_lossy().parse::<u32>() {
                versions.push(ModelVersion::new(number));
            }
        }
        versions.sort_by(|a, b| b.cmp(a));
        Ok(versions)
    }

    fn download(&self, model_name: &str, version: &ModelVersion, destination: &Path) -> Result<()> {
        let source = self.model_dir(model_name)?.join(version.to_string());
        if !source.is_dir() {
            return Err(ForecastError::ArtifactNotFound {
                model: model_name.to_string(),
                reason: format!("version {} does not exist", version),
            });
        }

        let mut files = 0usize;
        for entry in WalkDir::new(&source) {
            let entry = entry.map_err(std::io::Error::from)?;
            let relative = entry
                .path()
                .strip_prefix(&source)
                .map_err(|e| ForecastError::Store(e.to_string()))?;
            let target = destination.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), &target)?;
                files += 1;
            }
        }
        debug!(model = model_name, %version, files, "downloaded artifact");
        Ok(())
    }
}
