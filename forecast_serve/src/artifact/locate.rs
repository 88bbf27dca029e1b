//! Strategies locating the loadable model root inside a downloaded bundle
//!
//! Bundles do not always put the model where expected. Each strategy either
//! finds a directory containing the descriptor file or reports nothing; the
//! resolver tries them in order and the first hit wins.

use crate::error::Result;
use crate::models::DESCRIPTOR_FILE;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory name a bundle conventionally stores the model under
pub fn conventional_dir(series_id: &str) -> String {
    format!("model_{}", series_id)
}

fn has_descriptor(dir: &Path) -> bool {
    dir.join(DESCRIPTOR_FILE).is_file()
}

/// One way of finding the model root
pub trait LocateStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// The model root, or `None` when this strategy does not apply
    fn locate(&self, workspace: &Path, series_id: &str) -> Result<Option<PathBuf>>;
}

/// `<workspace>/model_<series_id>/`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionalDir;

impl LocateStrategy for ConventionalDir {
    fn name(&self) -> &'static str {
        "conventional_dir"
    }

    fn locate(&self, workspace: &Path, series_id: &str) -> Result<Option<PathBuf>> {
        let candidate = workspace.join(conventional_dir(series_id));
        Ok(has_descriptor(&candidate).then_some(candidate))
    }
}

/// Bundles written on a host with `\` separators can arrive as flat files named
/// like `model_x\predictor.json`. Such entries at the workspace root are moved
/// into the nested layout their names describe, then the conventional directory
/// is checked again. Entries that cannot be moved are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedSeparators;

impl NormalizedSeparators {
    fn materialize(workspace: &Path) -> Result<usize> {
        let mut moved = 0;
        for entry in fs::read_dir(workspace)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.contains('\\') || !entry.file_type()?.is_file() {
                continue;
            }

            let parts: Vec<&str> = name
                .split('\\')
                .filter(|part| !part.is_empty() && *part != "." && *part != "..")
                .collect();
            if parts.is_empty() {
                continue;
            }

            let target = parts
                .iter()
                .fold(workspace.to_path_buf(), |path, part| path.join(part));
            match Self::move_entry(&entry.path(), &target) {
                Ok(()) => moved += 1,
                Err(err) => warn!(
                    entry = %name,
                    target = %target.display(),
                    error = %err,
                    "skipping flat artifact entry"
                ),
            }
        }
        Ok(moved)
    }

    fn move_entry(from: &Path, to: &Path) -> std::io::Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)
    }
}

impl LocateStrategy for NormalizedSeparators {
    fn name(&self) -> &'static str {
        "normalized_separators"
    }

    fn locate(&self, workspace: &Path, series_id: &str) -> Result<Option<PathBuf>> {
        let moved = Self::materialize(workspace)?;
        if moved == 0 {
            return Ok(None);
        }
        debug!(moved, "normalized flat artifact entries");

        let expected = conventional_dir(series_id);
        for entry in WalkDir::new(workspace).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_dir()
                && entry.file_name().to_string_lossy() == expected
                && has_descriptor(entry.path())
            {
                return Ok(Some(entry.into_path()));
            }
        }
        Ok(None)
    }
}

/// Shallowest directory anywhere under the workspace holding the descriptor
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveScan;

impl LocateStrategy for RecursiveScan {
    fn name(&self) -> &'static str {
        "recursive_scan"
    }

    fn locate(&self, workspace: &Path, _series_id: &str) -> Result<Option<PathBuf>> {
        let mut best: Option<(usize, PathBuf)> = None;
        for entry in WalkDir::new(workspace).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() || entry.file_name() != DESCRIPTOR_FILE {
                continue;
            }
            let depth = entry.depth();
            if best.as_ref().map_or(true, |(best_depth, _)| depth < *best_depth) {
                if let Some(parent) = entry.path().parent() {
                    best = Some((depth, parent.to_path_buf()));
                }
            }
        }
        Ok(best.map(|(_, dir)| dir))
    }
}

/// The default strategy chain
pub fn default_strategies() -> Vec<Box<dyn LocateStrategy>> {
    vec![
        Box::new(ConventionalDir),
        Box::new(NormalizedSeparators),
        Box::new(RecursiveScan),
    ]
}
