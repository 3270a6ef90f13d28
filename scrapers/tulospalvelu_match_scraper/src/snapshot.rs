use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes raw markup of suspicious pages to disk, namespaced by identifier
/// and attempt, so a failed extraction can be inspected offline.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn save(&self, match_id: u32, attempt: u32, label: &str, markup: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create snapshot dir {:?}", self.dir))?;
        let path = self
            .dir
            .join(format!("{}_attempt{}_{}.html", match_id, attempt, label));
        fs::write(&path, markup)
            .with_context(|| format!("Failed to write snapshot {:?}", path))?;
        debug!("Wrote {} byte snapshot to {:?}", markup.len(), path);
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
