//! Resumable crawl state: one JSON file holding the cursor and the merged
//! record set. Loads survive missing or corrupt files by defaulting; saves
//! go through a temp-file rename so a crash mid-write never corrupts the
//! store.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::types::MatchRecord;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CrawlState {
    cursor: u32,
    records: BTreeMap<u32, MatchRecord>,
}

pub struct CheckpointStore {
    path: PathBuf,
    /// Cursor reported when no usable state file exists: `start_id - 1`,
    /// so the first attempted identifier is `start_id`.
    default_cursor: u32,
    state: CrawlState,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>, start_id: u32) -> Self {
        Self {
            path: path.into(),
            default_cursor: start_id.saturating_sub(1),
            state: CrawlState::default(),
        }
    }

    /// Read the persisted state. Missing and corrupt files both yield the
    /// safe default; corruption is logged, never fatal.
    pub fn load(&mut self) -> (u32, BTreeMap<u32, MatchRecord>) {
        self.state = match fs::read_to_string(&self.path) {
            Ok(json) => match serde_json::from_str::<CrawlState>(&json) {
                Ok(state) => {
                    info!(
                        "Loaded checkpoint: cursor {} with {} records",
                        state.cursor,
                        state.records.len()
                    );
                    state
                }
                Err(e) => {
                    error!(
                        "Checkpoint {:?} is corrupt ({}), starting from cursor {}",
                        self.path, e, self.default_cursor
                    );
                    CrawlState {
                        cursor: self.default_cursor,
                        records: BTreeMap::new(),
                    }
                }
            },
            Err(_) => {
                info!(
                    "No checkpoint at {:?}, starting from cursor {}",
                    self.path, self.default_cursor
                );
                CrawlState {
                    cursor: self.default_cursor,
                    records: BTreeMap::new(),
                }
            }
        };
        (self.state.cursor, self.state.records.clone())
    }

    /// Merge `records` into the stored set by identifier (last write wins)
    /// and persist atomically. The persisted cursor is clamped so it is
    /// never below an identifier present in the set.
    pub fn save(&mut self, cursor: u32, records: &BTreeMap<u32, MatchRecord>) -> Result<()> {
        for (id, record) in records {
            self.state.records.insert(*id, record.clone());
        }

        let max_id = self.state.records.keys().next_back().copied().unwrap_or(0);
        if cursor < max_id {
            warn!(
                "Cursor {} below highest stored id {}, clamping",
                cursor, max_id
            );
        }
        self.state.cursor = cursor.max(max_id);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state dir {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(&self.state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move {:?} into place", tmp))?;

        info!(
            "Checkpoint saved: cursor {}, {} records",
            self.state.cursor,
            self.state.records.len()
        );
        Ok(())
    }
}
