//! The crawl loop: walks a contiguous identifier range, one page at a time,
//! and checkpoints progress as it goes. Every attempted identifier produces
//! exactly one record, failures included, and the cursor advances whether or
//! not the fetch succeeded so a poisoned identifier can never wedge the run.

use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::checkpoint::CheckpointStore;
use crate::classifier::classify;
use crate::config::ScraperConfig;
use crate::extractor;
use crate::fetcher::PageSource;
use crate::types::{ExtractedFields, MatchRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The full batch was attempted.
    Completed { attempted: u32 },
    /// Shutdown was requested between identifiers; progress is saved.
    Interrupted { attempted: u32 },
}

pub struct CrawlOrchestrator<S: PageSource> {
    config: ScraperConfig,
    source: S,
    store: CheckpointStore,
    shutdown: Arc<AtomicBool>,
}

/// Fold one extraction pass into the persisted record shape.
pub fn record_from_fields(match_id: u32, url: String, fields: ExtractedFields) -> MatchRecord {
    let status = classify(&fields);
    MatchRecord {
        match_id,
        status,
        team_home: fields.team_home,
        team_away: fields.team_away,
        score: fields.score,
        half_time_score: fields.half_time_score,
        kickoff_date: fields.kickoff_date,
        kickoff_time: fields.kickoff_time,
        match_datetime_raw: fields.match_datetime_raw,
        venue: fields.venue,
        weather: fields.weather,
        attendance: fields.attendance,
        stats: fields.stats,
        home_events: fields.home_events,
        away_events: fields.away_events,
        man_of_the_match: fields.man_of_the_match,
        match_id_from_page: fields.match_id_from_page,
        fetched_at: Utc::now(),
        url,
        notes: fields.notes,
    }
}

impl<S: PageSource> CrawlOrchestrator<S> {
    pub fn new(
        config: ScraperConfig,
        source: S,
        store: CheckpointStore,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            source,
            store,
            shutdown,
        }
    }

    fn process_one(&self, match_id: u32) -> MatchRecord {
        let url = self.config.match_url(match_id);
        match self.source.fetch(match_id) {
            Ok(markup) => {
                let fields = extractor::extract(&markup, match_id);
                let record = record_from_fields(match_id, url, fields);
                info!(
                    "Match {}: {} ({} vs {})",
                    match_id,
                    record.status,
                    record.team_home.as_deref().unwrap_or("?"),
                    record.team_away.as_deref().unwrap_or("?")
                );
                record
            }
            Err(e) => {
                warn!("Match {}: all fetch attempts failed ({})", match_id, e);
                MatchRecord::load_failed(match_id, url, format!("fetch_failed: {}", e))
            }
        }
    }

    /// Attempt up to `limit` identifiers (defaults to the configured batch
    /// size) starting right after the persisted cursor. Returns after the
    /// batch, never loops forever.
    pub fn run(&mut self, limit: Option<u32>) -> Result<RunOutcome> {
        let batch = limit.unwrap_or(self.config.crawl.batch_size);
        let (start_cursor, _) = self.store.load();

        info!(
            "Starting batch of {} from identifier {}",
            batch,
            start_cursor + 1
        );

        let mut pending: BTreeMap<u32, MatchRecord> = BTreeMap::new();
        let mut cursor = start_cursor;
        let mut attempted = 0u32;

        for offset in 0..batch {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested, stopping after {} identifiers", attempted);
                self.store.save(cursor, &pending)?;
                return Ok(RunOutcome::Interrupted { attempted });
            }

            let match_id = start_cursor + 1 + offset;
            let record = self.process_one(match_id);
            pending.insert(match_id, record);
            cursor = match_id;
            attempted += 1;

            if attempted % self.config.crawl.save_every == 0 {
                self.store.save(cursor, &pending)?;
                pending.clear();
            }

            if offset + 1 < batch && self.config.crawl.request_delay_secs > 0 {
                thread::sleep(Duration::from_secs(self.config.crawl.request_delay_secs));
            }
        }

        self.store.save(cursor, &pending)?;
        info!("Batch complete: {} identifiers attempted, cursor {}", attempted, cursor);
        Ok(RunOutcome::Completed { attempted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchError;
    use crate::types::MatchStatus;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    /// Scripted page source: ids in `fail` always error, everything else
    /// gets a minimal finished page.
    struct ScriptedSource {
        fail: Vec<u32>,
    }

    impl PageSource for ScriptedSource {
        fn fetch(&self, match_id: u32) -> Result<String, FetchError> {
            if self.fail.contains(&match_id) {
                return Err(FetchError::NavigationTimeout);
            }
            Ok(format!(
                r#"<html><head><title>Ottelu {id} | Tulospalvelu</title></head><body>
                   <div class="spl-match-header">
                     <span class="team-name">Home {id}</span>
                     <span class="team-name">Away {id}</span>
                   </div>
                   <div class="spl-match-score">2–1</div>
                   <div class="spl-match-status">Päättynyt</div>
                   </body></html>"#,
                id = match_id
            ))
        }
    }

    fn quick_config(dir: &std::path::Path, start_id: u32) -> ScraperConfig {
        let mut config = ScraperConfig::default();
        config.crawl.start_id = start_id;
        config.crawl.request_delay_secs = 0;
        config.crawl.save_every = 2;
        config.storage.state_file = dir.join("state.json").to_string_lossy().into_owned();
        config
    }

    fn orchestrator(
        dir: &std::path::Path,
        start_id: u32,
        fail: Vec<u32>,
    ) -> CrawlOrchestrator<ScriptedSource> {
        let config = quick_config(dir, start_id);
        let store = CheckpointStore::new(&config.storage.state_file, start_id);
        CrawlOrchestrator::new(
            config,
            ScriptedSource { fail },
            store,
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn load_state(dir: &std::path::Path, start_id: u32) -> (u32, BTreeMap<u32, MatchRecord>) {
        CheckpointStore::new(dir.join("state.json"), start_id).load()
    }

    #[test]
    fn test_batch_attempts_every_identifier() {
        let dir = tempdir().unwrap();
        let mut orch = orchestrator(dir.path(), 100, vec![]);
        let outcome = orch.run(Some(5)).unwrap();
        assert_eq!(outcome, RunOutcome::Completed { attempted: 5 });

        let (cursor, records) = load_state(dir.path(), 100);
        assert_eq!(cursor, 104);
        assert_eq!(
            records.keys().copied().collect::<Vec<_>>(),
            vec![100, 101, 102, 103, 104]
        );
        assert_eq!(records[&100].status, MatchStatus::Finished);
    }

    #[test]
    fn test_failed_fetch_still_produces_record_and_advances() {
        let dir = tempdir().unwrap();
        let mut orch = orchestrator(dir.path(), 100, vec![102]);
        orch.run(Some(4)).unwrap();

        let (cursor, records) = load_state(dir.path(), 100);
        assert_eq!(cursor, 103);
        assert_eq!(records.len(), 4);
        assert_eq!(records[&102].status, MatchStatus::PageLoadFailed);
        assert!(records[&102].notes[0].starts_with("fetch_failed"));
        assert_eq!(records[&103].status, MatchStatus::Finished);
    }

    #[test]
    fn test_second_run_resumes_after_cursor() {
        let dir = tempdir().unwrap();
        orchestrator(dir.path(), 100, vec![]).run(Some(3)).unwrap();
        orchestrator(dir.path(), 100, vec![]).run(Some(3)).unwrap();

        let (cursor, records) = load_state(dir.path(), 100);
        assert_eq!(cursor, 105);
        assert_eq!(records.len(), 6);
        assert!(records.contains_key(&100));
        assert!(records.contains_key(&105));
    }

    #[test]
    fn test_shutdown_before_first_identifier_saves_and_stops() {
        let dir = tempdir().unwrap();
        let config = quick_config(dir.path(), 100);
        let store = CheckpointStore::new(&config.storage.state_file, 100);
        let shutdown = Arc::new(AtomicBool::new(true));
        let mut orch =
            CrawlOrchestrator::new(config, ScriptedSource { fail: vec![] }, store, shutdown);

        let outcome = orch.run(Some(10)).unwrap();
        assert_eq!(outcome, RunOutcome::Interrupted { attempted: 0 });

        let (cursor, records) = load_state(dir.path(), 100);
        assert_eq!(cursor, 99);
        assert!(records.is_empty());
    }

    #[test]
    fn test_refetching_replaces_rather_than_duplicates() {
        let dir = tempdir().unwrap();
        // First run fails on 101, second run re-covers it by resetting the
        // cursor through a fresh store with an earlier start.
        orchestrator(dir.path(), 100, vec![101]).run(Some(2)).unwrap();
        let (_, records) = load_state(dir.path(), 100);
        assert_eq!(records[&101].status, MatchStatus::PageLoadFailed);

        // Overwrite the state file cursor back to 100 by saving a fresh
        // successful record for 101 through the orchestrator path.
        let config = quick_config(dir.path(), 100);
        let mut store = CheckpointStore::new(&config.storage.state_file, 100);
        store.load();
        let mut orch = CrawlOrchestrator::new(
            config,
            ScriptedSource { fail: vec![] },
            store,
            Arc::new(AtomicBool::new(false)),
        );
        let record = orch.process_one(101);
        let mut batch = BTreeMap::new();
        batch.insert(101, record);
        orch.store.save(101, &batch).unwrap();

        let (cursor, records) = load_state(dir.path(), 100);
        assert_eq!(records.len(), 2);
        assert_eq!(records[&101].status, MatchStatus::Finished);
        assert_eq!(cursor, 101);
    }
}
