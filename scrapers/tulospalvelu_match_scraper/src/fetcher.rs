use headless_chrome::{Browser, LaunchOptions};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::snapshot::SnapshotStore;
use crate::utils::retry_with_backoff;

/// Element that signals the stats view has rendered. Advisory only: pages
/// for matches without published stats never render it, so its absence is
/// not treated as a failed load.
const RENDER_MARKER: &str = ".spl-match-info, .spl-table";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("navigation timeout")]
    NavigationTimeout,
    #[error("browser session setup failed: {0}")]
    SessionSetup(String),
    #[error("rendered page too short ({bytes} bytes)")]
    ShortPage { bytes: usize },
    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Every kind is transient for a single attempt; the retry budget is
    /// what makes a failure terminal for an identifier.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::NavigationTimeout
                | FetchError::SessionSetup(_)
                | FetchError::ShortPage { .. }
                | FetchError::Transport(_)
        )
    }
}

/// The seam between the crawl loop and the network. Tests substitute a
/// scripted implementation; production uses `ChromeFetcher`.
pub trait PageSource {
    fn fetch(&self, match_id: u32) -> Result<String, FetchError>;
}

/// Fetches one detail page by driving a headless Chrome instance.
///
/// A fresh browser is launched for every attempt and torn down when the
/// attempt ends, whichever way it ends. Reusing a session after a failed
/// load has produced stale-DOM reads against this site.
pub struct ChromeFetcher {
    config: ScraperConfig,
    snapshots: SnapshotStore,
}

impl ChromeFetcher {
    pub fn new(config: ScraperConfig, snapshots: SnapshotStore) -> Self {
        Self { config, snapshots }
    }

    fn classify(e: anyhow::Error) -> FetchError {
        let msg = e.to_string();
        if msg.to_lowercase().contains("timeout") {
            FetchError::NavigationTimeout
        } else {
            FetchError::Transport(msg)
        }
    }

    fn fetch_once(&self, match_id: u32, attempt: u32) -> Result<String, FetchError> {
        let url = self.config.match_url(match_id);
        debug!("Fetch attempt {} for {}", attempt, url);

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((1920, 1080)))
            .build()
            .map_err(|e| FetchError::SessionSetup(e.to_string()))?;
        // Dropped at the end of this attempt; kills the Chrome process on
        // every exit path.
        let browser = Browser::new(options).map_err(|e| FetchError::SessionSetup(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| FetchError::SessionSetup(e.to_string()))?;
        tab.set_default_timeout(Duration::from_secs(self.config.fetch.page_load_timeout_secs));

        tab.navigate_to(&url).map_err(Self::classify)?;
        tab.wait_until_navigated().map_err(Self::classify)?;

        // The marker is a hint, not a gate: not-yet-scheduled matches never
        // render it and are still legitimate pages.
        match tab.wait_for_element_with_custom_timeout(
            RENDER_MARKER,
            Duration::from_secs(self.config.fetch.wait_marker_timeout_secs),
        ) {
            Ok(_) => debug!("Render marker found for match {}", match_id),
            Err(e) => warn!(
                "No render marker for match {} within {}s ({}), reading DOM anyway",
                match_id, self.config.fetch.wait_marker_timeout_secs, e
            ),
        }

        // Nudge lazily-loaded sections into rendering.
        tab.evaluate("window.scrollTo(0, document.body.scrollHeight);", false)
            .map_err(Self::classify)?;
        std::thread::sleep(Duration::from_secs(self.config.fetch.settle_secs));

        let markup = tab.get_content().map_err(Self::classify)?;
        debug!("Rendered markup for match {}: {} bytes", match_id, markup.len());

        if markup.len() < self.config.fetch.min_page_bytes {
            warn!(
                "Match {} rendered only {} bytes (minimum {}), saving snapshot",
                match_id,
                markup.len(),
                self.config.fetch.min_page_bytes
            );
            if let Err(e) = self.snapshots.save(match_id, attempt, "short_page", &markup) {
                warn!("Snapshot write failed for match {}: {}", match_id, e);
            }
            return Err(FetchError::ShortPage { bytes: markup.len() });
        }

        info!("Fetched match {} on attempt {}", match_id, attempt);
        Ok(markup)
    }
}

impl PageSource for ChromeFetcher {
    fn fetch(&self, match_id: u32) -> Result<String, FetchError> {
        retry_with_backoff(
            self.config.fetch.max_retries,
            Duration::from_secs(self.config.fetch.retry_delay_secs),
            FetchError::is_retryable,
            |attempt| self.fetch_once(match_id, attempt),
        )
    }
}
