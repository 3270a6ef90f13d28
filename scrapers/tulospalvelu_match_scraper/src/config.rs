use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlConfig {
    /// URL template; `{match_id}` is replaced with the identifier.
    pub base_url: String,
    /// First identifier of the crawl space.
    pub start_id: u32,
    /// Identifiers attempted per run.
    pub batch_size: u32,
    /// Politeness delay between identifiers, seconds.
    pub request_delay_secs: u64,
    /// Flush the checkpoint every this many identifiers.
    pub save_every: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tulospalvelu.palloliitto.fi/match/{match_id}/stats".to_string(),
            start_id: 3748452,
            batch_size: 100,
            request_delay_secs: 2,
            save_every: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchConfig {
    /// Hard page-load timeout, seconds.
    pub page_load_timeout_secs: u64,
    /// Shorter advisory timeout for the render-marker element.
    pub wait_marker_timeout_secs: u64,
    /// Pause after scrolling to the bottom, seconds.
    pub settle_secs: u64,
    /// Rendered markup shorter than this is treated as an error page.
    pub min_page_bytes: usize,
    pub max_retries: u32,
    /// Base of the linearly increasing retry backoff, seconds.
    pub retry_delay_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_load_timeout_secs: 45,
            wait_marker_timeout_secs: 10,
            settle_secs: 3,
            min_page_bytes: 2000,
            max_retries: 3,
            retry_delay_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// JSON state file holding the cursor and the merged record set.
    pub state_file: String,
    /// Directory for raw markup snapshots of suspicious pages.
    pub snapshot_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: "match_data/state.json".to_string(),
            snapshot_dir: "match_data/snapshots".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScraperConfig {
    pub crawl: CrawlConfig,
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("SCRAPER_BASE_URL") {
            config.crawl.base_url = url;
        }
        if let Ok(Some(id)) = env::var("SCRAPER_START_ID").map_or(Ok(None), |v| v.parse::<u32>().map(Some)) {
            config.crawl.start_id = id;
        }
        if let Ok(Some(n)) = env::var("SCRAPER_BATCH_SIZE").map_or(Ok(None), |v| v.parse::<u32>().map(Some)) {
            config.crawl.batch_size = n;
        }
        if let Ok(Some(secs)) = env::var("SCRAPER_REQUEST_DELAY_SECS").map_or(Ok(None), |v| v.parse::<u64>().map(Some)) {
            config.crawl.request_delay_secs = secs;
        }
        if let Ok(Some(n)) = env::var("SCRAPER_SAVE_EVERY").map_or(Ok(None), |v| v.parse::<u32>().map(Some)) {
            config.crawl.save_every = n;
        }
        if let Ok(Some(secs)) = env::var("SCRAPER_PAGE_TIMEOUT_SECS").map_or(Ok(None), |v| v.parse::<u64>().map(Some)) {
            config.fetch.page_load_timeout_secs = secs;
        }
        if let Ok(Some(bytes)) = env::var("SCRAPER_MIN_PAGE_BYTES").map_or(Ok(None), |v| v.parse::<usize>().map(Some)) {
            config.fetch.min_page_bytes = bytes;
        }
        if let Ok(path) = env::var("SCRAPER_STATE_FILE") {
            config.storage.state_file = path;
        }
        if let Ok(dir) = env::var("SCRAPER_SNAPSHOT_DIR") {
            config.storage.snapshot_dir = dir;
        }

        config
    }

    pub fn match_url(&self, match_id: u32) -> String {
        self.crawl.base_url.replace("{match_id}", &match_id.to_string())
    }
}
