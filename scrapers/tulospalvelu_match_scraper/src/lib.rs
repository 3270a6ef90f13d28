pub mod analysis;
pub mod checkpoint;
pub mod classifier;
pub mod config;
pub mod events;
pub mod extractor;
pub mod fetcher;
pub mod orchestrator;
pub mod predictions;
pub mod snapshot;
pub mod types;
pub mod utils;

pub use checkpoint::CheckpointStore;
pub use config::ScraperConfig;
pub use fetcher::{ChromeFetcher, FetchError, PageSource};
pub use orchestrator::{CrawlOrchestrator, RunOutcome};
pub use types::{MatchRecord, MatchStatus};
