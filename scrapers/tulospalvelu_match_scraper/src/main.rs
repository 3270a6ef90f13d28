use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use tulospalvelu_match_scraper::analysis;
use tulospalvelu_match_scraper::checkpoint::CheckpointStore;
use tulospalvelu_match_scraper::config::ScraperConfig;
use tulospalvelu_match_scraper::extractor;
use tulospalvelu_match_scraper::fetcher::ChromeFetcher;
use tulospalvelu_match_scraper::orchestrator::{record_from_fields, CrawlOrchestrator, RunOutcome};
use tulospalvelu_match_scraper::predictions;
use tulospalvelu_match_scraper::snapshot::SnapshotStore;
use tulospalvelu_match_scraper::types::MatchRecord;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl the next batch of match identifiers
    Crawl {
        /// Optional override for the number of identifiers to attempt
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Extract and classify a single saved HTML file
    ProcessFile {
        /// Path to the HTML file to process
        #[arg(short, long)]
        file: PathBuf,
        /// Match identifier to record the result under
        #[arg(short, long)]
        id: u32,
    },
    /// Write the markdown analysis report from crawled data
    Report {
        /// Output path for the report
        #[arg(short, long, default_value = "MatchReport.md")]
        output: PathBuf,
    },
    /// Score a prediction file against crawled results
    Score {
        /// Path to the prediction file
        #[arg(short, long)]
        predictions: PathBuf,
    },
}

fn load_records(config: &ScraperConfig) -> BTreeMap<u32, MatchRecord> {
    let mut store = CheckpointStore::new(&config.storage.state_file, config.crawl.start_id);
    let (_, records) = store.load();
    records
}

fn run_crawl(config: ScraperConfig, limit: Option<u32>) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, finishing the current identifier");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install the interrupt handler")?;

    let snapshots = SnapshotStore::new(&config.storage.snapshot_dir);
    let fetcher = ChromeFetcher::new(config.clone(), snapshots);
    let store = CheckpointStore::new(&config.storage.state_file, config.crawl.start_id);
    let mut orchestrator = CrawlOrchestrator::new(config, fetcher, store, shutdown);

    match orchestrator.run(limit)? {
        RunOutcome::Completed { attempted } => {
            info!("Crawl finished: {} identifiers attempted", attempted)
        }
        RunOutcome::Interrupted { attempted } => {
            info!("Crawl interrupted after {} identifiers", attempted)
        }
    }
    Ok(())
}

fn run_process_file(file: &PathBuf, id: u32) -> Result<()> {
    let markup =
        fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let fields = extractor::extract(&markup, id);
    let record = record_from_fields(id, format!("file://{}", file.display()), fields);
    info!("{:?} classified as {}", file, record.status);
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn run_report(config: ScraperConfig, output: &PathBuf) -> Result<()> {
    let records = load_records(&config);
    let report = analysis::build_report(&records);
    fs::write(output, report).with_context(|| format!("Failed to write {:?}", output))?;
    info!("Report for {} records written to {:?}", records.len(), output);
    Ok(())
}

fn run_score(config: ScraperConfig, path: &PathBuf) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let prediction = predictions::parse_predictions(&text);
    if prediction.teams.is_empty() && prediction.scorers.is_empty() {
        warn!("No teams or scorers found in {:?}", path);
    }
    let records = load_records(&config);
    let breakdown = predictions::score_prediction(&prediction, &records);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "prediction".to_string());
    print!("{}", predictions::render_score(&name, &breakdown));
    Ok(())
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ScraperConfig::from_env();

    match cli.command {
        Commands::Crawl { limit } => run_crawl(config, limit),
        Commands::ProcessFile { file, id } => run_process_file(&file, id),
        Commands::Report { output } => run_report(config, &output),
        Commands::Score { predictions } => run_score(config, &predictions),
    }
}
