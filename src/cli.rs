//! Command-line interface definitions for Paper Trawler.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The host-identifying options can also be provided via environment
//! variables.

use clap::{Args, Parser, Subcommand};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Command-line arguments for the Paper Trawler application.
///
/// # Examples
///
/// ```sh
/// # Scan for AI-related papers, stop after 25 matches
/// paper_trawler scrape -q AI --max-papers 25
///
/// # Restrict by publication date and download the PDFs
/// paper_trawler scrape -q labor --start-date 2022-01-01 --download-pdfs
///
/// # Summarize a previous run
/// paper_trawler analyze data/papers_ai.json --top-n 15
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan backward from the newest paper and collect matching records
    Scrape(ScrapeArgs),
    /// Print summary statistics for a previously written result file
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Topic query matched against titles and abstracts ("AI" expands to
    /// related terms; empty matches everything)
    #[arg(short, long, default_value = "AI")]
    pub query: String,

    /// Paper number to start from (auto-detected when omitted)
    #[arg(long)]
    pub start_number: Option<u64>,

    /// Stop after this many matching papers
    #[arg(long)]
    pub max_papers: Option<u64>,

    /// Stop after checking this many paper numbers
    #[arg(long)]
    pub max_checked: Option<u64>,

    /// Earliest publication date to accept (YYYY-MM-DD or YYYY/MM/DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Latest publication date to accept (YYYY-MM-DD or YYYY/MM/DD)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Seconds to wait between requests
    #[arg(short, long, default_value_t = 1.5)]
    pub delay: f64,

    /// Attempts per request before giving up
    #[arg(long, default_value_t = 3)]
    pub max_retries: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Repository host
    #[arg(long, env = "PAPER_TRAWLER_BASE_URL", default_value = "https://www.nber.org")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[arg(long, env = "PAPER_TRAWLER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Output JSON filename (derived from the query when omitted)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Directory for output and checkpoint files
    #[arg(long, default_value = "data")]
    pub output_dir: String,

    /// Download the PDF of each accepted paper
    #[arg(long)]
    pub download_pdfs: bool,

    /// Directory for downloaded PDFs
    #[arg(long, default_value = "downloads")]
    pub download_dir: String,

    /// Write a checkpoint after every Nth accepted paper
    #[arg(long, default_value_t = 10)]
    pub checkpoint_every: u64,

    /// Consecutive not-found results tolerated before stopping
    #[arg(long, default_value_t = 50)]
    pub max_failures: u64,

    /// Highest paper number probed during frontier auto-detection
    #[arg(long, default_value_t = 33_500)]
    pub probe_start: u64,

    /// Paper number at which frontier probing gives up
    #[arg(long, default_value_t = 33_000)]
    pub probe_end: u64,

    /// Distance between frontier probes
    #[arg(long, default_value_t = 10)]
    pub probe_step: u64,

    /// Start number used when no probe succeeds
    #[arg(long, default_value_t = 33_200)]
    pub probe_fallback: u64,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Result file written by a previous scrape
    pub input: String,

    /// Number of top authors and keywords to show
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,
}
