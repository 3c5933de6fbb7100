//! # Paper Trawler
//!
//! A discovery and extraction pipeline for sequentially-numbered working
//! papers. The repository publishes no bulk index, so the trawler finds the
//! newest paper number by probing, then scans backward one number at a
//! time, extracting metadata from each paper page and keeping the records
//! that match a topic query and an optional publication-date window.
//!
//! ## Features
//!
//! - Auto-detects the newest paper number via HEAD probing
//! - Extracts title, authors, DOI, dates, and PDF URL from citation meta
//!   tags, with a cascading fallback for abstracts
//! - Whole-word topic filtering with synonym expansion for AI searches
//! - Periodic JSON checkpoints, plus an emergency checkpoint on interrupt
//! - Optional PDF downloads for accepted papers
//! - An `analyze` command summarizing previously collected results
//!
//! ## Usage
//!
//! ```sh
//! paper_trawler scrape -q AI --max-papers 25
//! paper_trawler analyze data/papers_ai.json
//! ```
//!
//! ## Architecture
//!
//! The scan is a single sequential loop: fetch one paper page (rate-limited
//! with a fixed delay), extract it, filter it, advance the cursor. All
//! stopping conditions (accepted/checked limits, the consecutive-not-found
//! streak, paper number zero) are evaluated at the top of each iteration,
//! as is the operator-interrupt flag.

use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod analysis;
mod checkpoint;
mod cli;
mod crawler;
mod extract;
mod fetcher;
mod filter;
mod frontier;
mod models;
mod utils;

use cli::{AnalyzeArgs, Cli, Command, ScrapeArgs};
use crawler::{CrawlConfig, Crawler, StopReason};
use extract::Extractor;
use fetcher::Fetcher;
use frontier::ProbeWindow;
use utils::{ensure_writable_dir, slugify_query};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();

    let result = match args.command {
        Command::Scrape(scrape) => run_scrape(scrape).await,
        Command::Analyze(analyze) => run_analyze(analyze).await,
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    result
}

async fn run_scrape(args: ScrapeArgs) -> Result<(), Box<dyn Error>> {
    info!(query = %args.query, base_url = %args.base_url, "paper_trawler starting up");

    // Early check: ensure the output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let output_name = args
        .output
        .clone()
        .unwrap_or_else(|| format!("papers_{}.json", slugify_query(&args.query)));
    let output_path = Path::new(&args.output_dir).join(&output_name);
    let stem = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("papers")
        .to_string();
    let checkpoint_path = Path::new(&args.output_dir).join(format!("{stem}_progress.json"));
    let emergency_path = Path::new(&args.output_dir).join(format!("{stem}_interrupted.json"));

    let fetcher = Fetcher::new(
        &args.user_agent,
        Duration::from_secs(args.timeout),
        Duration::from_secs_f64(args.delay),
        args.max_retries,
    )?;
    let probe = ProbeWindow {
        start: args.probe_start,
        end: args.probe_end,
        step: args.probe_step,
        // one stride of slack: papers may exist anywhere within a step
        buffer: args.probe_step,
        fallback: args.probe_fallback,
    };
    let extractor = Extractor::new(
        fetcher,
        &args.base_url,
        probe,
        PathBuf::from(&args.download_dir),
    );

    let config = CrawlConfig {
        query: args.query.clone(),
        start_date: args.start_date.clone(),
        end_date: args.end_date.clone(),
        start_number: args.start_number,
        max_papers: args.max_papers,
        max_checked: args.max_checked,
        max_consecutive_failures: args.max_failures,
        checkpoint_every: args.checkpoint_every,
        checkpoint_path,
        emergency_path: emergency_path.clone(),
        download_pdfs: args.download_pdfs,
    };

    // Interrupts are observed between papers, never mid-fetch; the crawler
    // writes the emergency checkpoint itself before returning.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; stopping after the current paper");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let crawler = Crawler::new(extractor, config, cancel);
    let outcome = crawler.run().await;

    if outcome.stop == StopReason::Interrupted {
        println!(
            "Scrape interrupted; partial results saved to {}",
            emergency_path.display()
        );
        return Err("scrape interrupted".into());
    }

    checkpoint::save(&outcome.papers, &output_path).await?;

    let with_abstract = outcome
        .papers
        .iter()
        .filter(|p| p.abstract_text.is_some())
        .count();
    println!("Scrape finished: {}", outcome.stop);
    println!("  Checked:        {}", outcome.checked);
    println!("  Accepted:       {}", outcome.accepted);
    println!("  With abstracts: {with_abstract}");
    println!("  Saved to:       {}", output_path.display());
    if let Some(first) = outcome.papers.first() {
        println!(
            "  Newest match:   {}",
            first.title.as_deref().unwrap_or("<untitled>")
        );
    }

    Ok(())
}

async fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    let papers = checkpoint::load(Path::new(&args.input)).await?;
    info!(count = papers.len(), input = %args.input, "Loaded result file");

    let stats = analysis::summary(&papers);
    println!("Summary for {}:", args.input);
    println!("  Total papers:      {}", stats.total);
    println!("  With titles:       {}", stats.with_title);
    println!("  With abstracts:    {}", stats.with_abstract);
    println!("  With PDFs:         {}", stats.with_pdf);
    println!("  With authors:      {}", stats.with_authors);
    println!("  With dates:        {}", stats.with_date);
    println!("  Total authors:     {}", stats.total_authors);
    println!("  Unique authors:    {}", stats.unique_authors);
    println!("  Authors per paper: {:.2}", stats.avg_authors_per_paper);
    if let Some(words) = &stats.abstract_words {
        println!(
            "  Abstract words:    min {} / avg {:.0} / max {}",
            words.min, words.avg, words.max
        );
    }

    let authors = analysis::top_authors(&papers, args.top_n);
    if !authors.is_empty() {
        println!("\nTop {} authors:", args.top_n.min(authors.len()));
        for (i, (author, count)) in authors.iter().enumerate() {
            println!("  {:2}. {author}: {count} papers", i + 1);
        }
    }

    let keywords = analysis::top_keywords(&papers, args.top_n, 4);
    if !keywords.is_empty() {
        println!("\nTop {} keywords:", args.top_n.min(keywords.len()));
        for (i, (word, count)) in keywords.iter().enumerate() {
            println!("  {:2}. {word}: {count} occurrences", i + 1);
        }
    }

    let years = analysis::papers_by_year(&papers);
    if !years.is_empty() {
        println!("\nPapers by year:");
        for (year, count) in &years {
            println!("  {year}: {count}");
        }
    }

    Ok(())
}
