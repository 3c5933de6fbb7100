//! The crawl controller: drives the backward scan over paper numbers.
//!
//! One [`Crawler`] value owns everything a run needs, so several
//! independent crawls (different queries, different date windows) can
//! coexist in one process without shared state.
//!
//! The scan is strictly sequential: one extraction at a time, each one
//! paced by the fetcher's inter-request delay. That is a deliberate rate
//! limit against the upstream host, preserved even though the code runs in
//! an async runtime.

use crate::checkpoint;
use crate::extract::{Extraction, PaperSource};
use crate::filter::{DateWindow, TopicFilter};
use crate::models::Paper;
use crate::utils::truncate_for_log;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

/// How often to log scan progress, in checked papers.
const PROGRESS_EVERY: u64 = 50;

/// Plain-value configuration for one crawl. The controller holds no global
/// state; everything it needs arrives here.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Topic query matched against titles and abstracts.
    pub query: String,
    /// Earliest acceptable publication date, if any.
    pub start_date: Option<String>,
    /// Latest acceptable publication date, if any.
    pub end_date: Option<String>,
    /// Paper number to start from; auto-detected when `None`.
    pub start_number: Option<u64>,
    /// Stop after accepting this many papers.
    pub max_papers: Option<u64>,
    /// Stop after checking this many paper numbers.
    pub max_checked: Option<u64>,
    /// Consecutive not-found results tolerated before stopping.
    pub max_consecutive_failures: u64,
    /// Write a checkpoint after every Nth accepted paper.
    pub checkpoint_every: u64,
    /// Where periodic checkpoints are written.
    pub checkpoint_path: PathBuf,
    /// Where the result set is written when the run is interrupted.
    pub emergency_path: PathBuf,
    /// Whether to download the PDF of each accepted paper.
    pub download_pdfs: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            start_date: None,
            end_date: None,
            start_number: None,
            max_papers: None,
            max_checked: None,
            max_consecutive_failures: 50,
            checkpoint_every: 10,
            checkpoint_path: PathBuf::from("data/papers_progress.json"),
            emergency_path: PathBuf::from("data/papers_interrupted.json"),
            download_pdfs: false,
        }
    }
}

/// Why a scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The accepted-paper or checked-paper limit was reached.
    LimitReached,
    /// Too many consecutive not-found results; the number range looks
    /// exhausted below the frontier.
    FailureStreak,
    /// The cursor walked all the way down to zero.
    Exhausted,
    /// An operator interrupt was observed.
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::LimitReached => "limit reached",
            StopReason::FailureStreak => "consecutive-failure threshold reached",
            StopReason::Exhausted => "paper numbers exhausted",
            StopReason::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// The result of one completed (or interrupted) scan.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Accepted papers, in scan order (newest number first).
    pub papers: Vec<Paper>,
    /// How many paper numbers were examined.
    pub checked: u64,
    /// How many papers passed both filters.
    pub accepted: u64,
    /// Why the scan stopped.
    pub stop: StopReason,
}

/// Transient per-run counters. Never persisted; a new run starts fresh.
#[derive(Debug)]
struct CrawlState {
    cursor: u64,
    checked: u64,
    accepted: u64,
    consecutive_failures: u64,
}

/// Drives the backward scan over a [`PaperSource`].
#[derive(Debug)]
pub struct Crawler<S> {
    source: S,
    config: CrawlConfig,
    topic: TopicFilter,
    window: DateWindow,
    cancel: Arc<AtomicBool>,
}

impl<S: PaperSource> Crawler<S> {
    /// Build a crawler. Filters are compiled once, up front.
    pub fn new(source: S, config: CrawlConfig, cancel: Arc<AtomicBool>) -> Self {
        let topic = TopicFilter::new(&config.query);
        let window = DateWindow::new(config.start_date.as_deref(), config.end_date.as_deref());
        Self {
            source,
            config,
            topic,
            window,
            cancel,
        }
    }

    /// Run the scan to completion and return the accepted papers.
    ///
    /// Per-paper failures never abort the run; they only advance the
    /// consecutive-failure streak. An observed interrupt writes the
    /// emergency checkpoint before returning.
    #[instrument(level = "info", skip(self), fields(query = %self.config.query))]
    pub async fn run(&self) -> CrawlOutcome {
        let start = match self.config.start_number {
            Some(number) => number,
            None => self.source.locate_frontier().await,
        };

        let mut state = CrawlState {
            cursor: start,
            checked: 0,
            accepted: 0,
            consecutive_failures: 0,
        };
        let mut papers: Vec<Paper> = Vec::new();
        let cadence = self.config.checkpoint_every.max(1);

        info!(
            start,
            max_papers = ?self.config.max_papers,
            max_checked = ?self.config.max_checked,
            "starting backward scan"
        );

        let stop = loop {
            if self.cancel.load(Ordering::SeqCst) {
                warn!(
                    accepted = state.accepted,
                    "interrupt observed; writing emergency checkpoint"
                );
                if let Err(e) = checkpoint::save(&papers, &self.config.emergency_path).await {
                    warn!(error = %e, "emergency checkpoint write failed");
                }
                break StopReason::Interrupted;
            }
            if let Some(limit) = self.config.max_papers {
                if state.accepted >= limit {
                    info!(limit, "accepted-paper limit reached");
                    break StopReason::LimitReached;
                }
            }
            if let Some(limit) = self.config.max_checked {
                if state.checked >= limit {
                    info!(limit, "checked-paper limit reached");
                    break StopReason::LimitReached;
                }
            }
            if state.consecutive_failures >= self.config.max_consecutive_failures {
                info!(
                    streak = state.consecutive_failures,
                    "consecutive-failure threshold reached"
                );
                break StopReason::FailureStreak;
            }
            if state.cursor == 0 {
                info!("reached paper number zero");
                break StopReason::Exhausted;
            }

            state.checked += 1;
            match self.source.extract(state.cursor).await {
                Extraction::Paper(paper) => {
                    state.consecutive_failures = 0;
                    if self.topic.matches(&paper) && self.window.contains(&paper) {
                        state.accepted += 1;
                        info!(
                            n = state.accepted,
                            id = paper.id,
                            title = %truncate_for_log(paper.title.as_deref().unwrap_or("<untitled>"), 100),
                            "accepted paper"
                        );
                        if self.config.download_pdfs {
                            if let Some(pdf_url) = paper.pdf_url.as_deref() {
                                // failure is logged by the source and does
                                // not affect acceptance
                                self.source.download(pdf_url, paper.id).await;
                            }
                        }
                        papers.push(*paper);
                        if state.accepted % cadence == 0 {
                            if let Err(e) =
                                checkpoint::save(&papers, &self.config.checkpoint_path).await
                            {
                                warn!(error = %e, "checkpoint write failed; scan continues");
                            }
                        }
                    } else {
                        debug!(id = paper.id, "paper rejected by filters");
                    }
                }
                Extraction::NotFound => {
                    state.consecutive_failures += 1;
                    debug!(
                        id = state.cursor,
                        streak = state.consecutive_failures,
                        "paper not found"
                    );
                }
                Extraction::NetworkFailed => {
                    state.consecutive_failures += 1;
                    warn!(
                        id = state.cursor,
                        streak = state.consecutive_failures,
                        "network failure counted toward failure streak"
                    );
                }
                Extraction::ParseFailed => {
                    state.consecutive_failures += 1;
                    warn!(
                        id = state.cursor,
                        streak = state.consecutive_failures,
                        "unusable page counted toward failure streak"
                    );
                }
            }

            state.cursor -= 1;
            if state.checked % PROGRESS_EVERY == 0 {
                info!(
                    checked = state.checked,
                    accepted = state.accepted,
                    cursor = state.cursor,
                    "scan progress"
                );
            }
        };

        info!(
            checked = state.checked,
            accepted = state.accepted,
            %stop,
            "scan finished"
        );
        CrawlOutcome {
            papers,
            checked: state.checked,
            accepted: state.accepted,
            stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn make_paper(id: u64, title: &str, date: Option<&str>) -> Paper {
        Paper {
            id,
            url: format!("https://www.nber.org/papers/w{id}"),
            title: Some(title.to_string()),
            authors: vec!["Test Author".to_string()],
            abstract_text: None,
            pdf_url: Some(format!("https://www.nber.org/papers/w{id}.pdf")),
            publication_date: date.map(str::to_string),
            doi: None,
            extracted_at: Utc::now(),
        }
    }

    /// Scripted source: ids present in `papers` extract successfully,
    /// everything else is not found.
    struct FakeSource {
        frontier: u64,
        papers: HashMap<u64, Paper>,
        extract_calls: Mutex<Vec<u64>>,
        download_calls: Mutex<Vec<u64>>,
    }

    impl FakeSource {
        fn new(frontier: u64, papers: Vec<Paper>) -> Self {
            Self {
                frontier,
                papers: papers.into_iter().map(|p| (p.id, p)).collect(),
                extract_calls: Mutex::new(Vec::new()),
                download_calls: Mutex::new(Vec::new()),
            }
        }

        fn extracted(&self) -> Vec<u64> {
            self.extract_calls.lock().unwrap().clone()
        }
    }

    impl PaperSource for FakeSource {
        async fn locate_frontier(&self) -> u64 {
            self.frontier
        }

        async fn extract(&self, id: u64) -> Extraction {
            self.extract_calls.lock().unwrap().push(id);
            match self.papers.get(&id) {
                Some(paper) => Extraction::Paper(Box::new(paper.clone())),
                None => Extraction::NotFound,
            }
        }

        async fn download(&self, _pdf_url: &str, id: u64) -> bool {
            self.download_calls.lock().unwrap().push(id);
            true
        }
    }

    fn test_config(dir: &tempfile::TempDir) -> CrawlConfig {
        CrawlConfig {
            checkpoint_path: dir.path().join("progress.json"),
            emergency_path: dir.path().join("interrupted.json"),
            ..CrawlConfig::default()
        }
    }

    fn unset_cancel() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[tokio::test]
    async fn test_accepted_limit_stops_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(
            100,
            vec![
                make_paper(100, "First Match", None),
                make_paper(99, "Second Match", None),
                make_paper(97, "Never Reached", None),
            ],
        );
        let config = CrawlConfig {
            start_number: Some(100),
            max_papers: Some(2),
            ..test_config(&dir)
        };

        let crawler = Crawler::new(source, config, unset_cancel());
        let outcome = crawler.run().await;

        assert_eq!(outcome.stop, StopReason::LimitReached);
        assert_eq!(outcome.accepted, 2);
        let ids: Vec<u64> = outcome.papers.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![100, 99]);
        // neither 98 nor 97 was ever examined
        assert_eq!(crawler.source.extracted(), vec![100, 99]);
    }

    #[tokio::test]
    async fn test_failure_streak_stops_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(200, Vec::new());
        let config = CrawlConfig {
            start_number: Some(200),
            ..test_config(&dir)
        };

        let crawler = Crawler::new(source, config, unset_cancel());
        let outcome = crawler.run().await;

        assert_eq!(outcome.stop, StopReason::FailureStreak);
        assert_eq!(outcome.checked, 50);
        assert_eq!(outcome.accepted, 0);
        // the last number examined was 151; the cursor rests at 150
        assert_eq!(crawler.source.extracted().last(), Some(&151));
    }

    #[tokio::test]
    async fn test_checked_limit_stops_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(100, Vec::new());
        let config = CrawlConfig {
            start_number: Some(100),
            max_checked: Some(5),
            ..test_config(&dir)
        };

        let crawler = Crawler::new(source, config, unset_cancel());
        let outcome = crawler.run().await;

        assert_eq!(outcome.stop, StopReason::LimitReached);
        assert_eq!(outcome.checked, 5);
    }

    #[tokio::test]
    async fn test_cursor_zero_means_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(3, Vec::new());
        let config = CrawlConfig {
            start_number: Some(3),
            ..test_config(&dir)
        };

        let crawler = Crawler::new(source, config, unset_cancel());
        let outcome = crawler.run().await;

        assert_eq!(outcome.stop, StopReason::Exhausted);
        assert_eq!(outcome.checked, 3);
        assert_eq!(crawler.source.extracted(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_rejected_paper_still_resets_failure_streak() {
        let dir = tempfile::tempdir().unwrap();
        // 5 missing, 4 extractable but rejected by the query, 3 and 2 missing
        let source = FakeSource::new(5, vec![make_paper(4, "Maritime Shipping", None)]);
        let config = CrawlConfig {
            query: "ai".to_string(),
            start_number: Some(5),
            max_consecutive_failures: 2,
            ..test_config(&dir)
        };

        let crawler = Crawler::new(source, config, unset_cancel());
        let outcome = crawler.run().await;

        // streak: 5 missing (1), 4 resets it, 3 missing (1), 2 missing (2)
        assert_eq!(outcome.stop, StopReason::FailureStreak);
        assert_eq!(outcome.checked, 4);
        assert_eq!(outcome.accepted, 0);
    }

    #[tokio::test]
    async fn test_date_window_filters_acceptance() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(
            10,
            vec![
                make_paper(10, "Inside", Some("2022/05/01")),
                make_paper(9, "Outside", Some("2020/01/01")),
                make_paper(8, "No Date", None),
            ],
        );
        let config = CrawlConfig {
            start_date: Some("2022-01-01".to_string()),
            end_date: Some("2023-01-01".to_string()),
            start_number: Some(10),
            max_checked: Some(3),
            ..test_config(&dir)
        };

        let crawler = Crawler::new(source, config, unset_cancel());
        let outcome = crawler.run().await;

        let ids: Vec<u64> = outcome.papers.iter().map(|p| p.id).collect();
        // dated-inside and undated pass; dated-outside is rejected
        assert_eq!(ids, vec![10, 8]);
    }

    #[tokio::test]
    async fn test_periodic_checkpoint_written() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(
            10,
            (7..=10).map(|id| make_paper(id, "Match", None)).collect(),
        );
        let config = CrawlConfig {
            start_number: Some(10),
            max_papers: Some(4),
            checkpoint_every: 2,
            ..test_config(&dir)
        };

        let crawler = Crawler::new(source, config, unset_cancel());
        let outcome = crawler.run().await;

        assert_eq!(outcome.accepted, 4);
        let saved = checkpoint::load(&dir.path().join("progress.json"))
            .await
            .unwrap();
        assert_eq!(saved.len(), 4);
    }

    #[tokio::test]
    async fn test_pdf_download_triggered_for_accepted_papers() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(10, vec![make_paper(10, "Match", None)]);
        let config = CrawlConfig {
            start_number: Some(10),
            max_papers: Some(1),
            download_pdfs: true,
            ..test_config(&dir)
        };

        let crawler = Crawler::new(source, config, unset_cancel());
        crawler.run().await;

        assert_eq!(*crawler.source.download_calls.lock().unwrap(), vec![10]);
    }

    #[tokio::test]
    async fn test_interrupt_writes_emergency_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(10, vec![make_paper(10, "Match", None)]);
        let config = CrawlConfig {
            start_number: Some(10),
            ..test_config(&dir)
        };
        let cancel = Arc::new(AtomicBool::new(true));

        let crawler = Crawler::new(source, config, cancel);
        let outcome = crawler.run().await;

        assert_eq!(outcome.stop, StopReason::Interrupted);
        assert_eq!(outcome.checked, 0);
        let saved = checkpoint::load(&dir.path().join("interrupted.json"))
            .await
            .unwrap();
        assert!(saved.is_empty());
    }

    #[tokio::test]
    async fn test_frontier_used_when_no_start_number() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(42, Vec::new());
        let config = CrawlConfig {
            max_checked: Some(1),
            ..test_config(&dir)
        };

        let crawler = Crawler::new(source, config, unset_cancel());
        crawler.run().await;

        assert_eq!(crawler.source.extracted(), vec![42]);
    }
}
