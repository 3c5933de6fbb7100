//! Frontier auto-detection: find the newest existing paper number.
//!
//! The repository issues paper numbers monotonically but publishes no index,
//! so the scan's starting point has to be probed for. [`locate_frontier`]
//! HEAD-checks decreasing numbers until one exists, then adds a buffer to
//! tolerate even-newer papers beyond the probe stride.
//!
//! This is a heuristic, not a guarantee: the probe window will eventually
//! fall behind the real frontier, which is why its bounds are configuration
//! rather than constants.

use crate::fetcher::Fetcher;
use crate::models::paper_url;
use tracing::{info, instrument, warn};

/// Bounds of the frontier probe, all caller-supplied.
#[derive(Debug, Clone)]
pub struct ProbeWindow {
    /// Highest paper number probed.
    pub start: u64,
    /// Probing stops once the number drops to this value.
    pub end: u64,
    /// Distance between probes.
    pub step: u64,
    /// Added to the first hit to cover papers newer than the probe stride.
    pub buffer: u64,
    /// Starting number used when nothing in the window exists.
    pub fallback: u64,
}

impl Default for ProbeWindow {
    fn default() -> Self {
        Self {
            start: 33_500,
            end: 33_000,
            step: 10,
            buffer: 10,
            fallback: 33_200,
        }
    }
}

/// Probe for the newest existing paper and return the scan starting point.
///
/// Probes sequentially; the crawl's rate limit applies to probing too.
#[instrument(level = "info", skip(fetcher, base_url))]
pub async fn locate_frontier(fetcher: &Fetcher, base_url: &str, probe: &ProbeWindow) -> u64 {
    info!(
        start = probe.start,
        end = probe.end,
        step = probe.step,
        "probing for the newest paper number"
    );

    let step = probe.step.max(1);
    let mut id = probe.start;
    while id > probe.end {
        if fetcher.exists(&paper_url(base_url, id)).await {
            let frontier = id + probe.buffer;
            info!(found = id, frontier, "frontier located");
            return frontier;
        }
        id = id.saturating_sub(step);
    }

    warn!(
        fallback = probe.fallback,
        "no paper found in probe window; using fallback start number"
    );
    probe.fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn quick_fetcher() -> Fetcher {
        Fetcher::new("paper_trawler test", Duration::from_secs(5), Duration::ZERO, 1).unwrap()
    }

    #[tokio::test]
    async fn test_returns_first_hit_plus_buffer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/papers/w100")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("HEAD", "/papers/w90")
            .with_status(200)
            .create_async()
            .await;

        let probe = ProbeWindow {
            start: 100,
            end: 80,
            step: 10,
            buffer: 10,
            fallback: 42,
        };
        let fetcher = quick_fetcher();
        let frontier = locate_frontier(&fetcher, &server.url(), &probe).await;
        assert_eq!(frontier, 100); // 90 + buffer
    }

    #[tokio::test]
    async fn test_falls_back_when_window_is_empty() {
        let mut server = mockito::Server::new_async().await;
        for id in [100u64, 90, 80] {
            server
                .mock("HEAD", format!("/papers/w{id}").as_str())
                .with_status(404)
                .create_async()
                .await;
        }

        let probe = ProbeWindow {
            start: 100,
            end: 70,
            step: 10,
            buffer: 10,
            fallback: 42,
        };
        let fetcher = quick_fetcher();
        let frontier = locate_frontier(&fetcher, &server.url(), &probe).await;
        assert_eq!(frontier, 42);
    }
}
