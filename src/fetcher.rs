//! HTTP fetching with bounded retries and a fixed inter-request delay.
//!
//! All network I/O in the application goes through [`Fetcher`]. It wraps a
//! single `reqwest` client configured with the per-process identity string
//! and request timeout, and enforces the crawl's rate limit: a fixed delay
//! after every successful request, a doubled delay before each retry.
//!
//! # Retry Strategy
//!
//! - Up to `max_retries` attempts per request (default 3)
//! - Connection failures, timeouts, 429, and 5xx responses are retried
//! - Any other status is returned to the caller as a normal response; the
//!   caller decides what a 404 means
//! - The final attempt's error is propagated, never swallowed
//!
//! The delay is deliberate politeness toward the upstream host, not an
//! incidental cost. It applies even when the caller discards the body.

use reqwest::{Client, Response, StatusCode};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Errors surfaced by [`Fetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("could not build HTTP client: {0}")]
    Client(reqwest::Error),
    /// Every attempt for a request failed; carries the last error.
    #[error("request for {url} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        url: String,
        attempts: usize,
        source: reqwest::Error,
    },
}

/// Errors surfaced by [`Fetcher::download`].
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("download of {url} returned status {status}")]
    BadStatus { url: String, status: StatusCode },
    #[error("failed reading download body: {0}")]
    Body(reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The sole network I/O primitive used by the crawl.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    /// Fixed delay applied after each successful request.
    delay: Duration,
    /// Maximum attempts per request.
    max_retries: usize,
}

impl Fetcher {
    /// Build a fetcher with the given identity string, timeout, rate-limit
    /// delay, and retry bound.
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        delay: Duration,
        max_retries: usize,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            delay,
            max_retries: max_retries.max(1),
        })
    }

    /// GET a URL, retrying transient failures.
    ///
    /// Non-retryable statuses (including 404) are returned as normal
    /// responses for the caller to interpret. After the response arrives the
    /// configured delay is awaited before returning, so callers never need
    /// to pace themselves.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, url: &str) -> Result<Response, FetchError> {
        let t0 = Instant::now();

        for attempt in 1..=self.max_retries {
            match self.client.get(url).send().await {
                Ok(response) if !retryable_status(response.status()) => {
                    debug!(
                        status = %response.status(),
                        attempt,
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "GET completed"
                    );
                    sleep(self.delay).await;
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    if attempt == self.max_retries {
                        // error_for_status always errors for retryable codes
                        return match response.error_for_status() {
                            Ok(response) => Ok(response),
                            Err(source) => Err(FetchError::RetriesExhausted {
                                url: url.to_string(),
                                attempts: attempt,
                                source,
                            }),
                        };
                    }
                    warn!(
                        %status,
                        attempt,
                        max = self.max_retries,
                        "retryable status; backing off"
                    );
                    sleep(self.delay * 2).await;
                }
                Err(e) => {
                    if attempt == self.max_retries {
                        warn!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms = t0.elapsed().as_millis() as u64,
                            error = %e,
                            "GET exhausted retries"
                        );
                        return Err(FetchError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            source: e,
                        });
                    }
                    warn!(
                        attempt,
                        max = self.max_retries,
                        error = %e,
                        "GET attempt failed; backing off"
                    );
                    sleep(self.delay * 2).await;
                }
            }
        }

        unreachable!("max_retries is clamped to at least 1");
    }

    /// Lightweight existence check via HEAD, used for frontier probing.
    ///
    /// Any transport error counts as "does not exist". The same
    /// inter-request delay applies: probing is rate-limited like every
    /// other request.
    #[instrument(level = "debug", skip(self))]
    pub async fn exists(&self, url: &str) -> bool {
        let result = self.client.head(url).send().await;
        sleep(self.delay).await;
        match result {
            Ok(response) => {
                debug!(status = %response.status(), "HEAD probe");
                response.status().is_success()
            }
            Err(e) => {
                debug!(error = %e, "HEAD probe failed");
                false
            }
        }
    }

    /// Download a PDF into `dir` as `w{id}.pdf`.
    ///
    /// A one-shot byte download reusing [`Fetcher::get`]; it carries no
    /// crawl logic of its own.
    #[instrument(level = "info", skip(self, dir))]
    pub async fn download(&self, pdf_url: &str, id: u64, dir: &Path) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(dir).await?;

        let response = self.get(pdf_url).await?;
        if !response.status().is_success() {
            return Err(DownloadError::BadStatus {
                url: pdf_url.to_string(),
                status: response.status(),
            });
        }

        let bytes = response.bytes().await.map_err(DownloadError::Body)?;
        let path = dir.join(format!("w{id}.pdf"));
        tokio::fs::write(&path, &bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "downloaded PDF");
        Ok(path)
    }
}

fn retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
