//! Data models for working papers and crawl results.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Paper`]: One extracted working-paper record
//! - [`paper_url`]: The canonical page URL for a paper number
//!
//! A [`Paper`] is immutable once constructed: it is either accepted into the
//! result set or discarded. No partially populated records are kept around.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A working paper extracted from its repository page.
///
/// Every metadata field except `id` and `url` is optional: repository pages
/// are not fully uniform, and a paper with a missing abstract or date is
/// still a valid record. Authors keep the order they appear in on the page.
///
/// # Serialization
///
/// Records serialize to JSON with `abstract_text` renamed to `abstract`,
/// matching the field name used by downstream consumers of the result files.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Paper {
    /// The paper number within the repository.
    pub id: u64,
    /// The page URL this record was extracted from.
    pub url: String,
    /// The paper title, from structured metadata.
    pub title: Option<String>,
    /// Author names in source order. May be empty.
    pub authors: Vec<String>,
    /// The abstract, whitespace-normalized and stripped of its leading label.
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Direct URL of the paper's PDF, when the page advertises one.
    pub pdf_url: Option<String>,
    /// Publication date as printed on the page (`YYYY/MM/DD` or `YYYY-MM-DD`).
    pub publication_date: Option<String>,
    /// The paper's DOI, when the page advertises one.
    pub doi: Option<String>,
    /// When this record was extracted. Set once, never mutated.
    pub extracted_at: DateTime<Utc>,
}

/// Build the page URL for a paper number.
///
/// The repository addresses papers with a single path template parameterized
/// by the paper number: `{base}/papers/w{id}`.
pub fn paper_url(base_url: &str, id: u64) -> String {
    format!("{}/papers/w{}", base_url.trim_end_matches('/'), id)
}
