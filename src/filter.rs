//! Acceptance filtering for extracted papers.
//!
//! Two independent predicates decide whether a paper enters the result set:
//! a topic match over title and abstract, and an optional publication-date
//! window. Both must pass.
//!
//! Date filtering is advisory and fails open: a paper with a missing or
//! unparseable date always passes, and a bound that itself fails to parse is
//! dropped rather than rejecting records.

use crate::models::Paper;
use chrono::NaiveDate;
use regex::Regex;
use tracing::warn;

/// Terms a query of `ai` expands to, each matched as a whole word.
const AI_SYNONYMS: [&str; 6] = [
    "ai",
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "neural network",
    "algorithm",
];

/// Whole-word topic matcher, compiled once per crawl.
///
/// An empty query matches everything. The reserved query `ai` (any case)
/// expands to [`AI_SYNONYMS`]; any other query is matched as a single
/// whole-word pattern with regex metacharacters escaped, so `c++` or
/// `r&d` are safe inputs. Matching is case-insensitive against the title
/// first, then the abstract; either field matching is sufficient.
#[derive(Debug)]
pub struct TopicFilter {
    patterns: Vec<Regex>,
}

impl TopicFilter {
    pub fn new(query: &str) -> Self {
        let query = query.trim().to_lowercase();
        let patterns = if query.is_empty() {
            Vec::new()
        } else if query == "ai" {
            AI_SYNONYMS.iter().map(|term| whole_word(term)).collect()
        } else {
            vec![whole_word(&regex::escape(&query))]
        };
        Self { patterns }
    }

    /// Whether the paper's title or abstract matches the query.
    ///
    /// Pure function of the compiled query and the record: calling it twice
    /// with the same inputs yields the same result.
    pub fn matches(&self, paper: &Paper) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        [paper.title.as_deref(), paper.abstract_text.as_deref()]
            .into_iter()
            .flatten()
            .any(|text| self.patterns.iter().any(|pattern| pattern.is_match(text)))
    }
}

fn whole_word(term: &str) -> Regex {
    // term is either a fixed synonym or an escaped query, always valid
    Regex::new(&format!(r"(?i)\b{term}\b")).unwrap()
}

/// Inclusive publication-date window.
///
/// Bounds accept `YYYY/MM/DD` or `YYYY-MM-DD`; a bound in neither format is
/// ignored with a warning.
#[derive(Debug, Default)]
pub struct DateWindow {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.and_then(|raw| parse_bound(raw, "start")),
            end: end.and_then(|raw| parse_bound(raw, "end")),
        }
    }

    /// Whether the paper's publication date falls inside the window.
    ///
    /// Papers with no parseable date pass: absence of data is not grounds
    /// for rejection.
    pub fn contains(&self, paper: &Paper) -> bool {
        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Some(raw) = paper.publication_date.as_deref() else {
            return true;
        };
        let Some(date) = parse_date(raw) else {
            return true;
        };
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        true
    }
}

/// Parse a date in either accepted textual format.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let format = if raw.contains('/') {
        "%Y/%m/%d"
    } else if raw.contains('-') {
        "%Y-%m-%d"
    } else {
        return None;
    };
    NaiveDate::parse_from_str(raw, format).ok()
}

fn parse_bound(raw: &str, which: &str) -> Option<NaiveDate> {
    let parsed = parse_date(raw);
    if parsed.is_none() {
        warn!(bound = which, value = raw, "unparseable date bound ignored");
    }
    parsed
}
