//! Paper-page extraction: one fetched page in, one structured record out.
//!
//! Extraction combines two kinds of sources, in priority order:
//!
//! 1. **Structured metadata**: Highwire `citation_*` meta tags carry the
//!    title, authors, DOI, publication date, and PDF URL. Each field is
//!    independently optional.
//! 2. **Abstract cascade**: an ordered list of CSS selectors for the known
//!    abstract containers; the first non-empty text wins. When every
//!    selector misses (page templates are not fully uniform), a bounded
//!    pattern search over the page's visible text is the last resort.
//!
//! Extraction failures for one paper never abort the scan. The outcome of
//! every attempt is an [`Extraction`] value, so the crawl controller can
//! react per kind instead of collapsing everything into one fallback branch.

use crate::fetcher::Fetcher;
use crate::frontier::{self, ProbeWindow};
use crate::models::{paper_url, Paper};
use crate::utils::truncate_for_log;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Outcome of one extraction attempt.
///
/// Only `Paper` resets the crawl's consecutive-failure streak; the other
/// three variants all advance it, but are logged and reported distinctly.
#[derive(Debug)]
pub enum Extraction {
    /// The page existed and parsed into a record.
    Paper(Box<Paper>),
    /// No paper exists at this number (404). Not an error.
    NotFound,
    /// The fetch failed after exhausting retries.
    NetworkFailed,
    /// The page came back in a shape we could not use.
    ParseFailed,
}

/// A source of papers the crawl controller can drive.
///
/// The live implementation is [`Extractor`]; tests drive the controller
/// with scripted sources instead of the network.
pub trait PaperSource {
    /// Find the newest existing paper number to start scanning from.
    async fn locate_frontier(&self) -> u64;
    /// Fetch and parse the paper page for `id`.
    async fn extract(&self, id: u64) -> Extraction;
    /// Best-effort side download of an accepted paper's PDF.
    async fn download(&self, pdf_url: &str, id: u64) -> bool;
}

/// Live [`PaperSource`] backed by HTTP and the repository's page templates.
#[derive(Debug)]
pub struct Extractor {
    fetcher: Fetcher,
    base_url: String,
    probe: ProbeWindow,
    download_dir: PathBuf,
}

impl Extractor {
    pub fn new(
        fetcher: Fetcher,
        base_url: impl Into<String>,
        probe: ProbeWindow,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            probe,
            download_dir,
        }
    }
}

impl PaperSource for Extractor {
    async fn locate_frontier(&self) -> u64 {
        frontier::locate_frontier(&self.fetcher, &self.base_url, &self.probe).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn extract(&self, id: u64) -> Extraction {
        let url = paper_url(&self.base_url, id);

        let response = match self.fetcher.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(id, error = %e, "network failure while fetching paper page");
                return Extraction::NetworkFailed;
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            debug!(id, "no paper at this number");
            return Extraction::NotFound;
        }
        if !status.is_success() {
            warn!(id, %status, "unexpected status for paper page");
            return Extraction::ParseFailed;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(id, error = %e, "failed reading paper page body");
                return Extraction::NetworkFailed;
            }
        };

        let paper = parse_paper(id, &url, &body);
        info!(
            id,
            title = %truncate_for_log(paper.title.as_deref().unwrap_or("<untitled>"), 100),
            has_abstract = paper.abstract_text.is_some(),
            "extracted paper"
        );
        Extraction::Paper(Box::new(paper))
    }

    async fn download(&self, pdf_url: &str, id: u64) -> bool {
        match self.fetcher.download(pdf_url, id, &self.download_dir).await {
            Ok(path) => {
                info!(id, path = %path.display(), "PDF saved");
                true
            }
            Err(e) => {
                error!(id, pdf_url, error = %e, "PDF download failed");
                false
            }
        }
    }
}

/// Known abstract containers, most specific first.
const ABSTRACT_SELECTORS: [&str; 7] = [
    "div.page-header__intro",
    "div.page-header__intro--centered",
    "div.abstract-content",
    "div.abstract",
    r#"div[class*="abstract"]"#,
    "p.abstract",
    "section.abstract",
];

static ABSTRACT_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^abstract:?\s*").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static ABSTRACT_FALLBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)abstract:?\s*(.{100,2000}?)(?:\n\n|\r\n\r\n|JEL|Keywords|$)").unwrap()
});

/// Parse a fetched paper page into a record.
///
/// Pure function over the page text; never fails. Missing fields stay
/// `None`.
pub fn parse_paper(id: u64, url: &str, html: &str) -> Paper {
    let document = Html::parse_document(html);
    Paper {
        id,
        url: url.to_string(),
        title: meta_content(&document, "citation_title"),
        authors: meta_contents(&document, "citation_author"),
        abstract_text: abstract_from_selectors(&document)
            .or_else(|| abstract_from_text(&document)),
        pdf_url: meta_content(&document, "citation_pdf_url")
            .and_then(|raw| resolve_url(url, &raw)),
        publication_date: meta_content(&document, "citation_publication_date"),
        doi: meta_content(&document, "citation_doi"),
        extracted_at: Utc::now(),
    }
}

/// First non-empty `content` attribute among meta tags with this name.
fn meta_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[name="{name}"]"#)).ok()?;
    document
        .select(&selector)
        .find_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// All non-empty `content` attributes among meta tags with this name, in
/// document order.
fn meta_contents(document: &Html, name: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(&format!(r#"meta[name="{name}"]"#)) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .collect()
}

/// Strip the leading "Abstract" label and collapse whitespace runs.
fn clean_abstract(text: &str) -> Option<String> {
    let collapsed = WHITESPACE_RUNS.replace_all(text.trim(), " ");
    let stripped = ABSTRACT_LABEL.replace(&collapsed, "");
    let cleaned = stripped.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Try the known abstract containers in order; first non-empty text wins.
fn abstract_from_selectors(document: &Html) -> Option<String> {
    ABSTRACT_SELECTORS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        let element = document.select(&selector).next()?;
        let text = element.text().collect::<Vec<_>>().join(" ");
        clean_abstract(&text)
    })
}

/// Last resort: pattern search over the page's visible text.
///
/// Looks for text following the word "Abstract", bounded to 100–2000
/// characters and terminated by a paragraph break or a JEL/Keywords
/// marker. Failure here leaves the abstract unset; it is not an error.
fn abstract_from_text(document: &Html) -> Option<String> {
    let text = visible_text(document, "main").or_else(|| visible_text(document, "body"))?;
    let captures = ABSTRACT_FALLBACK.captures(&text)?;
    clean_abstract(captures.get(1)?.as_str())
}

fn visible_text(document: &Html, root: &str) -> Option<String> {
    let selector = Selector::parse(root).ok()?;
    let element = document.select(&selector).next()?;
    Some(element.text().collect::<Vec<_>>().join("\n"))
}

/// Resolve a possibly-relative PDF URL against the page it came from.
fn resolve_url(page_url: &str, raw: &str) -> Option<String> {
    match Url::parse(raw) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(_) => Url::parse(page_url)
            .ok()?
            .join(raw)
            .ok()
            .map(|resolved| resolved.to_string()),
    }
}
