//! Summary statistics over a set of extracted papers.
//!
//! Consumes result files written by the crawl and produces the numbers the
//! `analyze` command prints: field coverage, author counts, abstract
//! lengths, top authors, common keywords, and papers per year. Everything
//! here is pure over the loaded records.

use crate::models::Paper;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// Words too generic to count as keywords.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "this", "that", "with", "from", "they", "have", "been", "their", "are", "was",
        "were", "will", "would", "could", "should", "may", "might", "can", "does", "did", "has",
        "had", "also", "more", "most", "some", "any", "and", "but", "for", "not", "you", "all",
        "each", "one", "two", "both", "between", "among", "within", "without", "through",
        "during", "before", "after", "above", "below", "into", "onto", "upon", "over", "under",
        "paper", "study", "research", "analysis", "data", "results", "find", "found", "show",
        "shows", "using", "used", "use", "based", "approach",
    ]
    .into_iter()
    .collect()
});

static WORDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]+\b").unwrap());
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// Word-length statistics over the abstracts that exist.
#[derive(Debug, PartialEq)]
pub struct AbstractWordStats {
    pub min: usize,
    pub avg: f64,
    pub max: usize,
}

/// Headline numbers for a result set.
#[derive(Debug)]
pub struct SummaryStats {
    pub total: usize,
    pub with_title: usize,
    pub with_abstract: usize,
    pub with_pdf: usize,
    pub with_authors: usize,
    pub with_date: usize,
    pub total_authors: usize,
    pub unique_authors: usize,
    pub avg_authors_per_paper: f64,
    /// `None` when no paper carries an abstract.
    pub abstract_words: Option<AbstractWordStats>,
}

/// Compute the headline numbers for a result set.
pub fn summary(papers: &[Paper]) -> SummaryStats {
    let total = papers.len();
    let all_authors: Vec<&String> = papers.iter().flat_map(|p| p.authors.iter()).collect();
    let unique_authors = all_authors.iter().map(|a| a.as_str()).unique().count();

    let word_counts: Vec<usize> = papers
        .iter()
        .filter_map(|p| p.abstract_text.as_deref())
        .map(|text| text.split_whitespace().count())
        .collect();
    let abstract_words = (!word_counts.is_empty()).then(|| AbstractWordStats {
        min: *word_counts.iter().min().unwrap(),
        avg: word_counts.iter().sum::<usize>() as f64 / word_counts.len() as f64,
        max: *word_counts.iter().max().unwrap(),
    });

    SummaryStats {
        total,
        with_title: papers.iter().filter(|p| p.title.is_some()).count(),
        with_abstract: papers.iter().filter(|p| p.abstract_text.is_some()).count(),
        with_pdf: papers.iter().filter(|p| p.pdf_url.is_some()).count(),
        with_authors: papers.iter().filter(|p| !p.authors.is_empty()).count(),
        with_date: papers.iter().filter(|p| p.publication_date.is_some()).count(),
        total_authors: all_authors.len(),
        unique_authors,
        avg_authors_per_paper: if total == 0 {
            0.0
        } else {
            all_authors.len() as f64 / total as f64
        },
        abstract_words,
    }
}

/// Most prolific authors, by accepted-paper count.
///
/// Ties break alphabetically so the output is deterministic.
pub fn top_authors(papers: &[Paper], n: usize) -> Vec<(String, usize)> {
    papers
        .iter()
        .flat_map(|p| p.authors.iter().cloned())
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .take(n)
        .collect()
}

/// Most frequent abstract words of at least `min_length` letters, stop
/// words excluded.
pub fn top_keywords(papers: &[Paper], n: usize, min_length: usize) -> Vec<(String, usize)> {
    papers
        .iter()
        .filter_map(|p| p.abstract_text.as_deref())
        .flat_map(|text| {
            WORDS
                .find_iter(text)
                .map(|m| m.as_str().to_lowercase())
                .collect::<Vec<_>>()
        })
        .filter(|word| word.len() >= min_length && !STOP_WORDS.contains(word.as_str()))
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .take(n)
        .collect()
}

/// Paper counts per publication year, ascending by year.
///
/// Years are pulled out of the raw date strings, so any recognizable
/// four-digit year counts even when the full date would not parse.
pub fn papers_by_year(papers: &[Paper]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for paper in papers {
        if let Some(date) = paper.publication_date.as_deref() {
            if let Some(m) = YEAR.find(date) {
                *counts.entry(m.as_str().to_string()).or_default() += 1;
            }
        }
    }
    counts.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn paper(id: u64, authors: &[&str], abstract_text: Option<&str>, date: Option<&str>) -> Paper {
        Paper {
            id,
            url: format!("https://www.nber.org/papers/w{id}"),
            title: Some(format!("Paper {id}")),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            abstract_text: abstract_text.map(str::to_string),
            pdf_url: None,
            publication_date: date.map(str::to_string),
            doi: None,
            extracted_at: Utc::now(),
        }
    }

    fn sample() -> Vec<Paper> {
        vec![
            paper(
                1,
                &["Ada Lovelace", "Alan Turing"],
                Some("Wage dynamics under automation pressure."),
                Some("2022/05/01"),
            ),
            paper(
                2,
                &["Ada Lovelace"],
                Some("Automation and wage inequality in manufacturing."),
                Some("2022-09-15"),
            ),
            paper(3, &[], None, Some("2023/01/20")),
        ]
    }

    #[test]
    fn test_summary_counts() {
        let stats = summary(&sample());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_abstract, 2);
        assert_eq!(stats.with_authors, 2);
        assert_eq!(stats.with_date, 3);
        assert_eq!(stats.total_authors, 3);
        assert_eq!(stats.unique_authors, 2);
        assert!((stats.avg_authors_per_paper - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_abstract_words() {
        let stats = summary(&sample());
        let words = stats.abstract_words.unwrap();
        assert_eq!(words.min, 5);
        assert_eq!(words.max, 6);
        assert!((words.avg - 5.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_empty_set() {
        let stats = summary(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.avg_authors_per_paper, 0.0);
        assert!(stats.abstract_words.is_none());
    }

    #[test]
    fn test_top_authors_orders_by_count_then_name() {
        let top = top_authors(&sample(), 10);
        assert_eq!(top[0], ("Ada Lovelace".to_string(), 2));
        assert_eq!(top[1], ("Alan Turing".to_string(), 1));
    }

    #[test]
    fn test_top_keywords_skips_stop_words_and_short_words() {
        let top = top_keywords(&sample(), 10, 4);
        let words: Vec<&str> = top.iter().map(|(w, _)| w.as_str()).collect();
        assert!(words.contains(&"automation"));
        assert!(words.contains(&"wage"));
        // "and"/"under" style words are either stop-listed or too short
        assert!(!words.contains(&"and"));
        assert_eq!(top.iter().find(|(w, _)| w == "automation").unwrap().1, 2);
    }

    #[test]
    fn test_papers_by_year() {
        let years = papers_by_year(&sample());
        assert_eq!(
            years,
            vec![("2022".to_string(), 2), ("2023".to_string(), 1)]
        );
    }
}
