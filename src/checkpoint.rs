//! Checkpoint writes for the accepted-record set.
//!
//! A checkpoint is a full snapshot: each write replaces the file with the
//! complete result set at that moment, so a half-finished run always leaves
//! behind one coherent file rather than a partial append log. Non-ASCII
//! text is written verbatim.

use crate::models::Paper;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize the full result set to `path`, overwriting any existing file.
///
/// Creates the parent directory when needed.
#[instrument(level = "info", skip(papers), fields(path = %path.display(), count = papers.len()))]
pub async fn save(papers: &[Paper], path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let json = serde_json::to_string_pretty(papers)?;
    fs::write(path, json).await?;
    info!("wrote checkpoint");
    Ok(())
}

/// Read a result set back from a checkpoint file.
///
/// Used by the analyze command and anything else consuming result files.
pub async fn load(path: &Path) -> Result<Vec<Paper>, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}
