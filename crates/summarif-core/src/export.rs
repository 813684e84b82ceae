//! Writing completed summaries to disk.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::document::Document;

/// `report.pdf` -> `report-summary.txt`
pub fn summary_file_name(document_name: &str) -> String {
    let stem = Path::new(document_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("{}-summary.txt", stem)
}

/// Write the document's summary into `dir`. Returns the written path.
pub async fn write_summary(dir: &Path, document: &Document) -> anyhow::Result<PathBuf> {
    let summary = document
        .summary
        .as_deref()
        .with_context(|| format!("Document {} has no summary", document.name))?;

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(summary_file_name(&document.name));
    tokio::fs::write(&path, summary)
        .await
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;

    tracing::debug!(path = %path.display(), "Summary exported");
    Ok(path)
}
