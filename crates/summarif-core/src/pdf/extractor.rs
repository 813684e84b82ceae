use anyhow::{Context, Result};

/// Result of reading the text layer of a PDF
#[derive(Debug, Clone)]
pub struct ExtractedPdf {
    /// Page texts joined with single spaces, trimmed
    pub text: String,
    /// Number of pages in the PDF
    pub page_count: usize,
}

/// Extract text from PDF bytes already in memory.
///
/// Pages are visited in order from 1 to the page count. Within a page the
/// recovered text fragments are joined with single spaces, and pages are
/// joined the same way.
pub fn extract_text_from_bytes(pdf_bytes: &[u8]) -> Result<ExtractedPdf> {
    let doc = lopdf::Document::load_mem(pdf_bytes).context("Failed to parse PDF")?;

    let mut pages: Vec<u32> = doc.get_pages().keys().cloned().collect();
    pages.sort();
    let page_count = pages.len();

    let mut page_texts = Vec::with_capacity(page_count);
    for page_num in &pages {
        // A page whose content can't be decoded contributes nothing
        let raw = doc.extract_text(&[*page_num]).unwrap_or_default();
        page_texts.push(join_fragments(&raw));
    }

    let text = page_texts.join(" ").trim().to_string();

    tracing::debug!(chars = text.len(), page_count, "Extracted PDF text layer");

    Ok(ExtractedPdf { text, page_count })
}

fn join_fragments(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
