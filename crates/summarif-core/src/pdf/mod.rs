//! PDF text-layer extraction (lopdf)

mod extractor;

pub use extractor::{extract_text_from_bytes, ExtractedPdf};

#[cfg(test)]
pub(crate) use extractor::tests::create_multipage_pdf;
