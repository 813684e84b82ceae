//! Extraction adapter: PDF text layer or OCR, chosen by document kind.

use async_trait::async_trait;
use bytes::Bytes;

use crate::document::DocumentKind;
use crate::error::{Error, Result};
use crate::ocr::OcrHandle;
use crate::pdf;
use crate::progress::{ProgressReporter, ProgressStage};

/// Extracted text shorter than this counts as "no text found".
pub const MIN_EXTRACTED_CHARS: usize = 10;

/// Converts a source file into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(
        &self,
        kind: DocumentKind,
        file: Bytes,
        progress: &ProgressReporter,
    ) -> Result<String>;

    /// Release long-lived resources. Called on application teardown only.
    async fn shutdown(&self) {}
}

/// Default extractor: lopdf for PDFs, the OCR handle for images.
#[derive(Clone)]
pub struct DocumentExtractor {
    ocr: OcrHandle,
}

impl DocumentExtractor {
    pub fn new(ocr: OcrHandle) -> Self {
        Self { ocr }
    }

    pub fn ocr(&self) -> &OcrHandle {
        &self.ocr
    }

    /// Extract the text layer of a PDF.
    pub async fn extract_pdf(&self, file: Bytes, progress: &ProgressReporter) -> Result<String> {
        extract_pdf_text(file, progress)
            .await
            .map_err(|e| Error::extraction(format!("Failed to extract text from PDF: {}", e)))
    }

    /// Recognize the text in an image.
    pub async fn extract_image(&self, file: Bytes, progress: &ProgressReporter) -> Result<String> {
        self.recognize_image(file, progress)
            .await
            .map_err(|e| Error::extraction(format!("Failed to extract text from image: {}", e)))
    }

    async fn recognize_image(&self, file: Bytes, progress: &ProgressReporter) -> anyhow::Result<String> {
        let format = image::guess_format(&file)
            .map_err(|_| anyhow::anyhow!("Unrecognized image format"))?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");

        progress.report(ProgressStage::OcrProcessing, 10, "Initializing OCR engine...");
        progress.report(ProgressStage::OcrProcessing, 30, "Processing image...");

        let text = self.ocr.recognize(&file, extension).await?;

        progress.report(ProgressStage::OcrProcessing, 100, "OCR processing completed");

        let text = text.trim();
        if text.chars().count() < MIN_EXTRACTED_CHARS {
            anyhow::bail!(
                "No readable text found in the image. Please ensure the image contains clear, readable text."
            );
        }

        tracing::debug!(chars = text.len(), format = ?format, "OCR complete");
        Ok(text.to_string())
    }
}

async fn extract_pdf_text(file: Bytes, progress: &ProgressReporter) -> anyhow::Result<String> {
    progress.report(ProgressStage::PdfParsing, 10, "Reading PDF file...");
    progress.report(ProgressStage::PdfParsing, 50, "Extracting text from PDF...");

    // PDF parsing is CPU-bound
    let extracted = tokio::task::spawn_blocking(move || pdf::extract_text_from_bytes(&file))
        .await
        .map_err(|e| anyhow::anyhow!("PDF worker failed: {}", e))??;

    progress.report(ProgressStage::PdfParsing, 90, "Processing extracted text...");

    if extracted.text.chars().count() < MIN_EXTRACTED_CHARS {
        anyhow::bail!(
            "No readable text found in PDF. The document might be scanned or image-based."
        );
    }

    progress.report(ProgressStage::PdfParsing, 100, "PDF text extraction completed");

    tracing::debug!(
        pages = extracted.page_count,
        chars = extracted.text.len(),
        "PDF text extracted"
    );

    Ok(extracted.text)
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(
        &self,
        kind: DocumentKind,
        file: Bytes,
        progress: &ProgressReporter,
    ) -> Result<String> {
        match kind {
            DocumentKind::Pdf => self.extract_pdf(file, progress).await,
            DocumentKind::Image => self.extract_image(file, progress).await,
        }
    }

    async fn shutdown(&self) {
        if let Err(e) = self.ocr.shutdown().await {
            tracing::warn!(error = %e, "Failed to shut down OCR engine");
        }
    }
}
