//! Summarif Core - Business logic for document summarization
//!
//! This crate contains all the core functionality for Summarif, including:
//! - Upload validation and document model
//! - PDF text extraction (lopdf) and image OCR (tesseract)
//! - Summarization through the Gemini API
//! - Per-document workflow with single-slot progress reporting

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod extract;
pub mod ocr;
pub mod pdf;
pub mod progress;
pub mod summarize;
pub mod workflow;

use std::sync::Arc;

pub use config::{Config, Settings};
pub use document::{Document, DocumentKind, DocumentStatus, SummaryLength, SummaryOptions, SummaryStyle, Upload};
pub use error::{Error, Result};
pub use extract::{DocumentExtractor, TextExtractor};
pub use ocr::OcrHandle;
pub use progress::{CurrentStatus, ProgressEvent, ProgressStage};
pub use summarize::{GeminiClient, Summarizer};
pub use workflow::{DocumentStats, WorkflowController};

/// Application state shared by every front end
pub struct AppState {
    pub config: Config,
    pub controller: WorkflowController,
}

impl AppState {
    /// Build the production stack: lopdf + tesseract extraction and a Gemini
    /// client keyed from the first credential source that has a value.
    pub fn new(config: Config) -> Self {
        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            tracing::warn!("No Gemini API key configured; summaries will fail until one is set");
        }

        let summarizer = GeminiClient::new(api_key)
            .with_base_url(config.api_base_url.clone())
            .with_model(config.model.clone());
        let extractor = DocumentExtractor::new(OcrHandle::tesseract());

        tracing::info!(model = %summarizer.model(), "Summarif core initialized");

        Self {
            controller: WorkflowController::new(Arc::new(extractor), Arc::new(summarizer)),
            config,
        }
    }

    /// Release long-lived resources before exit.
    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
    }
}
