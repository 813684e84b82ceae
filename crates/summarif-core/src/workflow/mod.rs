//! Document workflow controller.
//!
//! # State machine
//!
//! ```text
//! add_document()
//!       │
//!       ▼
//!  extracting ──fail──► error ◄──fail── summarizing
//!       │                 │                 ▲   │
//!       ▼                 │ retry()         │   ▼
//!   extracted ────────────┼── summarize() ──┘ completed
//!                         └─► re-enters the stage that failed
//! ```
//!
//! `delete()` removes a document in any state. Work in flight for it is not
//! cancelled; its result is discarded when it arrives (see [`arena`]).
//!
//! The arena lock is never held across an extraction or summarization, so
//! documents progress independently.

pub mod arena;

use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::document::{Document, DocumentKind, DocumentStatus, Stage, SummaryOptions, Upload};
use crate::error::{Error, Result};
use crate::extract::TextExtractor;
use crate::progress::{CurrentStatus, StatusBoard};
use crate::summarize::Summarizer;

use arena::{DocumentArena, Ticket};

/// Aggregate counts for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total: usize,
    pub completed: usize,
    /// `extracting` + `summarizing`
    pub in_progress: usize,
    pub errors: usize,
}

/// Fresh opaque document identifier.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Owns the documents and drives them through extraction and summarization.
#[derive(Clone)]
pub struct WorkflowController {
    documents: Arc<RwLock<DocumentArena>>,
    options: Arc<RwLock<SummaryOptions>>,
    extractor: Arc<dyn TextExtractor>,
    summarizer: Arc<dyn Summarizer>,
    status: StatusBoard,
}

impl WorkflowController {
    pub fn new(extractor: Arc<dyn TextExtractor>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            documents: Arc::new(RwLock::new(DocumentArena::new())),
            options: Arc::new(RwLock::new(SummaryOptions::default())),
            extractor,
            summarizer,
            status: StatusBoard::new(),
        }
    }

    /// Global options applied to the next operation.
    pub async fn options(&self) -> SummaryOptions {
        *self.options.read().await
    }

    /// Change the global options. Existing documents keep their snapshot.
    pub async fn set_options(&self, options: SummaryOptions) {
        *self.options.write().await = options;
    }

    /// Create a document from an upload and extract its text.
    ///
    /// Returns `Validation` without creating anything if the upload is
    /// rejected or `id` is already live. Extraction failures do not fail
    /// this call; they leave the document in `error`. Returns once
    /// extraction has finished.
    pub async fn add_document(&self, id: impl Into<String>, upload: Upload) -> Result<String> {
        let id = id.into();
        let kind = upload.validate()?;
        let options = self.options().await;

        let document = Document::new(id.clone(), upload, kind, options);
        let name = document.name.clone();
        let file = document.file.clone();

        let ticket = self
            .documents
            .write()
            .await
            .insert(document)
            .ok_or_else(|| Error::validation(format!("Document id already in use: {}", id)))?;

        info!(doc_id = %id, name = %name, kind = %kind, "Document added");

        self.run_extraction(ticket, kind, name, file).await;
        Ok(id)
    }

    /// Add several uploads at once. Extractions run concurrently; results are
    /// in input order.
    pub async fn add_documents(&self, uploads: Vec<(String, Upload)>) -> Vec<Result<String>> {
        join_all(
            uploads
                .into_iter()
                .map(|(id, upload)| self.add_document(id, upload)),
        )
        .await
    }

    /// Summarize an `extracted` document with the current global options.
    ///
    /// Summarization failures leave the document in `error` and do not fail
    /// this call.
    pub async fn summarize(&self, id: &str) -> Result<()> {
        let options = self.options().await;
        let (ticket, name, text) = {
            let mut documents = self.documents.write().await;
            let ticket = documents.ticket(id).ok_or_else(|| Error::not_found(id))?;
            let doc = documents
                .get_mut(id)
                .ok_or_else(|| Error::not_found(id))?;

            if doc.status != DocumentStatus::Extracted {
                return Err(Error::InvalidTransition {
                    id: id.to_string(),
                    status: doc.status,
                    action: "summarize",
                });
            }

            let text = begin_summarizing(doc, options);
            (ticket, doc.name.clone(), text)
        };

        self.run_summarization(ticket, name, text, options).await;
        Ok(())
    }

    /// Re-run the stage that put a document into `error`.
    pub async fn retry(&self, id: &str) -> Result<()> {
        let options = self.options().await;
        let work = {
            let mut documents = self.documents.write().await;
            let ticket = documents.ticket(id).ok_or_else(|| Error::not_found(id))?;
            let doc = documents
                .get_mut(id)
                .ok_or_else(|| Error::not_found(id))?;

            if doc.status != DocumentStatus::Error {
                return Err(Error::InvalidTransition {
                    id: id.to_string(),
                    status: doc.status,
                    action: "retry",
                });
            }

            match doc.failed_stage {
                Some(Stage::Summarize) => {
                    let text = begin_summarizing(doc, options);
                    RetryWork::Summarize {
                        ticket,
                        name: doc.name.clone(),
                        text,
                    }
                }
                Some(Stage::Extract) | None => {
                    doc.status = DocumentStatus::Extracting;
                    doc.error = None;
                    doc.failed_stage = None;
                    RetryWork::Extract {
                        ticket,
                        kind: doc.kind,
                        name: doc.name.clone(),
                        file: doc.file.clone(),
                    }
                }
            }
        };

        info!(doc_id = %id, "Retrying failed stage");

        match work {
            RetryWork::Extract {
                ticket,
                kind,
                name,
                file,
            } => self.run_extraction(ticket, kind, name, file).await,
            RetryWork::Summarize { ticket, name, text } => {
                self.run_summarization(ticket, name, text, options).await
            }
        }
        Ok(())
    }

    /// Remove a document in any state. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> bool {
        let removed = self.documents.write().await.remove(id);
        if let Some(doc) = &removed {
            info!(doc_id = %id, status = %doc.status, "Document deleted");
        }
        removed.is_some()
    }

    /// Remove every document and clear the current status.
    pub async fn reset(&self) {
        self.documents.write().await.clear();
        self.status.reset();
        info!("Workflow reset");
    }

    pub async fn get(&self, id: &str) -> Option<Document> {
        self.documents.read().await.get(id).cloned()
    }

    /// All documents, newest first.
    pub async fn documents(&self) -> Vec<Document> {
        self.documents
            .read()
            .await
            .newest_first()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Documents to render: everything except those still extracting.
    pub async fn visible_documents(&self) -> Vec<Document> {
        self.documents
            .read()
            .await
            .newest_first()
            .into_iter()
            .filter(|d| d.status != DocumentStatus::Extracting)
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> DocumentStats {
        let documents = self.documents.read().await;
        let mut stats = DocumentStats {
            total: documents.len(),
            ..Default::default()
        };
        for doc in documents.iter() {
            match doc.status {
                DocumentStatus::Completed => stats.completed += 1,
                DocumentStatus::Error => stats.errors += 1,
                status if status.is_in_progress() => stats.in_progress += 1,
                _ => {}
            }
        }
        stats
    }

    pub fn current_status(&self) -> Option<CurrentStatus> {
        self.status.current()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Option<CurrentStatus>> {
        self.status.subscribe()
    }

    /// Release the extractor's long-lived resources (the OCR engine).
    pub async fn shutdown(&self) {
        self.extractor.shutdown().await;
        info!("Workflow shut down");
    }

    async fn run_extraction(&self, ticket: Ticket, kind: DocumentKind, name: String, file: Bytes) {
        let reporter = self.status.begin(&ticket.id, &name);
        let result = self.extractor.extract(kind, file, &reporter).await;
        self.status.finish(&reporter);

        let mut documents = self.documents.write().await;
        let Some(doc) = documents.resolve_mut(&ticket) else {
            debug!(doc_id = %ticket.id, "Discarding extraction result for deleted document");
            return;
        };

        match result {
            Ok(text) => {
                info!(doc_id = %ticket.id, chars = text.len(), "Text extracted");
                doc.text = Some(text);
                doc.status = DocumentStatus::Extracted;
            }
            Err(e) => {
                warn!(doc_id = %ticket.id, code = e.code(), error = %e, "Extraction failed");
                fail(doc, Stage::Extract, &e);
            }
        }
    }

    async fn run_summarization(
        &self,
        ticket: Ticket,
        name: String,
        text: String,
        options: SummaryOptions,
    ) {
        let reporter = self.status.begin(&ticket.id, &name);
        let result = self.summarizer.summarize(&text, &options, &reporter).await;
        self.status.finish(&reporter);

        let mut documents = self.documents.write().await;
        let Some(doc) = documents.resolve_mut(&ticket) else {
            debug!(doc_id = %ticket.id, "Discarding summary for deleted document");
            return;
        };

        match result {
            Ok(summary) => {
                info!(
                    doc_id = %ticket.id,
                    provider = self.summarizer.provider_name(),
                    chars = summary.len(),
                    "Summary generated"
                );
                doc.summary = Some(summary);
                doc.status = DocumentStatus::Completed;
            }
            Err(e) => {
                warn!(doc_id = %ticket.id, code = e.code(), error = %e, "Summarization failed");
                fail(doc, Stage::Summarize, &e);
            }
        }
    }
}

enum RetryWork {
    Extract {
        ticket: Ticket,
        kind: DocumentKind,
        name: String,
        file: Bytes,
    },
    Summarize {
        ticket: Ticket,
        name: String,
        text: String,
    },
}

/// Move a document into `summarizing` and return the text to summarize.
fn begin_summarizing(doc: &mut Document, options: SummaryOptions) -> String {
    doc.status = DocumentStatus::Summarizing;
    doc.error = None;
    doc.failed_stage = None;
    doc.options = options;
    doc.text.clone().unwrap_or_default()
}

fn fail(doc: &mut Document, stage: Stage, error: &Error) {
    doc.status = DocumentStatus::Error;
    doc.error = Some(error.to_string());
    doc.failed_stage = Some(stage);
}
