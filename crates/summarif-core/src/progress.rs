//! Progress reporting for extraction and summarization.
//!
//! The workflow exposes a single "current status" slot. Each operation gets a
//! [`ProgressReporter`] that overwrites the slot; readers see only the latest
//! value. There is no queueing and no backpressure.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Stage tag of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStage {
    PdfParsing,
    OcrProcessing,
    AiProcessing,
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressStage::PdfParsing => write!(f, "pdf-parsing"),
            ProgressStage::OcrProcessing => write!(f, "ocr-processing"),
            ProgressStage::AiProcessing => write!(f, "ai-processing"),
        }
    }
}

/// Advisory percentage/message pair for an in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    /// 0-100
    pub progress: u8,
    pub message: String,
}

/// The status shown to the user: latest event of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentStatus {
    /// Operation that owns this status
    pub operation: u64,
    pub document_id: String,
    pub document_name: String,
    #[serde(flatten)]
    pub event: ProgressEvent,
}

/// Single-slot holder of the current status.
#[derive(Clone)]
pub struct StatusBoard {
    slot: Arc<watch::Sender<Option<CurrentStatus>>>,
    next_operation: Arc<AtomicU64>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
            next_operation: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Start a new operation for a document and return its reporter.
    pub fn begin(&self, document_id: &str, document_name: &str) -> ProgressReporter {
        let operation = self.next_operation.fetch_add(1, Ordering::Relaxed);
        ProgressReporter {
            inner: Some(Arc::new(ReporterInner {
                slot: self.slot.clone(),
                operation,
                document_id: document_id.to_string(),
                document_name: document_name.to_string(),
                high_water: AtomicU8::new(0),
            })),
        }
    }

    /// Clear the slot if it still belongs to `reporter`'s operation.
    ///
    /// Another operation may have overwritten the slot since; its status
    /// stays visible.
    pub fn finish(&self, reporter: &ProgressReporter) {
        let Some(operation) = reporter.operation() else {
            return;
        };
        self.slot.send_if_modified(|current| {
            if current.as_ref().map(|c| c.operation) == Some(operation) {
                *current = None;
                true
            } else {
                false
            }
        });
    }

    /// Clear the slot unconditionally.
    pub fn reset(&self) {
        self.slot.send_replace(None);
    }

    pub fn current(&self) -> Option<CurrentStatus> {
        self.slot.borrow().clone()
    }

    /// Receiver that observes every overwrite of the slot.
    pub fn subscribe(&self) -> watch::Receiver<Option<CurrentStatus>> {
        self.slot.subscribe()
    }
}

struct ReporterInner {
    slot: Arc<watch::Sender<Option<CurrentStatus>>>,
    operation: u64,
    document_id: String,
    document_name: String,
    high_water: AtomicU8,
}

/// Handle passed to extraction and summarization for one operation.
///
/// Percentages never go backwards within an operation: a late or
/// out-of-order lower value is raised to the highest value seen.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    inner: Option<Arc<ReporterInner>>,
}

impl ProgressReporter {
    /// Reporter that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn operation(&self) -> Option<u64> {
        self.inner.as_ref().map(|i| i.operation)
    }

    pub fn report(&self, stage: ProgressStage, progress: u8, message: impl Into<String>) {
        let Some(inner) = &self.inner else {
            return;
        };
        let progress = progress.min(100);
        let progress = inner.high_water.fetch_max(progress, Ordering::Relaxed).max(progress);
        let event = ProgressEvent {
            stage,
            progress,
            message: message.into(),
        };
        tracing::trace!(
            document = %inner.document_name,
            stage = %event.stage,
            progress = event.progress,
            "{}",
            event.message
        );
        inner.slot.send_replace(Some(CurrentStatus {
            operation: inner.operation,
            document_id: inner.document_id.clone(),
            document_name: inner.document_name.clone(),
            event,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_overwrites_slot() {
        let board = StatusBoard::new();
        let reporter = board.begin("doc1", "report.pdf");

        reporter.report(ProgressStage::PdfParsing, 10, "Reading PDF file...");
        reporter.report(ProgressStage::PdfParsing, 50, "Extracting text from PDF...");

        let current = board.current().unwrap();
        assert_eq!(current.document_id, "doc1");
        assert_eq!(current.document_name, "report.pdf");
        assert_eq!(current.event.progress, 50);
        assert_eq!(current.event.message, "Extracting text from PDF...");
    }

    #[test]
    fn test_progress_never_decreases() {
        let board = StatusBoard::new();
        let reporter = board.begin("doc1", "a.pdf");

        reporter.report(ProgressStage::AiProcessing, 70, "late");
        reporter.report(ProgressStage::AiProcessing, 30, "out of order");

        let current = board.current().unwrap();
        assert_eq!(current.event.progress, 70);
        assert_eq!(current.event.message, "out of order");
    }

    #[test]
    fn test_progress_clamped_to_100() {
        let board = StatusBoard::new();
        let reporter = board.begin("doc1", "a.pdf");
        reporter.report(ProgressStage::OcrProcessing, 250, "done");
        assert_eq!(board.current().unwrap().event.progress, 100);
    }

    #[test]
    fn test_finish_clears_own_status_only() {
        let board = StatusBoard::new();
        let first = board.begin("doc1", "a.pdf");
        let second = board.begin("doc2", "b.png");

        first.report(ProgressStage::PdfParsing, 10, "Reading PDF file...");
        second.report(ProgressStage::OcrProcessing, 30, "Processing image...");

        // Slot belongs to the second operation now
        board.finish(&first);
        assert_eq!(board.current().unwrap().document_id, "doc2");

        board.finish(&second);
        assert!(board.current().is_none());
    }

    #[test]
    fn test_disabled_reporter_is_silent() {
        let board = StatusBoard::new();
        let reporter = ProgressReporter::disabled();
        reporter.report(ProgressStage::PdfParsing, 10, "ignored");
        board.finish(&reporter);
        assert!(board.current().is_none());
        assert!(reporter.operation().is_none());
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest() {
        let board = StatusBoard::new();
        let mut rx = board.subscribe();
        let reporter = board.begin("doc1", "a.pdf");

        reporter.report(ProgressStage::PdfParsing, 10, "one");
        reporter.report(ProgressStage::PdfParsing, 90, "two");

        rx.changed().await.unwrap();
        let latest = rx.borrow_and_update().clone().unwrap();
        assert_eq!(latest.event.progress, 90);
    }

    #[test]
    fn test_reset_clears_everything() {
        let board = StatusBoard::new();
        board.begin("doc1", "a.pdf").report(ProgressStage::PdfParsing, 10, "x");
        board.reset();
        assert!(board.current().is_none());
    }
}
