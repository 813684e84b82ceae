//! Document records, summary options and upload validation.

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Uploads larger than this are rejected.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// MIME types accepted for upload.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
];

/// How the text of a document is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// `image/*` is an image, everything else is treated as a PDF.
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            DocumentKind::Image
        } else {
            DocumentKind::Pdf
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Pdf => write!(f, "pdf"),
            DocumentKind::Image => write!(f, "image"),
        }
    }
}

/// Workflow state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Extracting,
    Extracted,
    Summarizing,
    Completed,
    Error,
}

impl DocumentStatus {
    /// Extraction or summarization is running.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, DocumentStatus::Extracting | DocumentStatus::Summarizing)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Extracting => write!(f, "extracting"),
            DocumentStatus::Extracted => write!(f, "extracted"),
            DocumentStatus::Summarizing => write!(f, "summarizing"),
            DocumentStatus::Completed => write!(f, "completed"),
            DocumentStatus::Error => write!(f, "error"),
        }
    }
}

/// Stage that put a document into `error`; retry re-enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Summarize,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Extract => write!(f, "extract"),
            Stage::Summarize => write!(f, "summarize"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    /// Output token budget sent with the generation request.
    pub fn max_output_tokens(&self) -> u32 {
        match self {
            SummaryLength::Short => 150,
            SummaryLength::Medium => 400,
            SummaryLength::Long => 600,
        }
    }
}

impl std::fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryLength::Short => write!(f, "short"),
            SummaryLength::Medium => write!(f, "medium"),
            SummaryLength::Long => write!(f, "long"),
        }
    }
}

impl FromStr for SummaryLength {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(SummaryLength::Short),
            "medium" => Ok(SummaryLength::Medium),
            "long" => Ok(SummaryLength::Long),
            other => Err(format!(
                "unknown summary length '{}' (expected short, medium or long)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Paragraph,
    Bullet,
}

impl std::fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryStyle::Paragraph => write!(f, "paragraph"),
            SummaryStyle::Bullet => write!(f, "bullet"),
        }
    }
}

impl FromStr for SummaryStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paragraph" => Ok(SummaryStyle::Paragraph),
            "bullet" => Ok(SummaryStyle::Bullet),
            other => Err(format!(
                "unknown summary style '{}' (expected paragraph or bullet)",
                other
            )),
        }
    }
}

/// User-selected summary options. Applied to the next operation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOptions {
    pub length: SummaryLength,
    pub style: SummaryStyle,
}

/// A file submitted for summarization, not yet validated.
#[derive(Debug, Clone)]
pub struct Upload {
    /// File name (for display and export naming)
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self::new(name, mime_type_for_path(path), bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Check size and type, returning the document kind on success.
    pub fn validate(&self) -> Result<DocumentKind> {
        if self.size() > MAX_UPLOAD_BYTES {
            return Err(Error::validation("File size must be less than 50MB"));
        }
        if !ALLOWED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(Error::validation(
                "Only PDF and image files (JPEG, PNG) are supported",
            ));
        }
        Ok(DocumentKind::from_mime(&self.mime_type))
    }
}

/// MIME type for a file extension. Unknown extensions map to
/// `application/octet-stream`, which validation rejects.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// A document owned by the workflow controller.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub kind: DocumentKind,
    pub mime_type: String,
    /// Raw file contents, kept for extraction retries
    #[serde(skip)]
    pub file: Bytes,
    pub created_at: DateTime<Utc>,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set while `status` is `Error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    /// Options captured at creation, re-captured at each summarization
    pub options: SummaryOptions,
}

impl Document {
    /// New document in `extracting`, built from an upload that already
    /// passed validation.
    pub fn new(id: String, upload: Upload, kind: DocumentKind, options: SummaryOptions) -> Self {
        Self {
            id,
            name: upload.name,
            kind,
            mime_type: upload.mime_type,
            file: upload.bytes,
            created_at: Utc::now(),
            status: DocumentStatus::Extracting,
            text: None,
            summary: None,
            error: None,
            failed_stage: None,
            options,
        }
    }

    pub fn summary_length(&self) -> SummaryLength {
        self.options.length
    }
}
