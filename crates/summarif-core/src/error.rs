//! Error taxonomy for extraction, summarization and workflow operations
//!
//! Every variant serializes as `{"code": "...", "message": "...", ...}` so the
//! presentation layer can match on `code` without parsing messages.

use serde::Serialize;

use crate::document::DocumentStatus;

/// Errors produced by the core.
///
/// Variants from `Validation` through `Network` are document failures: the
/// workflow controller stores their message on the affected document.
/// `DocumentNotFound` and `InvalidTransition` are returned to the caller of a
/// controller operation and never change a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Error {
    /// Bad upload or text too short to summarize
    #[error("{message}")]
    Validation { message: String },

    /// PDF/OCR failure or no text found
    #[error("{message}")]
    Extraction { message: String },

    /// Missing or placeholder credential
    #[error("{message}")]
    Configuration { message: String },

    /// Prompt exceeds the single-request limit
    #[error("{message}")]
    PayloadTooLarge { message: String, prompt_chars: usize },

    /// HTTP 401
    #[error("{message}")]
    Auth { status: u16, message: String },

    /// HTTP 400
    #[error("{message}")]
    BadRequest { status: u16, message: String },

    /// HTTP 429
    #[error("{message}")]
    Quota { status: u16, message: String },

    /// Any other non-success HTTP status
    #[error("{message}")]
    Request { status: u16, message: String },

    /// Success response without summary text
    #[error("{message}")]
    EmptyResponse { message: String },

    /// Transport-level failure
    #[error("{message}")]
    Network { message: String },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Cannot {action} document {id} while it is {status}")]
    InvalidTransition {
        id: String,
        status: DocumentStatus,
        action: &'static str,
    },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn empty_response() -> Self {
        Self::EmptyResponse {
            message: "No summary generated. The AI response was empty or malformed.".to_string(),
        }
    }

    pub fn network() -> Self {
        Self::Network {
            message: "Network error. Please check your internet connection and try again."
                .to_string(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::DocumentNotFound { id: id.into() }
    }

    /// Map a non-success HTTP status and the server-provided message to a
    /// typed failure.
    pub fn from_status(status: u16, server_message: &str) -> Self {
        match status {
            401 => Self::Auth {
                status,
                message: format!("Invalid API key (401). {}", server_message),
            },
            400 => Self::BadRequest {
                status,
                message: format!(
                    "Invalid request (400). Server message: {}. The input may be too long or contain unsupported characters.",
                    server_message
                ),
            },
            429 => Self::Quota {
                status,
                message: format!("API quota exceeded (429). {}", server_message),
            },
            _ => Self::Request {
                status,
                message: format!("API request failed ({}). {}", status, server_message),
            },
        }
    }

    /// Stable snake_case code, identical to the serialized `code` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Extraction { .. } => "extraction",
            Self::Configuration { .. } => "configuration",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Auth { .. } => "auth",
            Self::BadRequest { .. } => "bad_request",
            Self::Quota { .. } => "quota",
            Self::Request { .. } => "request",
            Self::EmptyResponse { .. } => "empty_response",
            Self::Network { .. } => "network",
            Self::DocumentNotFound { .. } => "document_not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }

    /// HTTP status carried by request failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. }
            | Self::BadRequest { status, .. }
            | Self::Quota { status, .. }
            | Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
