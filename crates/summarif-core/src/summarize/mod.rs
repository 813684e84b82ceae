//! Summarization client abstraction
//!
//! - Prompt construction from text and [`SummaryOptions`]
//! - [`Summarizer`] seam used by the workflow controller
//! - Gemini `generateContent` implementation

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::document::{SummaryLength, SummaryOptions, SummaryStyle};
use crate::error::{Error, Result};
use crate::progress::ProgressReporter;

/// Trimmed input shorter than this is rejected without a network call.
pub const MIN_SUMMARY_INPUT_CHARS: usize = 50;

/// Prompts longer than this are rejected without a network call.
pub const MAX_PROMPT_CHARS: usize = 30_000;

/// Produces a summary of extracted text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        text: &str,
        options: &SummaryOptions,
        progress: &ProgressReporter,
    ) -> Result<String>;

    /// Provider name for logging (e.g. "gemini")
    fn provider_name(&self) -> &'static str;
}

fn length_instruction(length: SummaryLength) -> &'static str {
    match length {
        SummaryLength::Short => "in 2-3 sentences (maximum 100 words)",
        SummaryLength::Medium => "in 1-2 paragraphs (maximum 300 words)",
        SummaryLength::Long => "in 3-4 paragraphs (maximum 500 words)",
    }
}

fn style_instruction(style: SummaryStyle) -> &'static str {
    match style {
        SummaryStyle::Bullet => {
            "Format the summary using bullet points with clear, concise statements."
        }
        SummaryStyle::Paragraph => {
            "Format the summary in well-structured paragraphs with smooth transitions."
        }
    }
}

/// Build the summarization prompt. Deterministic in `(text, options)`.
pub fn build_prompt(text: &str, options: &SummaryOptions) -> String {
    format!(
        "\n\
         Please summarize the following document {length}.\n\
         \n\
         {style}\n\
         \n\
         Focus on:\n\
         - Key points and main ideas\n\
         - Important details and conclusions  \n\
         - Actionable insights if applicable\n\
         \n\
         Make the summary clear, informative, and easy to understand.\n\
         \n\
         Document text:\n\
         {text}\n\
         \n\
         Summary:",
        length = length_instruction(options.length),
        style = style_instruction(options.style),
        text = text,
    )
}

/// Check the input text and build the prompt, enforcing the size limits.
pub fn prepare_prompt(text: &str, options: &SummaryOptions) -> Result<String> {
    if text.trim().chars().count() < MIN_SUMMARY_INPUT_CHARS {
        return Err(Error::validation(
            "Document text is too short to generate a meaningful summary.",
        ));
    }

    let prompt = build_prompt(text, options);
    let prompt_chars = prompt.chars().count();
    if prompt_chars > MAX_PROMPT_CHARS {
        return Err(Error::PayloadTooLarge {
            message: format!(
                "Document too long for a single request (prompt ~{} chars). Try reducing input to under {} characters.",
                prompt_chars, MAX_PROMPT_CHARS
            ),
            prompt_chars,
        });
    }

    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(length: SummaryLength, style: SummaryStyle) -> SummaryOptions {
        SummaryOptions { length, style }
    }

    #[test]
    fn test_prompt_contains_instructions_and_text() {
        let prompt = build_prompt(
            "The quarterly report shows growth.",
            &options(SummaryLength::Short, SummaryStyle::Bullet),
        );

        assert!(prompt.starts_with(
            "\nPlease summarize the following document in 2-3 sentences (maximum 100 words).\n\n"
        ));
        assert!(prompt.contains("- Important details and conclusions  \n"));
        assert!(prompt.contains("bullet points"));
        assert!(prompt.contains("Document text:\nThe quarterly report shows growth.\n"));
        assert!(prompt.ends_with("Summary:"));
    }

    #[test]
    fn test_prompt_length_and_style_variants() {
        let medium = build_prompt("x", &options(SummaryLength::Medium, SummaryStyle::Paragraph));
        assert!(medium.contains("in 1-2 paragraphs (maximum 300 words)"));
        assert!(medium.contains("well-structured paragraphs"));

        let long = build_prompt("x", &options(SummaryLength::Long, SummaryStyle::Paragraph));
        assert!(long.contains("in 3-4 paragraphs (maximum 500 words)"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let opts = options(SummaryLength::Long, SummaryStyle::Bullet);
        let a = build_prompt("Same text every time", &opts);
        let b = build_prompt("Same text every time", &opts);
        assert_eq!(a, b);
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_prepare_rejects_short_text() {
        let err = prepare_prompt("   too short   ", &SummaryOptions::default()).unwrap_err();
        assert_eq!(err.code(), "validation");
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_prepare_accepts_exactly_minimum() {
        let text = "a".repeat(MIN_SUMMARY_INPUT_CHARS);
        assert!(prepare_prompt(&text, &SummaryOptions::default()).is_ok());
    }

    #[test]
    fn test_prepare_rejects_oversized_prompt() {
        let text = "word ".repeat(MAX_PROMPT_CHARS / 5);
        let err = prepare_prompt(&text, &SummaryOptions::default()).unwrap_err();
        match err {
            Error::PayloadTooLarge { prompt_chars, .. } => {
                assert!(prompt_chars > MAX_PROMPT_CHARS)
            }
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_boundary_at_limit() {
        let opts = SummaryOptions::default();
        let overhead = build_prompt("", &opts).chars().count();

        let fits = "a".repeat(MAX_PROMPT_CHARS - overhead);
        assert_eq!(build_prompt(&fits, &opts).chars().count(), MAX_PROMPT_CHARS);
        assert!(prepare_prompt(&fits, &opts).is_ok());

        let too_big = "a".repeat(MAX_PROMPT_CHARS - overhead + 1);
        assert!(matches!(
            prepare_prompt(&too_big, &opts),
            Err(Error::PayloadTooLarge { .. })
        ));
    }
}
