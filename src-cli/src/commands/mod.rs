//! CLI commands
//!
//! Each command builds the core stack from [`Config`], runs, and releases the
//! OCR engine before returning.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use futures::future::join_all;
use tokio::task::JoinHandle;

use summarif_core::config::{is_usable_api_key, CredentialSources, Settings};
use summarif_core::workflow::new_document_id;
use summarif_core::{
    export, AppState, Config, Document, DocumentStatus, SummaryLength, SummaryOptions,
    SummaryStyle, Upload, WorkflowController,
};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Extract text from documents and summarize them
    Summarize {
        /// PDF or image files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// short, medium or long
        #[arg(long, default_value_t = SummaryLength::Medium)]
        length: SummaryLength,

        /// paragraph or bullet
        #[arg(long, default_value_t = SummaryStyle::Paragraph)]
        style: SummaryStyle,

        /// Write each summary to `<name>-summary.txt` in this directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the documents as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the extracted text of a document
    Extract { file: PathBuf },
    /// Save a Gemini API key to the settings file
    SetKey { key: String },
    /// Show which API key is in effect
    KeyStatus,
}

pub async fn execute(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::Summarize {
            files,
            length,
            style,
            out,
            json,
        } => {
            let state = AppState::new(config);
            let result = summarize_files(
                &state.controller,
                &files,
                SummaryOptions { length, style },
                out.as_deref(),
            )
            .await;
            state.shutdown().await;

            let report = result?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.documents)?);
            } else {
                print!("{}", render_report(&report));
            }
            report.into_result()
        }
        Command::Extract { file } => {
            let state = AppState::new(config);
            let result = extract_file(&state.controller, &file).await;
            state.shutdown().await;

            println!("{}", result?);
            Ok(())
        }
        Command::SetKey { key } => {
            let path = set_key(&config, &key)?;
            println!("API key saved to {}", path.display());
            Ok(())
        }
        Command::KeyStatus => {
            println!("{}", key_status(&config.credential_sources()));
            Ok(())
        }
    }
}

/// A file that never became a document
#[derive(Debug, Clone)]
pub struct Rejected {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a `summarize` run
#[derive(Debug, Default)]
pub struct SummaryReport {
    /// Documents in input order
    pub documents: Vec<Document>,
    pub rejected: Vec<Rejected>,
    pub exported: Vec<PathBuf>,
}

impl SummaryReport {
    fn reject(&mut self, path: &Path, error: anyhow::Error) {
        tracing::warn!(file = %path.display(), "Rejected: {:#}", error);
        self.rejected.push(Rejected {
            path: path.to_path_buf(),
            error: format!("{:#}", error),
        });
    }

    pub fn failures(&self) -> usize {
        self.rejected.len()
            + self
                .documents
                .iter()
                .filter(|d| d.status == DocumentStatus::Error)
                .count()
    }

    /// `Err` if any input failed.
    pub fn into_result(self) -> anyhow::Result<()> {
        let failures = self.failures();
        if failures > 0 {
            anyhow::bail!(
                "{} of {} documents failed",
                failures,
                self.documents.len() + self.rejected.len()
            );
        }
        Ok(())
    }
}

/// Add every file, extract them concurrently, then summarize those that
/// extracted cleanly.
pub async fn summarize_files(
    controller: &WorkflowController,
    files: &[PathBuf],
    options: SummaryOptions,
    out: Option<&Path>,
) -> anyhow::Result<SummaryReport> {
    controller.set_options(options).await;
    let _progress = ProgressLogger::spawn(controller);

    let mut report = SummaryReport::default();
    let mut uploads = Vec::with_capacity(files.len());
    let mut paths = Vec::with_capacity(files.len());
    for path in files {
        match Upload::from_path(path).await {
            Ok(upload) => {
                uploads.push((new_document_id(), upload));
                paths.push(path);
            }
            Err(e) => report.reject(path, e),
        }
    }

    let mut ids = Vec::with_capacity(uploads.len());
    for (path, result) in paths.into_iter().zip(controller.add_documents(uploads).await) {
        match result {
            Ok(id) => ids.push(id),
            Err(e) => report.reject(path, e.into()),
        }
    }

    let mut extracted = Vec::new();
    for id in &ids {
        if let Some(doc) = controller.get(id).await {
            if doc.status == DocumentStatus::Extracted {
                extracted.push(doc.id);
            }
        }
    }
    for result in join_all(extracted.iter().map(|id| controller.summarize(id))).await {
        result?;
    }

    for id in &ids {
        if let Some(doc) = controller.get(id).await {
            report.documents.push(doc);
        }
    }

    if let Some(dir) = out {
        for doc in report
            .documents
            .iter()
            .filter(|d| d.status == DocumentStatus::Completed)
        {
            report.exported.push(export::write_summary(dir, doc).await?);
        }
    }

    Ok(report)
}

/// Extract a single file and return its text.
pub async fn extract_file(controller: &WorkflowController, path: &Path) -> anyhow::Result<String> {
    let id = add_file(controller, path).await?;
    let doc = controller
        .get(&id)
        .await
        .with_context(|| format!("Document {} disappeared", id))?;

    match doc.status {
        DocumentStatus::Extracted => doc.text.context("Extracted document has no text"),
        status => Err(anyhow::anyhow!(doc
            .error
            .unwrap_or_else(|| format!("Extraction did not finish ({})", status)))),
    }
}

async fn add_file(controller: &WorkflowController, path: &Path) -> anyhow::Result<String> {
    let upload = Upload::from_path(path).await?;
    Ok(controller.add_document(new_document_id(), upload).await?)
}

/// Validate and persist a key. Returns the settings path.
pub fn set_key(config: &Config, key: &str) -> anyhow::Result<PathBuf> {
    let mut settings = Settings::load(&config.settings_file);
    settings.set_api_key(key).map_err(anyhow::Error::msg)?;
    settings.save(&config.settings_file)?;

    tracing::info!("Saved Gemini API key");
    Ok(config.settings_file.clone())
}

pub fn key_status(sources: &CredentialSources) -> String {
    match sources.resolve_with_source() {
        Some((key, source)) if is_usable_api_key(&key) => {
            format!("Gemini API key {} (from {})", mask_key(&key), source)
        }
        Some((_, source)) => format!(
            "Gemini API key from {} is a placeholder. Run `summarif set-key <KEY>`.",
            source
        ),
        None => "No Gemini API key configured. Set SUMMARIF_GEMINI_API_KEY or run `summarif set-key <KEY>`."
            .to_string(),
    }
}

fn mask_key(key: &str) -> String {
    let tail: Vec<char> = key.chars().rev().take(4).collect();
    format!("****{}", tail.into_iter().rev().collect::<String>())
}

pub fn render_report(report: &SummaryReport) -> String {
    let mut out = String::new();
    for doc in &report.documents {
        out.push_str(&format!("== {} ({}) ==\n", doc.name, doc.status));
        match (&doc.summary, &doc.error) {
            (Some(summary), _) if doc.status == DocumentStatus::Completed => {
                out.push_str(summary);
                out.push('\n');
            }
            (_, Some(error)) => out.push_str(&format!("Error: {}\n", error)),
            _ => {}
        }
        out.push('\n');
    }
    for rejected in &report.rejected {
        out.push_str(&format!(
            "== {} (rejected) ==\nError: {}\n\n",
            rejected.path.display(),
            rejected.error
        ));
    }
    for path in &report.exported {
        out.push_str(&format!("Saved {}\n", path.display()));
    }
    out
}

/// Logs every progress update until dropped.
struct ProgressLogger {
    task: JoinHandle<()>,
}

impl ProgressLogger {
    fn spawn(controller: &WorkflowController) -> Self {
        let mut updates = controller.subscribe_status();
        let task = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let current = updates.borrow_and_update().clone();
                if let Some(status) = current {
                    tracing::info!(
                        document = %status.document_name,
                        stage = %status.event.stage,
                        progress = status.event.progress,
                        "{}",
                        status.event.message
                    );
                }
            }
        });
        Self { task }
    }

    #[cfg(test)]
    fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.task.abort_handle()
    }
}

impl Drop for ProgressLogger {
    fn drop(&mut self) {
        self.task.abort();
    }
}
