//! OCR via the `tesseract` executable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::{OcrEngine, OcrLauncher, OCR_CHAR_WHITELIST, OCR_LANGUAGE};

/// Launches [`TesseractEngine`] after checking the executable runs.
#[derive(Debug, Clone)]
pub struct TesseractLauncher {
    /// Executable name or path
    pub program: PathBuf,
    pub language: String,
    pub char_whitelist: String,
}

impl Default for TesseractLauncher {
    fn default() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            language: OCR_LANGUAGE.to_string(),
            char_whitelist: OCR_CHAR_WHITELIST.to_string(),
        }
    }
}

#[async_trait]
impl OcrLauncher for TesseractLauncher {
    async fn launch(&self) -> Result<Box<dyn OcrEngine>> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} --version exited with {}",
                self.program.display(),
                output.status
            );
        }

        let version = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(
            version = version.lines().next().unwrap_or_default(),
            "Tesseract available"
        );

        Ok(Box::new(TesseractEngine {
            program: self.program.clone(),
            language: self.language.clone(),
            char_whitelist: self.char_whitelist.clone(),
        }))
    }
}

/// One `tesseract` process per recognition; the engine itself holds no
/// resources.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: PathBuf,
    language: String,
    char_whitelist: String,
}

impl TesseractEngine {
    fn args(&self, image_path: &Path) -> Vec<String> {
        vec![
            image_path.to_string_lossy().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "-c".to_string(),
            format!("tessedit_char_whitelist={}", self.char_whitelist),
        ]
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image_path: &Path) -> Result<String> {
        let output = Command::new(&self.program)
            .args(self.args(image_path))
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("tesseract exited with {}: {}", output.status, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn terminate(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_carry_language_and_whitelist() {
        let engine = TesseractEngine {
            program: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            char_whitelist: OCR_CHAR_WHITELIST.to_string(),
        };
        let args = engine.args(Path::new("/tmp/scan.png"));
        assert_eq!(args[0], "/tmp/scan.png");
        assert_eq!(args[1], "stdout");
        assert_eq!(&args[2..4], ["-l", "eng"]);
        assert_eq!(args[4], "-c");
        assert_eq!(
            args[5],
            format!("tessedit_char_whitelist={}", OCR_CHAR_WHITELIST)
        );
    }

    #[tokio::test]
    async fn test_launch_missing_program_fails() {
        let launcher = TesseractLauncher {
            program: PathBuf::from("/nonexistent/bin/tesseract"),
            ..Default::default()
        };
        let err = launcher.launch().await.err().unwrap();
        assert!(err.to_string().contains("Failed to run"));
    }
}
