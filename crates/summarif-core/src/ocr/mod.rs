//! OCR engine abstraction
//!
//! The engine is an explicitly owned, lazily launched resource. An
//! [`OcrHandle`] launches it on the first recognition, reuses it for every
//! later image and only tears it down on [`OcrHandle::shutdown`].
//!
//! Recognitions through one handle are serialized: the engine lock is held
//! for the whole recognition, so concurrent callers queue on it.

mod tesseract;

pub use tesseract::{TesseractEngine, TesseractLauncher};

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Recognition language
pub const OCR_LANGUAGE: &str = "eng";

/// Characters the engine may emit: ASCII digits and letters only.
pub const OCR_CHAR_WHITELIST: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A running OCR engine.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text in the image stored at `image_path`.
    async fn recognize(&self, image_path: &Path) -> Result<String>;

    /// Release the engine's resources.
    async fn terminate(&self) -> Result<()>;
}

/// Creates engines on demand.
#[async_trait]
pub trait OcrLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn OcrEngine>>;
}

/// Shared handle to a lazily launched OCR engine.
#[derive(Clone)]
pub struct OcrHandle {
    launcher: Arc<dyn OcrLauncher>,
    engine: Arc<Mutex<Option<Box<dyn OcrEngine>>>>,
    launches: Arc<AtomicUsize>,
}

impl OcrHandle {
    pub fn new(launcher: Arc<dyn OcrLauncher>) -> Self {
        Self {
            launcher,
            engine: Arc::new(Mutex::new(None)),
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle backed by the `tesseract` executable.
    pub fn tesseract() -> Self {
        Self::new(Arc::new(TesseractLauncher::default()))
    }

    /// Recognize text in an encoded image.
    ///
    /// The image is written to a temporary file for the engine; the file is
    /// removed when this returns, whether recognition succeeded or not.
    pub async fn recognize(&self, image: &[u8], extension: &str) -> Result<String> {
        let mut guard = self.engine.lock().await;

        if guard.is_none() {
            tracing::info!("Launching OCR engine");
            let engine = self
                .launcher
                .launch()
                .await
                .context("Failed to initialize OCR engine")?;
            self.launches.fetch_add(1, Ordering::Relaxed);
            *guard = Some(engine);
        }

        let image_file = tempfile::Builder::new()
            .prefix("summarif-ocr-")
            .suffix(&format!(".{}", extension))
            .tempfile()
            .context("Failed to create temporary image file")?;
        tokio::fs::write(image_file.path(), image)
            .await
            .context("Failed to write temporary image file")?;

        let engine = guard
            .as_ref()
            .context("OCR engine unavailable")?;
        let result = engine.recognize(image_file.path()).await;

        if let Err(e) = image_file.close() {
            tracing::warn!(error = %e, "Failed to remove temporary image file");
        }

        result
    }

    /// Terminate the engine if it is running. A later recognition launches a
    /// fresh one.
    pub async fn shutdown(&self) -> Result<()> {
        let engine = self.engine.lock().await.take();
        if let Some(engine) = engine {
            engine.terminate().await?;
            tracing::info!("OCR engine terminated");
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.engine.lock().await.is_some()
    }

    /// Number of times an engine has been launched through this handle.
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Engine returning canned output and recording what it saw.
    pub(crate) struct MockEngine {
        pub output: Result<String, String>,
        pub seen_paths: Arc<StdMutex<Vec<PathBuf>>>,
        pub busy: Arc<AtomicBool>,
        pub overlapped: Arc<AtomicBool>,
        pub terminated: Arc<AtomicBool>,
    }

    #[async_trait]
    impl OcrEngine for MockEngine {
        async fn recognize(&self, image_path: &Path) -> Result<String> {
            if self.busy.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            assert!(image_path.exists(), "image file must exist during recognition");
            self.seen_paths.lock().unwrap().push(image_path.to_path_buf());
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.busy.store(false, Ordering::SeqCst);
            match &self.output {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!(e.clone())),
            }
        }

        async fn terminate(&self) -> Result<()> {
            self.terminated.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Clone)]
    pub(crate) struct MockLauncher {
        pub output: Result<String, String>,
        pub seen_paths: Arc<StdMutex<Vec<PathBuf>>>,
        pub busy: Arc<AtomicBool>,
        pub overlapped: Arc<AtomicBool>,
        pub terminated: Arc<AtomicBool>,
    }

    impl MockLauncher {
        pub(crate) fn new(output: Result<&str, &str>) -> Self {
            Self {
                output: output.map(str::to_string).map_err(str::to_string),
                seen_paths: Arc::new(StdMutex::new(Vec::new())),
                busy: Arc::new(AtomicBool::new(false)),
                overlapped: Arc::new(AtomicBool::new(false)),
                terminated: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl OcrLauncher for MockLauncher {
        async fn launch(&self) -> Result<Box<dyn OcrEngine>> {
            Ok(Box::new(MockEngine {
                output: self.output.clone(),
                seen_paths: self.seen_paths.clone(),
                busy: self.busy.clone(),
                overlapped: self.overlapped.clone(),
                terminated: self.terminated.clone(),
            }))
        }
    }

    struct FailingLauncher;

    #[async_trait]
    impl OcrLauncher for FailingLauncher {
        async fn launch(&self) -> Result<Box<dyn OcrEngine>> {
            anyhow::bail!("tesseract not found")
        }
    }

    #[tokio::test]
    async fn test_engine_launched_lazily_once() {
        let launcher = MockLauncher::new(Ok("Recognized text"));
        let handle = OcrHandle::new(Arc::new(launcher));

        assert!(!handle.is_running().await);
        assert_eq!(handle.launch_count(), 0);

        handle.recognize(b"img1", "png").await.unwrap();
        handle.recognize(b"img2", "png").await.unwrap();

        assert!(handle.is_running().await);
        assert_eq!(handle.launch_count(), 1);
    }

    #[tokio::test]
    async fn test_temp_file_removed_after_success_and_failure() {
        let ok = MockLauncher::new(Ok("text"));
        let handle = OcrHandle::new(Arc::new(ok.clone()));
        handle.recognize(b"img", "jpg").await.unwrap();

        let failing = MockLauncher::new(Err("engine crashed"));
        let failing_handle = OcrHandle::new(Arc::new(failing.clone()));
        let err = failing_handle.recognize(b"img", "jpg").await.unwrap_err();
        assert!(err.to_string().contains("engine crashed"));

        for path in ok
            .seen_paths
            .lock()
            .unwrap()
            .iter()
            .chain(failing.seen_paths.lock().unwrap().iter())
        {
            assert!(path.to_string_lossy().ends_with(".jpg"));
            assert!(!path.exists(), "temp file {:?} should be removed", path);
        }
    }

    #[tokio::test]
    async fn test_concurrent_recognitions_are_serialized() {
        let launcher = MockLauncher::new(Ok("text"));
        let handle = OcrHandle::new(Arc::new(launcher.clone()));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.recognize(b"img", "png").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(!launcher.overlapped.load(Ordering::SeqCst));
        assert_eq!(launcher.seen_paths.lock().unwrap().len(), 4);
        assert_eq!(handle.launch_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_terminates_and_allows_relaunch() {
        let launcher = MockLauncher::new(Ok("text"));
        let handle = OcrHandle::new(Arc::new(launcher.clone()));

        // Nothing to terminate yet
        handle.shutdown().await.unwrap();
        assert!(!launcher.terminated.load(Ordering::SeqCst));

        handle.recognize(b"img", "png").await.unwrap();
        handle.shutdown().await.unwrap();
        assert!(launcher.terminated.load(Ordering::SeqCst));
        assert!(!handle.is_running().await);

        handle.recognize(b"img", "png").await.unwrap();
        assert_eq!(handle.launch_count(), 2);
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let handle = OcrHandle::new(Arc::new(FailingLauncher));
        let err = handle.recognize(b"img", "png").await.unwrap_err();
        assert!(err.to_string().contains("Failed to initialize OCR engine"));
        assert!(!handle.is_running().await);
    }

    #[test]
    fn test_whitelist_is_ascii_alphanumeric() {
        assert_eq!(OCR_CHAR_WHITELIST.len(), 62);
        assert!(OCR_CHAR_WHITELIST.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
