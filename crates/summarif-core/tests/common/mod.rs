//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::{dictionary, Document, Object, Stream};
use wiremock::MockServer;

use summarif_core::ocr::{OcrEngine, OcrLauncher};
use summarif_core::{DocumentExtractor, GeminiClient, OcrHandle, WorkflowController};

pub const TEST_API_KEY: &str = "AIzaIntegrationTestKey";

/// Build a PDF with one `Tj` text run per page.
pub fn pdf_with_pages(page_texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let page_ids: Vec<_> = page_texts
        .iter()
        .map(|text| {
            let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            })
        })
        .collect();

    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|&id| Object::from(id)).collect::<Vec<_>>(),
        "Count" => Object::Integer(page_ids.len() as i64),
    });
    for page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(*page_id) {
            dict.set("Parent", pages_id);
        }
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// OCR launcher whose engine always recognizes the same text.
pub struct FixedOcr(pub &'static str);

struct FixedEngine(&'static str);

#[async_trait]
impl OcrEngine for FixedEngine {
    async fn recognize(&self, _image_path: &Path) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }

    async fn terminate(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl OcrLauncher for FixedOcr {
    async fn launch(&self) -> anyhow::Result<Box<dyn OcrEngine>> {
        Ok(Box::new(FixedEngine(self.0)))
    }
}

pub fn gemini(server: &MockServer, api_key: Option<&str>) -> GeminiClient {
    GeminiClient::new(api_key.map(str::to_string)).with_base_url(server.uri())
}

/// Controller with real extraction (fixed OCR output) and a Gemini client
/// pointed at `server`.
pub fn controller(server: &MockServer, api_key: Option<&str>) -> WorkflowController {
    let extractor = DocumentExtractor::new(OcrHandle::new(Arc::new(FixedOcr(
        "Scanned receipt total 42 paid in full",
    ))));
    WorkflowController::new(Arc::new(extractor), Arc::new(gemini(server, api_key)))
}

pub fn gemini_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
}
