//! Plain-text extraction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use crate::extract::{ExtractionResult, Extractor};
use crate::models::MetaMap;

/// Reads the file as UTF-8, replacing invalid bytes lossily.
pub struct TextExtractor;

#[async_trait]
impl Extractor for TextExtractor {
    async fn extract(&self, path: &Path, _work_dir: &Path) -> Result<ExtractionResult> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read text artifact: {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let mut metadata = MetaMap::new();
        metadata.insert(
            "length".to_string(),
            serde_json::json!(content.chars().count()),
        );
        Ok(ExtractionResult {
            text: Some(content),
            metadata,
            derived_files: Vec::new(),
        })
    }
}
