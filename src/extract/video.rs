//! Video extraction: container/stream metadata and a representative frame.
//!
//! Probing and frame extraction are independently best-effort: a missing
//! prober leaves an explicit "unavailable" marker, a missing or failing
//! transcoder simply produces no derived file. Neither fails the run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::extract::{DerivedFile, ExtractionResult, Extractor};
use crate::models::MetaMap;
use crate::tools::{FrameExtractor, MediaProber, ToolOutcome};

pub struct VideoExtractor {
    prober: Arc<dyn MediaProber>,
    frames: Arc<dyn FrameExtractor>,
}

impl VideoExtractor {
    pub fn new(prober: Arc<dyn MediaProber>, frames: Arc<dyn FrameExtractor>) -> VideoExtractor {
        VideoExtractor { prober, frames }
    }
}

#[async_trait]
impl Extractor for VideoExtractor {
    async fn extract(&self, path: &Path, work_dir: &Path) -> Result<ExtractionResult> {
        let metadata = self.probe_metadata(path).await;

        let mut derived_files = Vec::new();
        if let Some(keyframe) = self.extract_keyframe(path, work_dir).await? {
            derived_files.push(keyframe);
        }

        Ok(ExtractionResult {
            text: None,
            metadata,
            derived_files,
        })
    }
}

impl VideoExtractor {
    async fn probe_metadata(&self, path: &Path) -> MetaMap {
        let mut metadata = MetaMap::new();
        match self.prober.probe(path).await {
            ToolOutcome::Unavailable => {
                metadata.insert("ffprobe".to_string(), json!("unavailable"));
            }
            ToolOutcome::Failed(reason) => {
                metadata.insert("ffprobe_error".to_string(), json!(reason));
            }
            ToolOutcome::Output(stdout) => match serde_json::from_str(&stdout) {
                Ok(serde_json::Value::Object(payload)) => metadata.extend(payload),
                Ok(_) => {
                    metadata.insert("ffprobe_error".to_string(), json!("unexpected_format"));
                }
                Err(_) => {
                    metadata.insert("ffprobe_error".to_string(), json!("invalid_json"));
                }
            },
        }
        metadata
    }

    async fn extract_keyframe(
        &self,
        path: &Path,
        work_dir: &Path,
    ) -> Result<Option<DerivedFile>> {
        std::fs::create_dir_all(work_dir)
            .with_context(|| format!("Failed to create work dir: {}", work_dir.display()))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let destination = work_dir.join(format!("{}_keyframe.jpg", stem));

        match self.frames.extract_first_frame(path, &destination).await {
            ToolOutcome::Output(_) => {
                let mut metadata = MetaMap::new();
                metadata.insert("source".to_string(), json!("ffmpeg"));
                metadata.insert("filter".to_string(), json!("select=eq(n,0)"));
                Ok(Some(DerivedFile {
                    label: "keyframe".to_string(),
                    path: destination,
                    metadata,
                }))
            }
            ToolOutcome::Unavailable | ToolOutcome::Failed(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::DisabledTools;

    #[tokio::test]
    async fn unavailable_tools_leave_marker_and_no_derived_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("clip.mp4");
        std::fs::write(&path, b"fake video bytes").unwrap();

        let extractor = VideoExtractor::new(Arc::new(DisabledTools), Arc::new(DisabledTools));
        let result = extractor
            .extract(&path, &tmp.path().join("keyframes"))
            .await
            .unwrap();

        assert_eq!(result.metadata["ffprobe"], json!("unavailable"));
        assert!(result.derived_files.is_empty());
        assert!(result.text.is_none());
    }

    struct StubProber(String);

    #[async_trait]
    impl MediaProber for StubProber {
        async fn probe(&self, _path: &Path) -> ToolOutcome {
            ToolOutcome::Output(self.0.clone())
        }
    }

    #[tokio::test]
    async fn probe_payload_merged_into_metadata() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("clip.mp4");
        std::fs::write(&path, b"fake").unwrap();

        let payload = r#"{"format": {"format_name": "mov,mp4", "duration": "12.4"}}"#;
        let extractor = VideoExtractor::new(
            Arc::new(StubProber(payload.to_string())),
            Arc::new(DisabledTools),
        );
        let result = extractor
            .extract(&path, &tmp.path().join("keyframes"))
            .await
            .unwrap();

        assert_eq!(
            result.metadata["format"]["format_name"],
            json!("mov,mp4")
        );
    }

    #[tokio::test]
    async fn garbage_probe_output_records_invalid_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("clip.mp4");
        std::fs::write(&path, b"fake").unwrap();

        let extractor = VideoExtractor::new(
            Arc::new(StubProber("not json at all".to_string())),
            Arc::new(DisabledTools),
        );
        let result = extractor
            .extract(&path, &tmp.path().join("keyframes"))
            .await
            .unwrap();

        assert_eq!(result.metadata["ffprobe_error"], json!("invalid_json"));
    }
}
