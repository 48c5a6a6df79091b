//! Core data models used throughout tracecase.
//!
//! These types represent the jobs, entities, derived artifacts, and audit
//! rows that flow through the ingestion and evidence pipeline.

use serde::Serialize;

/// Ordered string-keyed metadata map.
///
/// Values may be strings, numbers, booleans, nested maps, or lists thereof.
/// Serialized to a JSON text column and into proof bundle manifests.
pub type MetaMap = serde_json::Map<String, serde_json::Value>;

/// Supported artifact kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Video,
    Pdf,
    Text,
    /// Reserved for transport collaborators that tag URL-derived content
    /// explicitly; detection itself never returns this.
    Url,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Video => "video",
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Text => "text",
            ArtifactKind::Url => "url",
        }
    }

    /// Parse a stored kind string. Unknown values degrade to `Text`, the
    /// same fallback the detector uses.
    pub fn parse(value: &str) -> ArtifactKind {
        match value {
            "image" => ArtifactKind::Image,
            "video" => ArtifactKind::Video,
            "pdf" => ArtifactKind::Pdf,
            "url" => ArtifactKind::Url,
            _ => ArtifactKind::Text,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status for ingestion jobs. Monotonic:
/// received → processing → {completed, failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Received,
    Processing,
    Completed,
    Failed,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStatus::Received => "received",
            IngestStatus::Processing => "processing",
            IngestStatus::Completed => "completed",
            IngestStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> IngestStatus {
        match value {
            "processing" => IngestStatus::Processing,
            "completed" => IngestStatus::Completed,
            "failed" => IngestStatus::Failed,
            _ => IngestStatus::Received,
        }
    }
}

impl std::fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted ingestion job: one artifact under analysis.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub id: String,
    pub source_uri: String,
    pub original_filename: Option<String>,
    pub artifact_path: String,
    pub kind: ArtifactKind,
    pub status: IngestStatus,
    pub sha256: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub created_at: String, // RFC 3339
    pub completed_at: Option<String>,
    pub metadata: MetaMap,
    pub text_content: Option<String>,
    pub summary: MetaMap,
}

/// Entity extracted from an artifact's text content.
#[derive(Debug, Clone)]
pub struct ExtractedEntity {
    pub id: String,
    pub job_id: String,
    pub kind: String,
    pub value: String,
    pub normalized: Option<String>,
    pub context: Option<String>,
    pub score: Option<f64>,
}

/// File produced during extraction (e.g. a video keyframe), tracked as
/// evidence alongside the original artifact.
#[derive(Debug, Clone)]
pub struct DerivedArtifact {
    pub id: String,
    pub job_id: String,
    pub label: String,
    pub path: String,
    pub sha256: String,
    pub metadata: MetaMap,
}

/// Persisted audit log row. Details are redacted before they reach storage.
#[derive(Debug, Clone)]
pub struct AuditLogRow {
    pub id: String,
    pub job_id: String,
    pub created_at: String, // RFC 3339
    pub level: String,
    pub event: String,
    pub details: serde_json::Value,
}
