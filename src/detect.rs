//! Artifact kind detection.
//!
//! Classifies a stored file into one of the supported [`ArtifactKind`]s
//! using magic-byte sniffing first, then the caller-declared MIME type,
//! then an extension-based MIME guess, then a filename heuristic. There is
//! no error path: anything unclassifiable degrades to `Text` so the
//! pipeline never blocks on unknown input.

use std::path::Path;

use crate::models::ArtifactKind;

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Default, Clone)]
pub struct ArtifactDetector;

impl ArtifactDetector {
    pub fn new() -> ArtifactDetector {
        ArtifactDetector
    }

    /// Return the artifact kind and the MIME type it was derived from.
    pub fn detect(&self, path: &Path, declared_mime: Option<&str>) -> (ArtifactKind, String) {
        let sniffed = infer::get_from_path(path)
            .ok()
            .flatten()
            .map(|t| t.mime_type().to_string());

        let mime = sniffed
            .or_else(|| declared_mime.map(str::to_string))
            .or_else(|| {
                mime_guess::from_path(path)
                    .first_raw()
                    .map(str::to_string)
            })
            .unwrap_or_else(|| FALLBACK_MIME.to_string());

        (map_mime_to_kind(&mime, path), mime)
    }
}

fn map_mime_to_kind(mime: &str, path: &Path) -> ArtifactKind {
    let lowered = mime.to_ascii_lowercase();
    if lowered.starts_with("image/") {
        return ArtifactKind::Image;
    }
    if lowered.starts_with("video/") {
        return ArtifactKind::Video;
    }
    if lowered == "application/pdf" || lowered == "application/x-pdf" {
        return ArtifactKind::Pdf;
    }
    if lowered.starts_with("text/") {
        return ArtifactKind::Text;
    }
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if extension == "pdf" {
        return ArtifactKind::Pdf;
    }
    if matches!(extension.as_str(), "txt" | "md" | "csv" | "log") {
        return ArtifactKind::Text;
    }
    ArtifactKind::Text
}
