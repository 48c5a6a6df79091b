//! Per-kind extraction strategies.
//!
//! Each [`ArtifactKind`] has one [`Extractor`] implementation that turns a
//! stored file into extracted text (optional), structured metadata, and
//! zero or more derived files. Extractors degrade on malformed input —
//! they record a diagnostic metadata key instead of failing the run.
//! Strategy selection happens in one place, the [`ExtractorSet`] lookup.

pub mod image;
pub mod pdf;
pub mod text;
pub mod video;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::models::{ArtifactKind, MetaMap};
use crate::tools::{
    DisabledTools, FfmpegFrameExtractor, FfprobeProber, TesseractReader,
};

/// File produced during extraction that must be tracked as evidence.
#[derive(Debug, Clone)]
pub struct DerivedFile {
    pub label: String,
    pub path: PathBuf,
    pub metadata: MetaMap,
}

/// Structured output from an extractor.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub text: Option<String>,
    pub metadata: MetaMap,
    pub derived_files: Vec<DerivedFile>,
}

/// Capability interface implemented once per artifact kind.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, path: &Path, work_dir: &Path) -> Result<ExtractionResult>;
}

/// Kind → strategy lookup table. The single dispatch point for extraction.
pub struct ExtractorSet {
    map: HashMap<ArtifactKind, Arc<dyn Extractor>>,
    fallback: Arc<dyn Extractor>,
}

impl ExtractorSet {
    /// Build the production set. When `tools.enabled` is off, OCR and
    /// video tooling are replaced by [`DisabledTools`].
    pub fn from_config(config: &Config) -> ExtractorSet {
        if !config.tools.enabled {
            return Self::with_disabled_tools();
        }
        let ocr = Arc::new(TesseractReader::new(config));
        let prober = Arc::new(FfprobeProber::new(config));
        let frames = Arc::new(FfmpegFrameExtractor::new(config));
        let mut set = Self::with_disabled_tools();
        set.insert(ArtifactKind::Image, Arc::new(image::ImageExtractor::new(ocr)));
        set.insert(
            ArtifactKind::Video,
            Arc::new(video::VideoExtractor::new(prober, frames)),
        );
        set
    }

    /// Full strategy table with all external tools reporting unavailable.
    /// Used by tests and tool-less deployments.
    pub fn with_disabled_tools() -> ExtractorSet {
        let fallback: Arc<dyn Extractor> = Arc::new(text::TextExtractor);
        let mut map: HashMap<ArtifactKind, Arc<dyn Extractor>> = HashMap::new();
        map.insert(ArtifactKind::Text, fallback.clone());
        map.insert(ArtifactKind::Pdf, Arc::new(pdf::PdfExtractor));
        map.insert(
            ArtifactKind::Image,
            Arc::new(image::ImageExtractor::new(Arc::new(DisabledTools))),
        );
        map.insert(
            ArtifactKind::Video,
            Arc::new(video::VideoExtractor::new(
                Arc::new(DisabledTools),
                Arc::new(DisabledTools),
            )),
        );
        ExtractorSet { map, fallback }
    }

    /// Replace the strategy for one kind. Test seam, also usable by
    /// embedders with custom tooling.
    pub fn insert(&mut self, kind: ArtifactKind, extractor: Arc<dyn Extractor>) {
        self.map.insert(kind, extractor);
    }

    /// Look up the strategy for a kind; unmapped kinds (e.g. `Url`) fall
    /// back to the text strategy, mirroring the detector's default.
    pub fn get(&self, kind: ArtifactKind) -> Arc<dyn Extractor> {
        self.map.get(&kind).cloned().unwrap_or_else(|| self.fallback.clone())
    }
}
