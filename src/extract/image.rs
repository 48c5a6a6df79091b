//! Image extraction: dimensions, perceptual hash, capture metadata, OCR.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::extract::{ExtractionResult, Extractor};
use crate::models::MetaMap;
use crate::tools::{OpticalReader, ToolOutcome};

pub struct ImageExtractor {
    ocr: Arc<dyn OpticalReader>,
}

impl ImageExtractor {
    pub fn new(ocr: Arc<dyn OpticalReader>) -> ImageExtractor {
        ImageExtractor { ocr }
    }
}

#[async_trait]
impl Extractor for ImageExtractor {
    async fn extract(&self, path: &Path, _work_dir: &Path) -> Result<ExtractionResult> {
        let mut metadata = MetaMap::new();

        // EXIF is read from the raw container, independent of decoding.
        collect_exif(path, &mut metadata);

        let text = match image::open(path) {
            Ok(img) => {
                metadata.insert("width".to_string(), json!(img.width()));
                metadata.insert("height".to_string(), json!(img.height()));
                if let Ok(format) = image::ImageFormat::from_path(path) {
                    metadata.insert("format".to_string(), json!(format!("{:?}", format)));
                }
                metadata.insert("mode".to_string(), json!(format!("{:?}", img.color())));
                metadata.insert("phash".to_string(), json!(dhash_hex(&img)));
                match self.ocr.read_text(path).await {
                    ToolOutcome::Output(raw) => {
                        let cleaned = raw.trim().to_string();
                        if cleaned.is_empty() {
                            None
                        } else {
                            Some(cleaned)
                        }
                    }
                    // OCR unavailability or failure is non-fatal
                    ToolOutcome::Unavailable | ToolOutcome::Failed(_) => None,
                }
            }
            Err(err) => {
                metadata.insert("decode_error".to_string(), json!(err.to_string()));
                None
            }
        };

        Ok(ExtractionResult {
            text,
            metadata,
            derived_files: Vec::new(),
        })
    }
}

fn collect_exif(path: &Path, metadata: &mut MetaMap) {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return,
    };
    let mut reader = std::io::BufReader::new(file);
    if let Ok(exif) = exif::Reader::new().read_from_container(&mut reader) {
        for field in exif.fields() {
            metadata.insert(
                exif_key(field.ifd_num, field.tag),
                json!(field.display_value().with_unit(&exif).to_string()),
            );
        }
    }
}

/// Keys carry the IFD so a tag repeated across the primary and thumbnail
/// images (Orientation, resolution tags) does not overwrite itself.
fn exif_key(ifd_num: exif::In, tag: exif::Tag) -> String {
    format!("exif_{}_{}", ifd_num, tag)
}

/// Difference hash over a 9×8 grayscale thumbnail: 64 bits comparing each
/// pixel to its right neighbor, hex-encoded. Stable under resizing and
/// re-encoding, which makes it usable for near-duplicate detection.
pub fn dhash_hex(img: &image::DynamicImage) -> String {
    let thumb = img
        .resize_exact(9, 8, image::imageops::FilterType::Triangle)
        .to_luma8();
    let mut bits: u64 = 0;
    for y in 0..8u32 {
        for x in 0..8u32 {
            bits <<= 1;
            if thumb.get_pixel(x, y).0[0] > thumb.get_pixel(x + 1, y).0[0] {
                bits |= 1;
            }
        }
    }
    format!("{:016x}", bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::DisabledTools;

    fn gradient_image() -> image::DynamicImage {
        let buf = image::ImageBuffer::from_fn(32, 32, |x, _y| image::Luma([(x * 8) as u8]));
        image::DynamicImage::ImageLuma8(buf)
    }

    #[tokio::test]
    async fn decodes_dimensions_and_phash() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("shot.png");
        gradient_image().save(&path).unwrap();

        let extractor = ImageExtractor::new(Arc::new(DisabledTools));
        let result = extractor.extract(&path, tmp.path()).await.unwrap();

        assert_eq!(result.metadata["width"], json!(32));
        assert_eq!(result.metadata["height"], json!(32));
        assert_eq!(result.metadata["format"], json!("Png"));
        assert!(result.metadata.contains_key("phash"));
        // OCR unavailable: no text, but that is not an error
        assert!(result.text.is_none());
    }

    #[tokio::test]
    async fn undecodable_image_degrades_with_diagnostic() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"not actually a png").unwrap();

        let extractor = ImageExtractor::new(Arc::new(DisabledTools));
        let result = extractor.extract(&path, tmp.path()).await.unwrap();

        assert!(result.metadata.contains_key("decode_error"));
        assert!(result.text.is_none());
    }

    #[test]
    fn dhash_stable_under_resize() {
        let original = gradient_image();
        let resized = original.resize_exact(64, 64, image::imageops::FilterType::Triangle);
        assert_eq!(dhash_hex(&original), dhash_hex(&resized));
    }

    #[test]
    fn exif_keys_distinct_per_ifd() {
        let primary = exif_key(exif::In::PRIMARY, exif::Tag::Orientation);
        let thumbnail = exif_key(exif::In::THUMBNAIL, exif::Tag::Orientation);
        assert_ne!(primary, thumbnail);
        assert!(primary.starts_with("exif_"));
        assert!(primary.ends_with("Orientation"));
        assert!(thumbnail.ends_with("Orientation"));
    }

    #[test]
    fn dhash_distinguishes_different_content() {
        let ascending = gradient_image();
        let descending = image::DynamicImage::ImageLuma8(image::ImageBuffer::from_fn(
            32,
            32,
            |x, _y| image::Luma([255 - (x * 8) as u8]),
        ));
        assert_ne!(dhash_hex(&ascending), dhash_hex(&descending));
    }
}
