//! PDF extraction: document text plus low-level structure metadata.
//!
//! Text extraction and the structure parse are independent: the structure
//! parse (page count, extraction permission, Info dictionary) can succeed
//! on documents whose text layer is broken, and vice versa.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;

use crate::extract::{ExtractionResult, Extractor};
use crate::models::MetaMap;

pub struct PdfExtractor;

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, path: &Path, _work_dir: &Path) -> Result<ExtractionResult> {
        let mut metadata = MetaMap::new();

        let text = match pdf_extract::extract_text(path) {
            Ok(content) => Some(content),
            Err(err) => {
                metadata.insert("text_error".to_string(), json!(err.to_string()));
                None
            }
        };

        collect_structure(path, &mut metadata);

        Ok(ExtractionResult {
            text,
            metadata,
            derived_files: Vec::new(),
        })
    }
}

fn collect_structure(path: &Path, metadata: &mut MetaMap) {
    let document = match lopdf::Document::load(path) {
        Ok(doc) => doc,
        Err(err) => {
            metadata.insert("structure_error".to_string(), json!(err.to_string()));
            return;
        }
    };

    metadata.insert(
        "is_extractable".to_string(),
        json!(!document.is_encrypted()),
    );
    metadata.insert("pages".to_string(), json!(document.get_pages().len()));

    if let Ok(info_obj) = document.trailer.get(b"Info") {
        let dict = match info_obj {
            lopdf::Object::Reference(id) => document
                .get_object(*id)
                .ok()
                .and_then(|obj| obj.as_dict().ok()),
            lopdf::Object::Dictionary(dict) => Some(dict),
            _ => None,
        };
        if let Some(dict) = dict {
            for (key, value) in dict.iter() {
                let key_text = String::from_utf8_lossy(key);
                metadata.insert(
                    format!("info_{}", key_text),
                    json!(object_text(value)),
                );
            }
        }
    }
}

fn object_text(object: &lopdf::Object) -> String {
    match object {
        lopdf::Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
        lopdf::Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
        lopdf::Object::Integer(value) => value.to_string(),
        lopdf::Object::Real(value) => value.to_string(),
        lopdf::Object::Boolean(value) => value.to_string(),
        other => format!("{:?}", other),
    }
}
