//! Proof bundle assembly.
//!
//! A proof bundle is a self-contained, portable snapshot of one ingest
//! job: machine-readable manifests, the redacted audit trail, and
//! byte-exact copies of the original and derived artifacts. The bundle is
//! staged as a directory with a fixed layout and then compressed into a
//! single deflate zip archive next to it.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::TraceError;
use crate::hash::sha256_file;
use crate::jobs::{self, JobRecord};
use crate::models::MetaMap;

/// Top-level manifest written as `ingest.json`.
#[derive(Debug, Serialize)]
struct IngestManifest<'a> {
    job_id: &'a str,
    source_uri: &'a str,
    original_filename: Option<&'a str>,
    kind: &'a str,
    status: &'a str,
    content_type: &'a str,
    size_bytes: i64,
    created_at: &'a str,
    completed_at: Option<&'a str>,
    metadata: &'a MetaMap,
    summary: &'a MetaMap,
}

#[derive(Debug, Serialize)]
struct EntityManifest<'a> {
    kind: &'a str,
    value: &'a str,
    normalized: Option<&'a str>,
    context: Option<&'a str>,
    score: Option<f64>,
}

#[derive(Debug, Serialize)]
struct HashManifest {
    artifact: ArtifactHash,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    derived: Vec<DerivedHash>,
}

/// Paths in the hash manifest are bundle-relative.
#[derive(Debug, Serialize)]
struct ArtifactHash {
    path: String,
    sha256: String,
}

#[derive(Debug, Serialize)]
struct DerivedHash {
    label: String,
    path: String,
    sha256: String,
}

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    timestamp: &'a str,
    level: &'a str,
    event: &'a str,
    details: &'a serde_json::Value,
}

pub struct ProofBuilder {
    proof_dir: PathBuf,
}

impl ProofBuilder {
    pub fn new(config: &Config) -> Result<ProofBuilder> {
        std::fs::create_dir_all(&config.storage.proof_dir)?;
        Ok(ProofBuilder {
            proof_dir: config.storage.proof_dir.clone(),
        })
    }

    /// Assemble the bundle for `job_id` and return the archive path.
    ///
    /// Every derived artifact is re-hashed from disk and compared against
    /// the digest recorded at ingest time; a mismatch aborts the build.
    pub async fn build(
        &self,
        pool: &SqlitePool,
        job_id: &str,
        audit_log: Option<&Path>,
    ) -> Result<PathBuf> {
        let record = jobs::fetch_job(pool, job_id)
            .await?
            .ok_or_else(|| TraceError::JobNotFound(job_id.to_string()))?;

        let staging = self.proof_dir.join(format!("job-{}", job_id));
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        self.write_manifests(&record, &staging)?;

        if let Some(log_path) = audit_log {
            if log_path.is_file() {
                std::fs::copy(log_path, staging.join("audit.jsonl"))?;
            }
        }

        self.copy_artifacts(&record, &staging)?;

        let archive = self.proof_dir.join(format!("job-{}.zip", job_id));
        zip_directory(&staging, &archive)?;
        tracing::info!(job_id, archive = %archive.display(), "proof bundle written");
        Ok(archive)
    }

    fn write_manifests(&self, record: &JobRecord, staging: &Path) -> Result<()> {
        let job = &record.job;
        let manifest = IngestManifest {
            job_id: &job.id,
            source_uri: &job.source_uri,
            original_filename: job.original_filename.as_deref(),
            kind: job.kind.as_str(),
            status: job.status.as_str(),
            content_type: &job.content_type,
            size_bytes: job.size_bytes,
            created_at: &job.created_at,
            completed_at: job.completed_at.as_deref(),
            metadata: &job.metadata,
            summary: &job.summary,
        };
        write_json(&staging.join("ingest.json"), &manifest)?;

        let entities: Vec<EntityManifest> = record
            .entities
            .iter()
            .map(|entity| EntityManifest {
                kind: &entity.kind,
                value: &entity.value,
                normalized: entity.normalized.as_deref(),
                context: entity.context.as_deref(),
                score: entity.score,
            })
            .collect();
        write_json(&staging.join("entities.json"), &entities)?;

        let mut derived_hashes = Vec::new();
        for derived in &record.derived {
            let path = PathBuf::from(&derived.path);
            let computed = sha256_file(&path).with_context(|| {
                format!("Failed to re-hash derived artifact: {}", path.display())
            })?;
            if computed != derived.sha256 {
                return Err(TraceError::DerivedHashMismatch {
                    label: derived.label.clone(),
                    recorded: derived.sha256.clone(),
                    computed,
                }
                .into());
            }
            derived_hashes.push(DerivedHash {
                label: derived.label.clone(),
                path: format!("derived/{}", file_name(&path)),
                sha256: computed,
            });
        }
        let hashes = HashManifest {
            artifact: ArtifactHash {
                path: format!("artifact/{}", file_name(Path::new(&job.artifact_path))),
                sha256: job.sha256.clone(),
            },
            derived: derived_hashes,
        };
        write_json(&staging.join("hashes.json"), &hashes)?;

        let logs: Vec<LogEntry> = record
            .logs
            .iter()
            .map(|row| LogEntry {
                timestamp: &row.created_at,
                level: &row.level,
                event: &row.event,
                details: &row.details,
            })
            .collect();
        write_json(&staging.join("logs.json"), &logs)?;
        Ok(())
    }

    fn copy_artifacts(&self, record: &JobRecord, staging: &Path) -> Result<()> {
        let artifact_dir = staging.join("artifact");
        std::fs::create_dir_all(&artifact_dir)?;
        let source = Path::new(&record.job.artifact_path);
        std::fs::copy(source, artifact_dir.join(file_name(source)))
            .with_context(|| format!("Failed to copy artifact: {}", source.display()))?;

        if !record.derived.is_empty() {
            let derived_dir = staging.join("derived");
            std::fs::create_dir_all(&derived_dir)?;
            for derived in &record.derived {
                let path = Path::new(&derived.path);
                std::fs::copy(path, derived_dir.join(file_name(path)))
                    .with_context(|| format!("Failed to copy derived file: {}", path.display()))?;
            }
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact.bin".to_string())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
    Ok(())
}

/// Deflate-compress `directory` recursively into `archive`, with entry
/// names relative to the directory root.
fn zip_directory(directory: &Path, archive: &Path) -> Result<()> {
    let file = File::create(archive)
        .with_context(|| format!("Failed to create archive: {}", archive.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut stack = vec![directory.to_path_buf()];
    let mut buffer = Vec::new();
    while let Some(dir) = stack.pop() {
        let mut children: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        children.sort();
        for child in children {
            let relative = child
                .strip_prefix(directory)
                .context("entry escaped the staging directory")?
                .to_string_lossy()
                .replace('\\', "/");
            if child.is_dir() {
                writer.add_directory(format!("{}/", relative), options)?;
                stack.push(child);
            } else {
                writer.start_file(relative, options)?;
                buffer.clear();
                File::open(&child)?.read_to_end(&mut buffer)?;
                writer.write_all(&buffer)?;
            }
        }
    }
    writer.finish()?;
    Ok(())
}
