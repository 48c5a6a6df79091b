//! End-to-end pipeline tests driving the library against a temporary
//! store and database.

use async_trait::async_trait;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use tracecase::config::{Config, DbConfig, NetworkConfig, StorageConfig, ToolsConfig};
use tracecase::db;
use tracecase::error::TraceError;
use tracecase::export;
use tracecase::extract::{DerivedFile, ExtractionResult, Extractor, ExtractorSet};
use tracecase::ingest::IngestService;
use tracecase::jobs;
use tracecase::migrate;
use tracecase::models::{ArtifactKind, IngestStatus};
use tracecase::proof::ProofBuilder;

fn test_config(root: &Path) -> Config {
    Config {
        storage: StorageConfig {
            data_dir: root.join("artifacts"),
            proof_dir: root.join("proofs"),
            log_dir: root.join("audit-logs"),
        },
        db: DbConfig {
            path: root.join("tracecase.sqlite"),
        },
        network: NetworkConfig::default(),
        tools: ToolsConfig {
            enabled: false,
            timeout_secs: 5,
        },
    }
}

async fn setup(tmp: &TempDir) -> (Config, IngestService) {
    let config = test_config(tmp.path());
    config.ensure_dirs().unwrap();
    let pool = db::connect(&config).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    let service = IngestService::new(config.clone(), pool);
    (config, service)
}

fn read_zip_entry(archive: &Path, name: &str) -> String {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut body = String::new();
    zip.by_name(name).unwrap().read_to_string(&mut body).unwrap();
    body
}

#[tokio::test]
async fn text_ingest_produces_completed_job_and_proof_bundle() {
    let tmp = TempDir::new().unwrap();
    let (_config, service) = setup(&tmp).await;

    let job = service
        .ingest_bytes(
            Some("note.txt"),
            None,
            b"please mail agent@example.org about the invoice",
            Some("mailto:agent@example.org"),
        )
        .await
        .unwrap();

    assert_eq!(job.status, IngestStatus::Completed);
    assert_eq!(job.kind, ArtifactKind::Text);
    assert!(job.completed_at.is_some());
    assert_eq!(job.summary.get("artifact_kind").unwrap(), "text");

    let record = service.get_job(&job.id).await.unwrap().unwrap();
    let email = record
        .entities
        .iter()
        .find(|entity| entity.kind == "email")
        .expect("email entity recognized");
    assert_eq!(email.normalized.as_deref(), Some("agent@example.org"));

    let archive = PathBuf::from(
        job.summary
            .get("proof_archive")
            .and_then(|value| value.as_str())
            .expect("proof archive recorded"),
    );
    assert!(archive.is_file());

    let manifest = read_zip_entry(&archive, "ingest.json");
    assert!(manifest.contains(&job.id));
    assert!(manifest.contains("\"kind\": \"text\""));

    // audit trail ships inside the bundle, already redacted
    let audit = read_zip_entry(&archive, "audit.jsonl");
    assert!(audit.contains("ingest.received"));
    assert!(!audit.contains("agent@example.org"));
    assert!(audit.contains("a***@example.org"));
}

#[tokio::test]
async fn url_ingest_is_refused_when_fetching_is_disabled() {
    let tmp = TempDir::new().unwrap();
    let (config, service) = setup(&tmp).await;
    assert!(!config.network.enable_fetch);

    let error = service
        .ingest_url("https://example.org/evidence.pdf")
        .await
        .unwrap_err();
    assert!(matches!(
        error.downcast_ref::<TraceError>(),
        Some(TraceError::NetworkFetchDisabled)
    ));

    // refused before any job row is written
    let pool = db::connect(&config).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingest_jobs")
        .fetch_one(&pool)
        .await
        .unwrap();
    pool.close().await;
    assert_eq!(count, 0);
}

/// Writes a real keyframe-style derived file so tests can exercise the
/// derived-artifact bookkeeping end to end.
struct KeyframeWritingExtractor;

#[async_trait]
impl Extractor for KeyframeWritingExtractor {
    async fn extract(&self, _path: &Path, work_dir: &Path) -> anyhow::Result<ExtractionResult> {
        std::fs::create_dir_all(work_dir)?;
        let destination = work_dir.join("frame.jpg");
        std::fs::write(&destination, b"frame bytes as extracted")?;
        Ok(ExtractionResult {
            text: Some("mail agent@example.org".to_string()),
            metadata: Default::default(),
            derived_files: vec![DerivedFile {
                label: "keyframe".to_string(),
                path: destination,
                metadata: Default::default(),
            }],
        })
    }
}

#[tokio::test]
async fn tampered_derived_file_fails_proof_rebuild() {
    let tmp = TempDir::new().unwrap();
    let (config, service) = setup(&tmp).await;

    let mut extractors = ExtractorSet::with_disabled_tools();
    extractors.insert(ArtifactKind::Text, Arc::new(KeyframeWritingExtractor));
    let service = service.with_extractors(extractors);

    let job = service
        .ingest_bytes(Some("clip.txt"), None, b"payload", None)
        .await
        .unwrap();
    assert_eq!(job.status, IngestStatus::Completed);

    let record = service.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(record.derived.len(), 1);
    let derived_path = PathBuf::from(&record.derived[0].path);

    // rewrite the derived file's bytes after the hashes were recorded
    std::fs::write(&derived_path, b"tampered after the fact").unwrap();

    let archive = config.storage.proof_dir.join(format!("job-{}.zip", job.id));
    std::fs::remove_file(&archive).unwrap();

    let pool = db::connect(&config).await.unwrap();
    let error = ProofBuilder::new(&config)
        .unwrap()
        .build(&pool, &job.id, None)
        .await
        .unwrap_err();
    pool.close().await;

    assert!(matches!(
        error.downcast_ref::<TraceError>(),
        Some(TraceError::DerivedHashMismatch { label, .. }) if label == "keyframe"
    ));
    assert!(!archive.exists());
}

#[tokio::test]
async fn delete_job_cascades_to_all_children() {
    let tmp = TempDir::new().unwrap();
    let (config, service) = setup(&tmp).await;

    let mut extractors = ExtractorSet::with_disabled_tools();
    extractors.insert(ArtifactKind::Text, Arc::new(KeyframeWritingExtractor));
    let service = service.with_extractors(extractors);

    let job = service
        .ingest_bytes(Some("clip.txt"), None, b"payload", None)
        .await
        .unwrap();

    let pool = db::connect(&config).await.unwrap();
    for table in ["entities", "derived_artifacts", "audit_logs"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(count > 0, "expected rows in {} before deletion", table);
    }

    assert!(jobs::delete_job(&pool, &job.id).await.unwrap());

    for table in ["entities", "derived_artifacts", "audit_logs"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "expected {} emptied by cascade", table);
    }
    assert!(jobs::fetch_job(&pool, &job.id).await.unwrap().is_none());
    // a second delete finds nothing
    assert!(!jobs::delete_job(&pool, &job.id).await.unwrap());
    pool.close().await;
}

#[tokio::test]
async fn export_reports_when_no_proof_was_built() {
    let tmp = TempDir::new().unwrap();
    let (config, service) = setup(&tmp).await;

    let job = service
        .ingest_bytes(Some("note.txt"), None, b"plain note", None)
        .await
        .unwrap();

    // drop the recorded archive reference, as if the build never ran
    let pool = db::connect(&config).await.unwrap();
    sqlx::query("UPDATE ingest_jobs SET summary_json = '{}' WHERE id = ?")
        .bind(&job.id)
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let error = export::locate_proof(&config, &job.id).await.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<TraceError>(),
        Some(TraceError::ProofNotBuilt(id)) if id == &job.id
    ));
}

#[tokio::test]
async fn export_reports_when_archive_vanished_from_disk() {
    let tmp = TempDir::new().unwrap();
    let (config, service) = setup(&tmp).await;

    let job = service
        .ingest_bytes(Some("note.txt"), None, b"plain note", None)
        .await
        .unwrap();
    let archive = PathBuf::from(
        job.summary
            .get("proof_archive")
            .and_then(|value| value.as_str())
            .unwrap(),
    );
    std::fs::remove_file(&archive).unwrap();

    let error = export::locate_proof(&config, &job.id).await.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<TraceError>(),
        Some(TraceError::ProofMissing { job_id, .. }) if job_id == &job.id
    ));
}

struct BrokenDerivedExtractor;

#[async_trait]
impl Extractor for BrokenDerivedExtractor {
    async fn extract(&self, _path: &Path, work_dir: &Path) -> anyhow::Result<ExtractionResult> {
        Ok(ExtractionResult {
            text: Some("payload".to_string()),
            metadata: Default::default(),
            derived_files: vec![DerivedFile {
                label: "keyframe".to_string(),
                path: work_dir.join("never-written.jpg"),
                metadata: Default::default(),
            }],
        })
    }
}

#[tokio::test]
async fn persistence_failure_leaves_a_failed_job_without_partial_writes() {
    let tmp = TempDir::new().unwrap();
    let (config, service) = setup(&tmp).await;

    let mut extractors = ExtractorSet::with_disabled_tools();
    extractors.insert(ArtifactKind::Text, Arc::new(BrokenDerivedExtractor));
    let service = service.with_extractors(extractors);

    let error = service
        .ingest_bytes(Some("note.txt"), None, b"payload", None)
        .await
        .unwrap_err();
    assert!(error.to_string().contains("never-written.jpg"));

    let pool = db::connect(&config).await.unwrap();
    let (status, completed_at): (String, Option<String>) =
        sqlx::query_as("SELECT status, completed_at FROM ingest_jobs LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "failed");
    assert!(completed_at.is_none());

    let entities: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entities")
        .fetch_one(&pool)
        .await
        .unwrap();
    let derived: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM derived_artifacts")
        .fetch_one(&pool)
        .await
        .unwrap();
    pool.close().await;
    assert_eq!(entities, 0);
    assert_eq!(derived, 0);

    // failure still lands in the on-disk audit trail
    let log_file = std::fs::read_dir(&config.storage.log_dir)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let log = std::fs::read_to_string(log_file).unwrap();
    assert!(log.contains("ingest.failed"));
    assert!(log.contains("\"level\":\"error\""));
}

#[tokio::test]
async fn video_ingest_degrades_when_tools_are_disabled() {
    let tmp = TempDir::new().unwrap();
    let (_config, service) = setup(&tmp).await;

    let job = service
        .ingest_bytes(
            Some("clip.bin"),
            Some("video/mp4"),
            b"not really a video, but declared as one",
            None,
        )
        .await
        .unwrap();

    assert_eq!(job.status, IngestStatus::Completed);
    assert_eq!(job.kind, ArtifactKind::Video);
    assert_eq!(job.metadata.get("ffprobe").unwrap(), "unavailable");

    let record = service.get_job(&job.id).await.unwrap().unwrap();
    assert!(record.derived.is_empty());
}
