//! Artifact storage path helpers.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Return a collision-safe stem combining prefix, timestamp and a random
/// suffix, e.g. `ingest-20260829T101500-3fa9c2d1`.
pub fn timestamped_stem(prefix: &str) -> String {
    let now = chrono::Utc::now().format("%Y%m%dT%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, now, &suffix[..8])
}

/// Return a fresh storage path for an artifact, keeping the original
/// extension so downstream tools can still recognize the file.
pub fn resolve_artifact_path(original_name: Option<&str>, directory: &Path) -> Result<PathBuf> {
    let extension = Path::new(original_name.unwrap_or("artifact.bin"))
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create directory: {}", directory.display()))?;
    let stem = timestamped_stem("artifact");
    Ok(directory.join(format!("{}{}", stem, extension)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_are_unique() {
        assert_ne!(timestamped_stem("ingest"), timestamped_stem("ingest"));
    }

    #[test]
    fn keeps_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = resolve_artifact_path(Some("payslip.pdf"), tmp.path()).unwrap();
        assert_eq!(path.extension().unwrap(), "pdf");
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn no_name_means_bin_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = resolve_artifact_path(None, tmp.path()).unwrap();
        assert_eq!(path.extension().unwrap(), "bin");
    }
}
