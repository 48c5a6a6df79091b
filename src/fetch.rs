//! Remote artifact fetching, gated by configuration.
//!
//! Downloads are opt-in: when `[network] enable_fetch` is off the call
//! fails immediately with [`TraceError::NetworkFetchDisabled`], before any
//! filesystem or database side effect.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::TraceError;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Download `url` to `destination`, returning the stored path and the
/// Content-Type the server declared.
pub async fn download_url(
    config: &Config,
    url: &str,
    destination: &Path,
) -> Result<(PathBuf, String)> {
    if !config.network.enable_fetch {
        return Err(TraceError::NetworkFetchDisabled.into());
    }

    tracing::info!(url, "fetching remote artifact");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.network.timeout_secs))
        .build()?;
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch URL: {}", url))?
        .error_for_status()
        .with_context(|| format!("Server rejected fetch: {}", url))?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        // strip parameters like "; charset=utf-8"
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string());

    let bytes = response.bytes().await?;
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(destination, &bytes)
        .with_context(|| format!("Failed to store download: {}", destination.display()))?;

    Ok((destination.to_path_buf(), content_type))
}

/// Derive a filename hint from the trailing URL path segment.
pub fn url_filename(url: &str) -> Option<String> {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    let name = trimmed.rsplit('/').next().unwrap_or("");
    if name.is_empty() || name.contains(':') {
        None
    } else {
        Some(name.to_string())
    }
}
