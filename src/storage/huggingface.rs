//! HuggingFace artifact fetcher
//!
//! Downloads the configured GGUF artifact from HuggingFace Hub. A file that is
//! already present locally is returned as-is, without touching the network.

use crate::types::model::ModelRef;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Errors raised while retrieving the model artifact
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Invalid artifact filename: '{0}'")]
    InvalidFilename(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Hub returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("Could not determine artifact size")]
    UnknownSize,
    #[error("Download incomplete: got {got} bytes, expected {expected}")]
    Incomplete { got: u64, expected: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flatten an artifact filename into a single safe path component
fn sanitize_local_filename(filename: &str) -> Result<String, RetrievalError> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(RetrievalError::InvalidFilename(filename.to_string()));
    }

    let no_leading = trimmed.trim_start_matches('/');
    let flattened = no_leading.replace('\\', "/").replace('/', "__");

    let mut sanitized = String::with_capacity(flattened.len());
    for ch in flattened.chars() {
        let invalid = matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*');
        if invalid || ch.is_control() {
            sanitized.push('_');
        } else {
            sanitized.push(ch);
        }
    }

    while sanitized.ends_with('.') || sanitized.ends_with(' ') {
        sanitized.pop();
    }

    if sanitized.is_empty() {
        return Err(RetrievalError::InvalidFilename(filename.to_string()));
    }

    Ok(sanitized)
}

/// Ensure a local copy of the artifact exists and return its path
///
/// Idempotent: a non-empty file at the target path short-circuits the download.
/// Data is streamed to a temp file and renamed into place once complete.
pub async fn fetch(model: &ModelRef, models_dir: &Path) -> Result<PathBuf, RetrievalError> {
    let safe_filename = sanitize_local_filename(&model.filename)?;

    fs::create_dir_all(models_dir)?;

    let output_path = models_dir.join(&safe_filename);
    let temp_path = models_dir.join(format!("{}.tmp", safe_filename));

    if output_path.exists() {
        let metadata = fs::metadata(&output_path)?;
        if metadata.len() > 0 {
            tracing::info!("Model already exists: {:?}", output_path);
            return Ok(output_path);
        }
    }

    let url = model.resolve_url();
    tracing::info!("Downloading from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(3600)) // 1 hour timeout for large models
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "ggufchat/0.1.0")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(RetrievalError::Status {
            status: response.status(),
            url,
        });
    }

    let total_size = response.content_length().ok_or(RetrievalError::UnknownSize)?;
    tracing::info!("Artifact size: {}", format_size(total_size));

    let mut temp_file = File::create(&temp_path).await?;

    let mut response = response;
    let mut downloaded: u64 = 0;
    let report_step = (total_size / 4).max(1);
    let mut next_report = report_step;
    while let Some(chunk) = response.chunk().await? {
        temp_file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        if downloaded >= next_report {
            tracing::info!(
                "Downloaded {} / {}",
                format_size(downloaded),
                format_size(total_size)
            );
            next_report += report_step;
        }
    }
    temp_file.flush().await?;
    drop(temp_file);

    if downloaded != total_size {
        return Err(RetrievalError::Incomplete {
            got: downloaded,
            expected: total_size,
        });
    }

    // Atomic rename so a partial download never sits at the final path
    fs::rename(&temp_path, &output_path)?;

    tracing::info!("Download complete: {:?}", output_path);

    Ok(output_path)
}

/// Get a human-readable size string
pub fn format_size(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes < 1024.0 {
        format!("{} B", bytes as u64)
    } else if bytes < 1024.0 * 1024.0 {
        format!("{:.2} KB", bytes / 1024.0)
    } else if bytes < 1024.0 * 1024.0 * 1024.0 {
        format!("{:.2} MB", bytes / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes / (1024.0 * 1024.0 * 1024.0))
    }
}
