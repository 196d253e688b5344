//! Local storage
//!
//! Data directory resolution and the HuggingFace artifact fetcher.

pub mod huggingface;

use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not determine a data directory for this platform")]
    NoDataDir,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Get the application data directory, creating it if needed
pub fn get_data_dir() -> Result<PathBuf, StorageError> {
    let dirs = ProjectDirs::from("", "", "ggufchat").ok_or(StorageError::NoDataDir)?;
    let dir = dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
