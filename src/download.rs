//! Saving recognized text to a file.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// File name offered when saving the recognized text.
pub const DEFAULT_FILE_NAME: &str = "converted.txt";

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{0} is not a file path")]
    NotAFile(PathBuf),

    #[error("failed to save {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The configured file name, or [`DEFAULT_FILE_NAME`] when it is blank.
pub fn suggested_name(name: &str) -> &str {
    if name.trim().is_empty() {
        DEFAULT_FILE_NAME
    } else {
        name
    }
}

/// Write `text` byte-for-byte to `path` and return the number of bytes.
///
/// The bytes go to a temporary file next to the target which is renamed over
/// it once complete; the temporary file is removed if anything fails. Empty
/// text still produces an (empty) file.
pub fn save_text(path: &Path, text: &str) -> Result<u64, DownloadError> {
    if path.file_name().is_none() {
        return Err(DownloadError::NotAFile(path.to_path_buf()));
    }
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(text.as_bytes()).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    log::info!("Saved {} bytes to {}", text.len(), path.display());
    Ok(text.len() as u64)
}
