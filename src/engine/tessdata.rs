use std::path::{Path, PathBuf};

use thiserror::Error;

const TESSDATA_URL: &str = "https://github.com/tesseract-ocr/tessdata_fast/raw/main";

#[derive(Debug, Error)]
pub enum TessdataError {
    #[error("invalid language code '{0}'")]
    InvalidLanguage(String),

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory for language models: ~/.local/share/paper-ocr/tessdata/
pub fn default_tessdata_dir() -> PathBuf {
    let mut p = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("paper-ocr");
    p.push("tessdata");
    p
}

/// Tesseract language codes look like `eng`, `deu` or `chi_sim`.
pub fn validate_language(language: &str) -> Result<(), TessdataError> {
    let valid = !language.is_empty()
        && !language.starts_with('_')
        && language
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(TessdataError::InvalidLanguage(language.to_string()))
    }
}

fn model_path(dir: &Path, language: &str) -> PathBuf {
    dir.join(format!("{language}.traineddata"))
}

/// Check whether `<language>.traineddata` is present in `dir`.
pub fn model_exists(dir: &Path, language: &str) -> bool {
    model_path(dir, language).is_file()
}

/// Download `<language>.traineddata` into `dir`, reporting progress through
/// `on_progress(bytes_downloaded, total_bytes)`; total is 0 when unknown.
///
/// The file is streamed to a `.part` sibling and renamed once complete, so an
/// interrupted download never looks like a usable model.
pub async fn download_model<F>(
    dir: &Path,
    language: &str,
    on_progress: F,
) -> Result<PathBuf, TessdataError>
where
    F: Fn(u64, u64) + Send + 'static,
{
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    validate_language(language)?;
    tokio::fs::create_dir_all(dir).await?;

    let url = format!("{TESSDATA_URL}/{language}.traineddata");
    log::info!("Downloading {url}");
    let response = reqwest::get(&url).await?.error_for_status()?;
    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let path = model_path(dir, language);
    let partial = path.with_extension("traineddata.part");
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        on_progress(downloaded, total);
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, &path).await?;
    log::info!("Language model downloaded to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_tesseract_language_codes() {
        for code in ["eng", "deu", "chi_sim", "script_latin"] {
            assert!(validate_language(code).is_ok(), "{code}");
        }
    }

    #[test]
    fn rejects_codes_that_could_escape_the_data_dir() {
        for code in ["", "../eng", "eng/..", "ENG", "e n g", "_eng"] {
            assert!(
                matches!(validate_language(code), Err(TessdataError::InvalidLanguage(_))),
                "{code:?}"
            );
        }
    }

    #[test]
    fn model_exists_looks_for_traineddata_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!model_exists(dir.path(), "eng"));

        std::fs::write(dir.path().join("eng.traineddata.part"), b"partial").unwrap();
        assert!(!model_exists(dir.path(), "eng"));

        std::fs::write(dir.path().join("eng.traineddata"), b"model").unwrap();
        assert!(model_exists(dir.path(), "eng"));
        assert!(!model_exists(dir.path(), "deu"));
    }

    #[tokio::test]
    async fn download_refuses_invalid_language_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let err = download_model(dir.path(), "../etc", |_, _| {}).await.unwrap_err();
        assert!(matches!(err, TessdataError::InvalidLanguage(_)));
    }
}
