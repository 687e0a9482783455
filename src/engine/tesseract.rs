use std::path::PathBuf;

use leptess::LepTess;

use super::{OcrBackend, RecognitionError};

/// Tesseract engine reached through leptess.
///
/// Construction is cheap; the Tesseract API handle is only created by
/// [`OcrBackend::prepare`], which loads `<language>.traineddata` from
/// `data_dir`.
pub struct TesseractBackend {
    data_dir: PathBuf,
    api: Option<LepTess>,
}

impl TesseractBackend {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            api: None,
        }
    }
}

impl OcrBackend for TesseractBackend {
    fn prepare(&mut self, language: &str) -> Result<(), RecognitionError> {
        // Drop the previous handle first so a failed init never leaves a
        // half-configured engine behind.
        self.api = None;

        let data_dir = self.data_dir.to_str().ok_or_else(|| {
            RecognitionError::Setup(format!(
                "tessdata path is not valid UTF-8: {}",
                self.data_dir.display()
            ))
        })?;

        let api = LepTess::new(Some(data_dir), language).map_err(|e| {
            RecognitionError::Setup(format!(
                "Failed to initialize Tesseract for '{language}' from {data_dir}: {e:?}"
            ))
        })?;

        log::info!("Tesseract initialized for '{language}'");
        self.api = Some(api);
        Ok(())
    }

    fn recognize(&mut self, image: &[u8]) -> Result<String, RecognitionError> {
        let api = self
            .api
            .as_mut()
            .ok_or_else(|| RecognitionError::Setup("Tesseract is not initialized".into()))?;

        api.set_image_from_mem(image)
            .map_err(|e| RecognitionError::Recognize(format!("Failed to load image: {e:?}")))?;

        api.get_utf8_text()
            .map_err(|e| RecognitionError::Recognize(format!("Failed to extract text: {e}")))
    }
}
