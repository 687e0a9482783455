//! Recognition adapter around the Tesseract OCR engine.
//!
//! The engine instance lives on its own thread (see [`EngineWorker`]); callers
//! talk to it through a cloneable [`EngineHandle`] and receive replies on
//! async channels.

mod tessdata;
mod tesseract;
mod worker;

use thiserror::Error;

pub use tessdata::{default_tessdata_dir, download_model, model_exists, validate_language};
pub use tesseract::TesseractBackend;
pub use worker::{EngineWorker, RecognitionJob, RecognitionReply};

/// Token identifying one file selection. Increases with every selection.
pub type Generation = u64;

/// Everything that can go wrong between a selected file and its text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("failed to read image: {0}")]
    ReadImage(String),

    #[error("image is empty")]
    EmptyImage,

    #[error("engine setup failed: {0}")]
    Setup(String),

    #[error("recognition failed: {0}")]
    Recognize(String),

    /// A newer selection replaced this one before the engine picked it up.
    #[error("superseded by a newer selection")]
    Superseded,

    #[error("engine worker is not running")]
    WorkerGone,
}

/// An OCR engine that can be prepared for a language and then run on images.
///
/// Implementations are driven from a single thread and need not be `Send`.
pub trait OcrBackend {
    /// Load the engine and the language model, then initialize for `language`.
    fn prepare(&mut self, language: &str) -> Result<(), RecognitionError>;

    /// Recognize text in an encoded image (PNG, JPEG, TIFF, ...).
    fn recognize(&mut self, image: &[u8]) -> Result<String, RecognitionError>;
}
