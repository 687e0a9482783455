//! Upload/result state machine, independent of the widget toolkit.
//!
//! Every file selection (including clearing it) starts a new generation.
//! Recognition replies carry the generation they were started for, and a
//! reply from an older generation never touches the displayed state.

use std::path::{Path, PathBuf};

use crate::clipboard::{Clipboard, ClipboardError};
use crate::download::{self, DownloadError};
use crate::engine::{Generation, RecognitionError};

/// Shown in place of the text when recognition fails.
pub const RECOGNITION_ERROR_TEXT: &str = "Error converting image to text";

/// Toast id for the copy confirmation; repeated copies reuse it.
pub const COPIED_TOAST_ID: &str = "copied-to-clipboard";
pub const COPIED_MESSAGE: &str = "Copied to clipboard";

/// Something that can show a short, transient message. Notifications with
/// the same id must not stack.
pub trait Notifier {
    fn notify(&self, id: &'static str, message: &str);
}

/// The image the user picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub path: PathBuf,
    pub name: String,
}

impl UploadedImage {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }
}

/// Work handed to the recognition adapter for one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    pub generation: Generation,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No image selected.
    Idle,
    /// Recognition of the current image is in flight.
    Recognizing,
    /// Image selected and its result (or error text) is displayed.
    Ready,
}

#[derive(Debug, Default)]
pub struct Controller {
    image: Option<UploadedImage>,
    result: String,
    loading: bool,
    generation: Generation,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        match (&self.image, self.loading) {
            (_, true) => Phase::Recognizing,
            (None, false) => Phase::Idle,
            (Some(_), false) => Phase::Ready,
        }
    }

    /// A new file was picked, or the selection was cleared.
    ///
    /// Returns the recognition to schedule for a picked file. Clearing
    /// resets the image and the result at once and makes any in-flight
    /// recognition stale.
    pub fn on_file_selected(&mut self, image: Option<UploadedImage>) -> Option<RecognitionRequest> {
        self.generation += 1;
        match image {
            Some(image) => {
                let request = RecognitionRequest {
                    generation: self.generation,
                    path: image.path.clone(),
                };
                self.image = Some(image);
                Some(request)
            }
            None => {
                self.image = None;
                self.result.clear();
                self.loading = false;
                None
            }
        }
    }

    /// Returns false (and changes nothing) for a stale generation.
    pub fn on_recognition_start(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.loading = true;
        true
    }

    pub fn on_recognition_complete(&mut self, generation: Generation, text: String) -> bool {
        if !self.is_current(generation) {
            log::debug!("Discarding stale result for generation {generation}");
            return false;
        }
        self.result = text;
        self.loading = false;
        true
    }

    pub fn on_recognition_failed(&mut self, generation: Generation, error: &RecognitionError) -> bool {
        if !self.is_current(generation) {
            log::debug!("Discarding stale failure for generation {generation}: {error}");
            return false;
        }
        log::error!("Recognition failed: {error}");
        self.result = RECOGNITION_ERROR_TEXT.to_string();
        self.loading = false;
        true
    }

    /// Copy the displayed text and confirm with a notification.
    /// Returns `Ok(false)` without doing anything when there is no text.
    pub fn copy_to_clipboard<C, N>(&self, clipboard: &mut C, notifier: &N) -> Result<bool, ClipboardError>
    where
        C: Clipboard + ?Sized,
        N: Notifier + ?Sized,
    {
        if self.result.is_empty() {
            return Ok(false);
        }
        clipboard.write_text(&self.result)?;
        notifier.notify(COPIED_TOAST_ID, COPIED_MESSAGE);
        Ok(true)
    }

    /// Save the displayed text to `path`, even when it is empty.
    pub fn download_result(&self, path: &Path) -> Result<u64, DownloadError> {
        download::save_text(path, &self.result)
    }

    /// A result only belongs on screen while its selection is still the
    /// latest one and an image is still selected.
    fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation && self.image.is_some()
    }
}
