use std::path::PathBuf;

use gtk4::prelude::*;

use crate::app::controller::Controller;
use crate::clipboard::SystemClipboard;
use crate::config::Config;
use crate::engine::{EngineWorker, RecognitionReply};
use crate::ui::toast::ToastNotifier;
use crate::ui::window::MainWindowWidgets;

/// Events sent from background tasks and widget callbacks to the GTK main thread.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// The file picker (or a drop) produced a file; `None` clears the selection.
    FileChosen(Option<PathBuf>),
    RecognitionFinished(RecognitionReply),
    CopyRequested,
    SaveChosen(PathBuf),
    TessdataProgress(u64, u64),
    TessdataReady,
    EngineReady,
    /// Setup failed but the worker is alive; the next image retries it.
    EngineSetupFailed(String),
    ProcessingError(String),
}

/// Application status.
#[derive(Debug, Clone, PartialEq)]
pub enum AppStatus {
    Starting,
    ModelDownloading,
    Ready,
    Unavailable,
}

/// Central application state. Lives on the GTK main thread inside Rc<RefCell<>>.
pub struct AppState {
    pub status: AppStatus,
    pub config: Config,
    pub controller: Controller,
    pub clipboard: SystemClipboard,
    pub tokio_rt: tokio::runtime::Runtime,
    pub engine: Option<EngineWorker>,
    pub backend_sender: async_channel::Sender<BackendEvent>,

    // UI handles
    pub window: Option<MainWindowWidgets>,
    pub toasts: Option<ToastNotifier>,
}

impl AppState {
    pub fn new(sender: async_channel::Sender<BackendEvent>) -> Self {
        let config = Config::load();
        let tokio_rt = tokio::runtime::Runtime::new()
            .expect("Failed to create tokio runtime");

        Self {
            status: AppStatus::Starting,
            config,
            controller: Controller::new(),
            clipboard: SystemClipboard,
            tokio_rt,
            engine: None,
            backend_sender: sender,
            window: None,
            toasts: None,
        }
    }
}

/// Helper to update status label and state.
pub fn update_status(
    state: &std::rc::Rc<std::cell::RefCell<AppState>>,
    status: AppStatus,
    label_text: &str,
) {
    let mut s = state.borrow_mut();
    s.status = status;
    if let Some(ref window) = s.window {
        window.status_label.set_text(label_text);
        window
            .upload_button
            .set_sensitive(s.status == AppStatus::Ready);
    }
}
