use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use gtk4::prelude::*;

use super::controller::UploadedImage;
use super::model::start_engine;
use super::pipeline::dispatch_recognition;
use super::state::{AppState, AppStatus, BackendEvent, update_status};
use crate::engine::{RecognitionError, RecognitionReply};

/// Handle a backend event. This is the core state machine.
pub fn handle_backend_event(state: &Rc<RefCell<AppState>>, event: BackendEvent) {
    match event {
        BackendEvent::FileChosen(path) => {
            let current_status = state.borrow().status.clone();
            if current_status != AppStatus::Ready {
                log::info!("Ignoring file selection while status={current_status:?}");
                return;
            }
            on_file_chosen(state, path);
        }
        BackendEvent::RecognitionFinished(reply) => on_recognition_finished(state, reply),
        BackendEvent::CopyRequested => copy_result(state),
        BackendEvent::SaveChosen(path) => save_result(state, &path),
        BackendEvent::TessdataProgress(downloaded, total) => {
            if let Some(ref window) = state.borrow().window {
                window.progress_bar.set_visible(true);
                if total > 0 {
                    window
                        .progress_bar
                        .set_fraction(downloaded as f64 / total as f64);
                    let mb_done = downloaded as f64 / 1_048_576.0;
                    let mb_total = total as f64 / 1_048_576.0;
                    window.progress_bar.set_text(Some(&format!(
                        "Downloading language model: {mb_done:.1} / {mb_total:.1} MB"
                    )));
                } else {
                    window.progress_bar.pulse();
                }
            }
        }
        BackendEvent::TessdataReady => {
            if let Some(ref window) = state.borrow().window {
                window.progress_bar.set_visible(false);
            }
            start_engine(state);
        }
        BackendEvent::EngineReady => {
            log::info!("OCR engine ready");
            update_status(state, AppStatus::Ready, "Ready");
        }
        BackendEvent::EngineSetupFailed(err) => {
            log::warn!("OCR engine setup failed, retrying with the next image: {err}");
            update_status(
                state,
                AppStatus::Ready,
                &format!("Error: {err} (retrying with the next image)"),
            );
        }
        BackendEvent::ProcessingError(err) => {
            log::error!("Processing error: {err}");
            if let Some(ref window) = state.borrow().window {
                window.progress_bar.set_visible(false);
            }
            update_status(state, AppStatus::Unavailable, &format!("Error: {err}"));
        }
    }
}

fn on_file_chosen(state: &Rc<RefCell<AppState>>, path: Option<PathBuf>) {
    let request = {
        let mut s = state.borrow_mut();
        let request = s.controller.on_file_selected(path.map(UploadedImage::from_path));
        let generation = s.controller.generation();
        if let Some(ref engine) = s.engine {
            engine.handle().mark_latest(generation);
        }
        request
    };

    match request {
        Some(request) => dispatch_recognition(state, request),
        None => log::info!("Selection cleared"),
    }
    refresh(state);
}

fn on_recognition_finished(state: &Rc<RefCell<AppState>>, reply: RecognitionReply) {
    let RecognitionReply { generation, outcome } = reply;
    let recognized = outcome.is_ok();
    let applied = {
        let mut s = state.borrow_mut();
        match outcome {
            Ok(text) => s.controller.on_recognition_complete(generation, text),
            Err(RecognitionError::Superseded) => false,
            Err(e) => s.controller.on_recognition_failed(generation, &e),
        }
    };

    if applied {
        log::info!("loading finished");
        if recognized {
            update_status(state, AppStatus::Ready, "Ready");
        }
        refresh(state);
    }
}

fn copy_result(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    let AppState {
        controller,
        clipboard,
        toasts,
        window,
        ..
    } = &mut *s;
    let Some(toasts) = toasts.as_ref() else {
        return;
    };

    match controller.copy_to_clipboard(clipboard, toasts) {
        Ok(true) => log::info!("Result copied to clipboard"),
        Ok(false) => log::debug!("Nothing to copy"),
        Err(e) => {
            log::error!("Clipboard error: {e}");
            if let Some(window) = window.as_ref() {
                window.status_label.set_text(&format!("Clipboard error: {e}"));
            }
        }
    }
}

fn save_result(state: &Rc<RefCell<AppState>>, path: &Path) {
    let s = state.borrow();
    let message = match s.controller.download_result(path) {
        Ok(_) => format!("Saved {}", path.display()),
        Err(e) => {
            log::error!("Save failed: {e}");
            format!("Error: {e}")
        }
    };
    if let Some(ref window) = s.window {
        window.status_label.set_text(&message);
    }
}

/// Push controller state into the widgets.
fn refresh(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    if let Some(ref window) = s.window {
        crate::ui::window::render(window, &s.controller);
    }
}
