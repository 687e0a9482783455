use std::cell::RefCell;
use std::rc::Rc;

use super::state::{AppState, AppStatus, BackendEvent, update_status};
use crate::engine::{self, EngineWorker, RecognitionError, TesseractBackend};

/// Make sure the language model is on disk, downloading it if needed.
/// Sends `TessdataReady` once the engine can be started.
pub fn ensure_tessdata(state: &Rc<RefCell<AppState>>) {
    let (dir, language, sender) = {
        let s = state.borrow();
        (
            s.config.tessdata_dir(),
            s.config.language.clone(),
            s.backend_sender.clone(),
        )
    };

    if let Err(e) = engine::validate_language(&language) {
        update_status(state, AppStatus::Unavailable, &format!("Error: {e}"));
        return;
    }

    if engine::model_exists(&dir, &language) {
        let _ = sender.try_send(BackendEvent::TessdataReady);
        return;
    }

    log::info!("{language}.traineddata not found in {}, starting download", dir.display());
    update_status(state, AppStatus::ModelDownloading, "Downloading language model...");
    let progress_sender = sender.clone();

    state.borrow().tokio_rt.spawn(async move {
        let result = engine::download_model(&dir, &language, move |downloaded, total| {
            let _ = progress_sender.try_send(BackendEvent::TessdataProgress(downloaded, total));
        })
        .await;

        match result {
            Ok(_) => {
                let _ = sender.send(BackendEvent::TessdataReady).await;
            }
            Err(e) => {
                let _ = sender
                    .send(BackendEvent::ProcessingError(format!(
                        "Language model download failed: {e}"
                    )))
                    .await;
            }
        }
    });
}

/// Spawn the engine thread and run the one-time language setup on it.
/// Sends `EngineReady` when the engine can take images.
pub fn start_engine(state: &Rc<RefCell<AppState>>) {
    update_status(state, AppStatus::Starting, "Loading OCR engine...");

    let (dir, language, sender) = {
        let s = state.borrow();
        (
            s.config.tessdata_dir(),
            s.config.language.clone(),
            s.backend_sender.clone(),
        )
    };

    let worker = match EngineWorker::spawn(move || TesseractBackend::new(dir)) {
        Ok(worker) => worker,
        Err(e) => {
            update_status(
                state,
                AppStatus::Unavailable,
                &format!("Error: failed to start OCR engine: {e}"),
            );
            return;
        }
    };

    let prepared = worker.handle().prepare(language);
    state.borrow_mut().engine = Some(worker);

    let prepared = match prepared {
        Ok(rx) => rx,
        Err(e) => {
            update_status(state, AppStatus::Unavailable, &format!("Error: {e}"));
            return;
        }
    };

    state.borrow().tokio_rt.spawn(async move {
        let event = setup_outcome_event(prepared.recv().await);
        let _ = sender.send(event).await;
    });
}

/// Map the reply to the start-up setup. A failed setup leaves the worker
/// running, so selection stays open and the next job retries it; only a
/// stopped worker makes the app unavailable.
fn setup_outcome_event(
    outcome: Result<Result<(), RecognitionError>, async_channel::RecvError>,
) -> BackendEvent {
    match outcome {
        Ok(Ok(())) => BackendEvent::EngineReady,
        Ok(Err(e)) => {
            BackendEvent::EngineSetupFailed(format!("Failed to initialize OCR engine: {e}"))
        }
        Err(_) => BackendEvent::ProcessingError("OCR engine stopped during setup".into()),
    }
}

/// Close the engine queue and wait for its thread.
pub fn shutdown_engine(state: &Rc<RefCell<AppState>>) {
    let engine = state.borrow_mut().engine.take();
    if let Some(mut engine) = engine {
        log::info!("Shutting down OCR engine");
        engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_setup_marks_engine_ready() {
        assert!(matches!(setup_outcome_event(Ok(Ok(()))), BackendEvent::EngineReady));
    }

    #[test]
    fn failed_setup_is_recoverable() {
        let event = setup_outcome_event(Ok(Err(RecognitionError::Setup("no eng model".into()))));
        match event {
            BackendEvent::EngineSetupFailed(message) => assert!(message.contains("no eng model")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn stopped_worker_is_fatal() {
        let event = setup_outcome_event(Err(async_channel::RecvError));
        assert!(matches!(event, BackendEvent::ProcessingError(_)));
    }
}
