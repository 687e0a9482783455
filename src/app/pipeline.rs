use std::cell::RefCell;
use std::rc::Rc;

use super::controller::RecognitionRequest;
use super::state::{AppState, BackendEvent};
use crate::engine::{RecognitionError, RecognitionJob, RecognitionReply};

/// Read the selected image and queue it on the engine thread. The reply comes
/// back as `BackendEvent::RecognitionFinished`.
pub fn dispatch_recognition(state: &Rc<RefCell<AppState>>, request: RecognitionRequest) {
    let RecognitionRequest { generation, path } = request;

    let mut s = state.borrow_mut();
    if !s.controller.on_recognition_start(generation) {
        return;
    }
    log::info!("loading started ({})", path.display());

    let sender = s.backend_sender.clone();
    let language = s.config.language.clone();
    let Some(handle) = s.engine.as_ref().map(|e| e.handle()) else {
        let reply = RecognitionReply {
            generation,
            outcome: Err(RecognitionError::WorkerGone),
        };
        let _ = sender.try_send(BackendEvent::RecognitionFinished(reply));
        return;
    };
    handle.mark_latest(generation);

    s.tokio_rt.spawn(async move {
        let outcome = match tokio::fs::read(&path).await {
            Ok(image) => {
                let job = RecognitionJob {
                    generation,
                    language,
                    image,
                };
                match handle.submit(job) {
                    Ok(reply) => match reply.recv().await {
                        Ok(reply) => reply.outcome,
                        Err(_) => Err(RecognitionError::WorkerGone),
                    },
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(RecognitionError::ReadImage(format!("{}: {e}", path.display()))),
        };

        let _ = sender
            .send(BackendEvent::RecognitionFinished(RecognitionReply {
                generation,
                outcome,
            }))
            .await;
    });
}
