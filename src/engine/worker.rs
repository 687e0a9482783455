use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::{Generation, OcrBackend, RecognitionError};

/// One image to recognize, tagged with the selection it belongs to.
#[derive(Debug, Clone)]
pub struct RecognitionJob {
    pub generation: Generation,
    pub language: String,
    pub image: Vec<u8>,
}

/// Outcome of a [`RecognitionJob`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionReply {
    pub generation: Generation,
    pub outcome: Result<String, RecognitionError>,
}

enum Command {
    Prepare {
        language: String,
        reply: async_channel::Sender<Result<(), RecognitionError>>,
    },
    Recognize {
        job: RecognitionJob,
        reply: async_channel::Sender<RecognitionReply>,
    },
}

/// Cloneable, `Send` handle used to queue work on an [`EngineWorker`].
#[derive(Clone)]
pub struct EngineHandle {
    commands: async_channel::Sender<Command>,
    latest: Arc<AtomicU64>,
}

impl EngineHandle {
    /// Queue one-time setup for `language`. Setup is memoized by the worker,
    /// so calling this for an already prepared language is free.
    pub fn prepare(
        &self,
        language: impl Into<String>,
    ) -> Result<async_channel::Receiver<Result<(), RecognitionError>>, RecognitionError> {
        let (tx, rx) = async_channel::bounded(1);
        self.commands
            .try_send(Command::Prepare {
                language: language.into(),
                reply: tx,
            })
            .map_err(|_| RecognitionError::WorkerGone)?;
        Ok(rx)
    }

    /// Queue an image. The reply arrives on the returned channel.
    pub fn submit(
        &self,
        job: RecognitionJob,
    ) -> Result<async_channel::Receiver<RecognitionReply>, RecognitionError> {
        let (tx, rx) = async_channel::bounded(1);
        self.commands
            .try_send(Command::Recognize { job, reply: tx })
            .map_err(|_| RecognitionError::WorkerGone)?;
        Ok(rx)
    }

    /// Record the newest selection. Queued jobs from older selections are
    /// skipped instead of being run.
    pub fn mark_latest(&self, generation: Generation) {
        self.latest.fetch_max(generation, Ordering::AcqRel);
    }
}

/// Owns the engine thread. The backend is built on that thread and every
/// command is processed there one at a time, so the engine is never used
/// concurrently.
///
/// Dropping the worker (or calling [`EngineWorker::shutdown`]) closes the
/// queue, lets already queued commands finish, and joins the thread.
pub struct EngineWorker {
    handle: EngineHandle,
    thread: Option<JoinHandle<()>>,
}

impl EngineWorker {
    pub fn spawn<B, F>(make_backend: F) -> std::io::Result<Self>
    where
        B: OcrBackend + 'static,
        F: FnOnce() -> B + Send + 'static,
    {
        let (commands, queue) = async_channel::unbounded::<Command>();
        let latest = Arc::new(AtomicU64::new(0));
        let latest_for_thread = latest.clone();

        let thread = std::thread::Builder::new()
            .name("ocr-engine".into())
            .spawn(move || {
                let backend = make_backend();
                run(backend, queue, latest_for_thread);
            })?;

        Ok(Self {
            handle: EngineHandle { commands, latest },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn shutdown(&mut self) {
        self.handle.commands.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("OCR engine thread panicked");
            }
        }
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<B: OcrBackend>(
    mut backend: B,
    queue: async_channel::Receiver<Command>,
    latest: Arc<AtomicU64>,
) {
    log::info!("OCR engine worker started");
    let mut prepared: Option<String> = None;

    while let Ok(command) = queue.recv_blocking() {
        match command {
            Command::Prepare { language, reply } => {
                let outcome = ensure_prepared(&mut backend, &mut prepared, &language);
                let _ = reply.send_blocking(outcome);
            }
            Command::Recognize { job, reply } => {
                let outcome = if job.generation < latest.load(Ordering::Acquire) {
                    log::info!("Skipping superseded recognition (generation {})", job.generation);
                    Err(RecognitionError::Superseded)
                } else {
                    recognize(&mut backend, &mut prepared, &job)
                };
                let _ = reply.send_blocking(RecognitionReply {
                    generation: job.generation,
                    outcome,
                });
            }
        }
    }

    log::info!("OCR engine worker stopped");
}

fn ensure_prepared<B: OcrBackend>(
    backend: &mut B,
    prepared: &mut Option<String>,
    language: &str,
) -> Result<(), RecognitionError> {
    if prepared.as_deref() == Some(language) {
        return Ok(());
    }
    *prepared = None;
    backend.prepare(language)?;
    *prepared = Some(language.to_string());
    Ok(())
}

fn recognize<B: OcrBackend>(
    backend: &mut B,
    prepared: &mut Option<String>,
    job: &RecognitionJob,
) -> Result<String, RecognitionError> {
    if job.image.is_empty() {
        return Err(RecognitionError::EmptyImage);
    }
    ensure_prepared(backend, prepared, &job.language)?;
    backend.recognize(&job.image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    #[derive(Default, Clone)]
    struct Counters {
        prepares: Arc<AtomicUsize>,
        recognitions: Arc<AtomicUsize>,
    }

    /// Echoes the image bytes back as text.
    struct EchoBackend {
        counters: Counters,
        fail_first_prepare: bool,
        started: Option<mpsc::Sender<()>>,
        gate: Option<mpsc::Receiver<()>>,
    }

    impl EchoBackend {
        fn new(counters: Counters) -> Self {
            Self {
                counters,
                fail_first_prepare: false,
                started: None,
                gate: None,
            }
        }
    }

    impl OcrBackend for EchoBackend {
        fn prepare(&mut self, language: &str) -> Result<(), RecognitionError> {
            let n = self.counters.prepares.fetch_add(1, Ordering::SeqCst);
            if self.fail_first_prepare && n == 0 {
                return Err(RecognitionError::Setup(format!("no model for {language}")));
            }
            Ok(())
        }

        fn recognize(&mut self, image: &[u8]) -> Result<String, RecognitionError> {
            if let Some(started) = &self.started {
                let _ = started.send(());
            }
            if let Some(gate) = &self.gate {
                let _ = gate.recv();
            }
            self.counters.recognitions.fetch_add(1, Ordering::SeqCst);
            Ok(String::from_utf8_lossy(image).into_owned())
        }
    }

    fn job(generation: Generation, text: &str) -> RecognitionJob {
        RecognitionJob {
            generation,
            language: "eng".into(),
            image: text.as_bytes().to_vec(),
        }
    }

    #[test]
    fn setup_runs_once_across_cycles() {
        let counters = Counters::default();
        let backend_counters = counters.clone();
        let worker = EngineWorker::spawn(move || EchoBackend::new(backend_counters)).unwrap();
        let handle = worker.handle();

        handle.prepare("eng").unwrap().recv_blocking().unwrap().unwrap();
        for (generation, text) in [(1, "Hello"), (2, "World"), (3, "Again")] {
            let reply = handle.submit(job(generation, text)).unwrap().recv_blocking().unwrap();
            assert_eq!(reply.generation, generation);
            assert_eq!(reply.outcome, Ok(text.to_string()));
        }

        assert_eq!(counters.prepares.load(Ordering::SeqCst), 1);
        assert_eq!(counters.recognitions.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn switching_language_prepares_again() {
        let counters = Counters::default();
        let backend_counters = counters.clone();
        let worker = EngineWorker::spawn(move || EchoBackend::new(backend_counters)).unwrap();
        let handle = worker.handle();

        let mut deu = job(1, "Hallo");
        deu.language = "deu".into();
        handle.submit(job(1, "Hello")).unwrap().recv_blocking().unwrap();
        handle.submit(deu).unwrap().recv_blocking().unwrap();

        assert_eq!(counters.prepares.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_setup_is_retried_on_next_job() {
        let counters = Counters::default();
        let backend_counters = counters.clone();
        let worker = EngineWorker::spawn(move || {
            let mut backend = EchoBackend::new(backend_counters);
            backend.fail_first_prepare = true;
            backend
        })
        .unwrap();
        let handle = worker.handle();

        let first = handle.submit(job(1, "Hello")).unwrap().recv_blocking().unwrap();
        assert!(matches!(first.outcome, Err(RecognitionError::Setup(_))));

        let second = handle.submit(job(2, "Hello")).unwrap().recv_blocking().unwrap();
        assert_eq!(second.outcome, Ok("Hello".to_string()));
        assert_eq!(counters.prepares.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_image_is_rejected_without_touching_engine() {
        let counters = Counters::default();
        let backend_counters = counters.clone();
        let worker = EngineWorker::spawn(move || EchoBackend::new(backend_counters)).unwrap();

        let reply = worker.handle().submit(job(1, "")).unwrap().recv_blocking().unwrap();
        assert_eq!(reply.outcome, Err(RecognitionError::EmptyImage));
        assert_eq!(counters.prepares.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn queued_stale_job_is_skipped_but_running_job_completes() {
        let counters = Counters::default();
        let backend_counters = counters.clone();
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let worker = EngineWorker::spawn(move || {
            let mut backend = EchoBackend::new(backend_counters);
            backend.started = Some(started_tx);
            backend.gate = Some(gate_rx);
            backend
        })
        .unwrap();
        let handle = worker.handle();

        let running = handle.submit(job(1, "first")).unwrap();
        started_rx.recv().unwrap();
        let queued = handle.submit(job(2, "second")).unwrap();
        handle.mark_latest(3);
        gate_tx.send(()).unwrap();

        let running = running.recv_blocking().unwrap();
        let queued = queued.recv_blocking().unwrap();
        assert_eq!(running.outcome, Ok("first".to_string()));
        assert_eq!(queued.generation, 2);
        assert_eq!(queued.outcome, Err(RecognitionError::Superseded));
        assert_eq!(counters.recognitions.load(Ordering::SeqCst), 1);
    }

    /// Records how many recognitions are inside the backend at once.
    #[derive(Default, Clone)]
    struct OverlapBackend {
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl OcrBackend for OverlapBackend {
        fn prepare(&mut self, _language: &str) -> Result<(), RecognitionError> {
            Ok(())
        }

        fn recognize(&mut self, image: &[u8]) -> Result<String, RecognitionError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(2));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(String::from_utf8_lossy(image).into_owned())
        }
    }

    #[test]
    fn submissions_from_many_threads_never_overlap_in_engine() {
        let backend = OverlapBackend::default();
        let max_in_flight = backend.max_in_flight.clone();
        let worker = EngineWorker::spawn(move || backend).unwrap();

        let submitters: Vec<_> = (0..4u64)
            .map(|thread| {
                let handle = worker.handle();
                std::thread::spawn(move || {
                    (0..5u64)
                        .map(|i| {
                            let generation = thread * 10 + i + 1;
                            let text = format!("t{thread}-{i}");
                            let reply = handle
                                .submit(job(generation, &text))
                                .unwrap()
                                .recv_blocking()
                                .unwrap();
                            assert_eq!(reply.generation, generation);
                            reply.outcome == Ok(text)
                        })
                        .filter(|ok| *ok)
                        .count()
                })
            })
            .collect();

        let completed: usize = submitters.into_iter().map(|t| t.join().unwrap()).sum();
        assert_eq!(completed, 20);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_rejects_new_work() {
        let mut worker = EngineWorker::spawn(|| EchoBackend::new(Counters::default())).unwrap();
        let handle = worker.handle();
        worker.shutdown();

        assert_eq!(handle.submit(job(1, "late")).err(), Some(RecognitionError::WorkerGone));
        assert!(handle.prepare("eng").is_err());
    }

    #[tokio::test]
    async fn replies_can_be_awaited() {
        let worker = EngineWorker::spawn(|| EchoBackend::new(Counters::default())).unwrap();
        let reply = worker
            .handle()
            .submit(job(7, "async"))
            .unwrap()
            .recv()
            .await
            .unwrap();
        assert_eq!(reply.outcome, Ok("async".to_string()));
    }
}
