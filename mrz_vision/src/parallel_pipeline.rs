// THEORY:
// The `parallel_pipeline` keeps a live video feed responsive while an external
// recognizer that is much slower than the camera works through frames. It
// never queues frames: a frame is either handed to the recognizer at once or
// dropped, and the next captured frame is the retry.
//
// Key architectural principles:
// 1.  **Slots, Not Queues**: a `Semaphore` holds `max_in_flight` permits. Submitting
//     is a `try_acquire_owned`; no permit means the frame is dropped. The permit
//     travels with the frame and is released only when its result is published,
//     so the in-flight count can never exceed the bound.
// 2.  **Two Scheduling Domains**: the producer loop pulls frames from the source on
//     the blocking pool and only ever checks for a free slot. The drain task owns
//     every in-flight job in a `FuturesUnordered` and completes them in whatever
//     order the recognizer finishes.
// 3.  **Explicit Handoff**: results leave through a single-slot `Mailbox` (the
//     newest report overwrites an unread one) and an optional bounded listener
//     channel. Nothing is published through shared globals.
// 4.  **Bounded Shutdown**: `stop_stream` stops the producer, waits for in-flight
//     jobs up to a grace period, detaches whatever is still running and drops the
//     listener. After it returns no further events are delivered.

use crate::config::PipelineConfig;
use crate::core_modules::frame::{Frame, FrameHash, FrameId, FrameSource};
use crate::error::{PipelineError, PipelineResult, RecognizerError};
use crate::pipeline::{FrameReport, MrzScanner, ScanResult};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle};

type InFlightJob = BoxFuture<'static, ()>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(FrameId),
    /// Every slot was busy; the frame was discarded.
    Dropped,
}

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Completed(Arc<FrameReport>),
    Failed { frame_id: FrameId, error: RecognizerError },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub submitted: u64,
    pub dropped: u64,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StopReport {
    pub frames_read: u64,
    /// In-flight jobs still running when the grace period ran out.
    pub detached_workers: usize,
}

/// The receiving end of a registered listener.
#[derive(Debug)]
pub struct ResultListener {
    events: mpsc::Receiver<PipelineEvent>,
}

impl ResultListener {
    /// Next event, or `None` once the listener has been released.
    pub async fn recv(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<PipelineEvent> {
        self.events.try_recv().ok()
    }
}

/// Holds at most one unread report. A newer report replaces an unread one.
#[derive(Debug, Default)]
pub struct Mailbox {
    slot: Mutex<Option<Arc<FrameReport>>>,
}

impl Mailbox {
    pub fn put(&self, report: Arc<FrameReport>) {
        if let Some(unread) = lock(&self.slot).replace(report) {
            log::trace!("[MAILBOX] overwrote unread report for frame {}", unread.frame_id);
        }
    }

    pub fn take(&self) -> Option<Arc<FrameReport>> {
        lock(&self.slot).take()
    }
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    dropped: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// State shared by the pipeline handle, the producer loop and in-flight jobs.
struct Shared {
    scanner: MrzScanner,
    config: PipelineConfig,
    runtime: Handle,
    slots: Arc<Semaphore>,
    in_flight: mpsc::Sender<InFlightJob>,
    next_frame_id: AtomicU64,
    counters: Counters,
    mailbox: Mailbox,
    listener: Mutex<Option<mpsc::Sender<PipelineEvent>>>,
}

impl Shared {
    fn submit(self: &Arc<Self>, frame: Frame) -> SubmitOutcome {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return SubmitOutcome::Dropped;
        };
        let frame_id = self.next_frame_id.fetch_add(1, Ordering::Relaxed);
        let hash = frame.hash().clone();

        let worker = Arc::clone(self);
        let recognition = self.runtime.spawn_blocking(move || worker.process(&frame));
        let shared = Arc::clone(self);
        let job = async move {
            let outcome = recognition.await;
            shared.publish(frame_id, hash, outcome);
            drop(permit);
        }
        .boxed();

        match self.in_flight.try_send(job) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                SubmitOutcome::Submitted(frame_id)
            }
            Err(_) => {
                // Drain task is gone; the job and its permit are dropped here.
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                SubmitOutcome::Dropped
            }
        }
    }

    /// Runs on the blocking pool.
    fn process(&self, frame: &Frame) -> Result<Vec<ScanResult>, RecognizerError> {
        let store = self.scanner.store();
        if self.config.max_in_flight == 1 {
            store.clear();
        }
        // Evicts on every exit, including a recognizer panic.
        let _bundle = store.evict_on_drop(frame.hash());
        self.scanner
            .recognize(frame)
            .map(|lines| self.scanner.resolve(frame.hash(), lines))
    }

    fn publish(
        &self,
        frame_id: FrameId,
        frame_hash: FrameHash,
        outcome: Result<Result<Vec<ScanResult>, RecognizerError>, JoinError>,
    ) {
        let event = match outcome.unwrap_or(Err(RecognizerError::Panicked)) {
            Ok(results) => {
                let report = Arc::new(FrameReport { frame_id, frame_hash, results });
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                self.mailbox.put(Arc::clone(&report));
                PipelineEvent::Completed(report)
            }
            Err(error) => {
                log::warn!("[PIPELINE] frame {frame_id} failed: {error}");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                PipelineEvent::Failed { frame_id, error }
            }
        };
        self.notify(event);
    }

    fn notify(&self, event: PipelineEvent) {
        let mut listener = lock(&self.listener);
        let Some(sender) = listener.as_ref() else {
            return;
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("[PIPELINE] listener is full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("[PIPELINE] listener went away");
                *listener = None;
            }
        }
    }

    fn busy_slots(&self) -> usize {
        self.config.max_in_flight - self.slots.available_permits()
    }
}

/// Owns every in-flight job and completes them in finishing order.
async fn drain(mut jobs: mpsc::Receiver<InFlightJob>) {
    let mut running = FuturesUnordered::new();
    loop {
        tokio::select! {
            job = jobs.recv() => match job {
                Some(job) => running.push(job),
                None => break,
            },
            Some(()) = running.next(), if !running.is_empty() => {}
        }
    }
    while running.next().await.is_some() {}
}

struct Stream {
    stop: Arc<AtomicBool>,
    frames_read: Arc<AtomicU64>,
    producer: JoinHandle<()>,
}

/// Pulls frames from `source` until stopped, exhausted or persistently failing.
fn produce(shared: Arc<Shared>, mut source: Box<dyn FrameSource>, stop: Arc<AtomicBool>, frames_read: Arc<AtomicU64>) {
    let backoff = shared.config.idle_backoff();
    let mut consecutive_failures = 0;
    while !stop.load(Ordering::Acquire) {
        match source.read() {
            Ok(Some(frame)) => {
                consecutive_failures = 0;
                frames_read.fetch_add(1, Ordering::Relaxed);
                if stop.load(Ordering::Acquire) {
                    break;
                }
                if let SubmitOutcome::Dropped = shared.submit(frame) {
                    log::trace!("[PIPELINE] all slots busy, frame dropped");
                }
            }
            Ok(None) if source.is_finite() => {
                log::info!("[PIPELINE] source exhausted");
                break;
            }
            Ok(None) => std::thread::sleep(backoff),
            Err(error) => {
                consecutive_failures += 1;
                log::warn!("[PIPELINE] frame read failed ({consecutive_failures}): {error}");
                if consecutive_failures >= shared.config.max_consecutive_read_failures {
                    log::warn!("[PIPELINE] giving up on source after {consecutive_failures} failed reads");
                    break;
                }
                std::thread::sleep(backoff);
            }
        }
    }
    source.close();
}

/// The bounded, asynchronous capture pipeline.
pub struct CapturePipeline {
    shared: Arc<Shared>,
    stream: Mutex<Option<Stream>>,
}

impl CapturePipeline {
    /// Must be called from within a tokio runtime.
    pub fn new(scanner: MrzScanner, config: PipelineConfig) -> PipelineResult<Self> {
        let config = config.validated()?;
        let runtime = Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;
        let (in_flight, jobs) = mpsc::channel(config.max_in_flight);
        runtime.spawn(drain(jobs));

        let shared = Arc::new(Shared {
            scanner,
            slots: Arc::new(Semaphore::new(config.max_in_flight)),
            config,
            runtime,
            in_flight,
            next_frame_id: AtomicU64::new(0),
            counters: Counters::default(),
            mailbox: Mailbox::default(),
            listener: Mutex::new(None),
        });
        Ok(Self { shared, stream: Mutex::new(None) })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.shared.config
    }

    /// Hands `frame` to the recognizer if a slot is free. Never blocks.
    pub fn submit(&self, frame: Frame) -> SubmitOutcome {
        self.shared.submit(frame)
    }

    /// Opens `source` and starts the producer loop.
    pub fn start_stream(&self, mut source: Box<dyn FrameSource>) -> PipelineResult<()> {
        let mut stream = lock(&self.stream);
        if stream.as_ref().is_some_and(|s| !s.producer.is_finished()) {
            return Err(PipelineError::AlreadyStreaming);
        }
        source.open().map_err(PipelineError::SourceUnavailable)?;

        let stop = Arc::new(AtomicBool::new(false));
        let frames_read = Arc::new(AtomicU64::new(0));
        let producer = {
            let shared = Arc::clone(&self.shared);
            let stop = Arc::clone(&stop);
            let frames_read = Arc::clone(&frames_read);
            self.shared
                .runtime
                .spawn_blocking(move || produce(shared, source, stop, frames_read))
        };
        *stream = Some(Stream { stop, frames_read, producer });
        log::info!("[PIPELINE] stream started, {} slot(s)", self.shared.config.max_in_flight);
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        lock(&self.stream).as_ref().is_some_and(|s| !s.producer.is_finished())
    }

    /// Stops the producer, waits up to the grace period for in-flight frames and
    /// releases the listener.
    pub async fn stop_stream(&self) -> StopReport {
        let deadline = tokio::time::Instant::now() + self.shared.config.shutdown_grace();
        let stream = lock(&self.stream).take();

        let mut frames_read = 0;
        if let Some(stream) = stream {
            stream.stop.store(true, Ordering::Release);
            if tokio::time::timeout_at(deadline, stream.producer).await.is_err() {
                log::warn!("[PIPELINE] producer still blocked in the source, detaching it");
            }
            frames_read = stream.frames_read.load(Ordering::Relaxed);
        }

        let all_slots = self.shared.config.max_in_flight as u32;
        let waited = tokio::time::timeout_at(deadline, Arc::clone(&self.shared.slots).acquire_many_owned(all_slots)).await;
        let detached_workers = match waited {
            Ok(permits) => {
                drop(permits);
                0
            }
            Err(_) => {
                let busy = self.shared.busy_slots();
                log::warn!("[PIPELINE] detaching {busy} in-flight frame(s) after grace period");
                busy
            }
        };

        self.clear_listener();
        log::info!("[PIPELINE] stream stopped after {frames_read} frame(s)");
        StopReport { frames_read, detached_workers }
    }

    /// Registers the single listener, replacing any previous one.
    pub fn add_listener(&self) -> ResultListener {
        let (sender, events) = mpsc::channel(self.shared.config.event_capacity);
        *lock(&self.shared.listener) = Some(sender);
        ResultListener { events }
    }

    pub fn clear_listener(&self) {
        lock(&self.shared.listener).take();
    }

    /// The newest report not yet taken.
    pub fn take_latest(&self) -> Option<Arc<FrameReport>> {
        self.shared.mailbox.take()
    }

    pub fn stats(&self) -> PipelineStats {
        self.shared.counters.snapshot()
    }

    /// Frames currently held by the recognizer.
    pub fn in_flight(&self) -> usize {
        self.shared.busy_slots()
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        if let Some(stream) = lock(&self.stream).take() {
            stream.stop.store(true, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::recognizer::{ArtifactSink, LineItem};

    fn report(frame_id: FrameId) -> Arc<FrameReport> {
        Arc::new(FrameReport {
            frame_id,
            frame_hash: FrameHash::from("sha256:00"),
            results: Vec::new(),
        })
    }

    #[test]
    fn mailbox_keeps_only_newest() {
        let mailbox = Mailbox::default();
        assert!(mailbox.take().is_none());
        mailbox.put(report(1));
        mailbox.put(report(2));
        assert_eq!(mailbox.take().map(|r| r.frame_id), Some(2));
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn needs_a_runtime() {
        let idle = |_: &Frame, _: &ArtifactSink| -> Result<Vec<LineItem>, RecognizerError> { Ok(Vec::new()) };
        let scanner = MrzScanner::new(Arc::new(idle));
        assert!(matches!(
            CapturePipeline::new(scanner, PipelineConfig::default()),
            Err(PipelineError::NoRuntime)
        ));
    }
}
