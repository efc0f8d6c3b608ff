//! Pipeline worker thread.
//!
//! The worker drives the full chain — read, decode, filter, window, format,
//! write — sequentially on its own thread, so no two stages ever touch the
//! window concurrently. It communicates with the controlling thread through
//! a single-producer/single-consumer crossbeam channel of
//! [`ProgressEvent`]s and a shared stop flag for cooperative cancellation.
//!
//! # Lifecycle
//!
//! `Idle -> Running -> {Completed | Failed}`. End of stream (non-follow)
//! emits a terminal 100% and completes the run. A fatal decode, IO, or
//! configuration error emits one `Error` event and fails the run without
//! crashing the caller. Cancellation completes, never fails, and the output
//! sink is flushed on every exit path.

use crate::codec::MessageCodec;
use crate::config::RunConfig;
use crate::error::{Result, ResultExt};
use crate::filter::MessageFilter;
use crate::format::OutputFormatter;
use crate::reader::{FrameEvent, FrameReader};
use crate::types::{Message, BAD_PREFIX_REASON};
use crate::window::{SampleHoldWindow, WindowUpdate};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Progress events are deduplicated to whole-percent changes, so a run
/// produces at most ~100 of them plus one terminal event; this capacity
/// can absorb a full run before the controller drains anything.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Progress and error reports published by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Percent complete in `0..=100`, estimated from bytes consumed.
    Progress(u8),
    /// A fatal error; the run is over after this event.
    Error(String),
}

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Runs one configured pipeline over one input stream.
pub struct PipelineWorker {
    config: RunConfig,
    codec: Box<dyn MessageCodec>,
    event_tx: Sender<ProgressEvent>,
    running: Arc<AtomicBool>,
    state: WorkerState,
}

impl PipelineWorker {
    pub fn new(
        config: RunConfig,
        codec: Box<dyn MessageCodec>,
        event_tx: Sender<ProgressEvent>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            codec,
            event_tx,
            running,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Run the pipeline to completion on the current thread. `total_bytes`
    /// (the input length, when known) enables progress estimates.
    pub fn run(
        &mut self,
        source: Box<dyn Read + Send>,
        total_bytes: Option<u64>,
        mut sink: Box<dyn Write + Send>,
    ) -> WorkerState {
        tracing::info!("Pipeline worker started (dialect: {})", self.codec.dialect());
        self.state = WorkerState::Running;

        let result = self.process(source, total_bytes, &mut sink);

        // The sink is owned by the worker for the run's duration; flush it
        // on every exit path before reporting the terminal state.
        if let Err(e) = sink.flush() {
            tracing::warn!("Failed to flush output sink: {}", e);
        }
        drop(sink);

        match result {
            Ok(()) => {
                let _ = self.event_tx.send(ProgressEvent::Progress(100));
                self.state = WorkerState::Completed;
                tracing::info!("Pipeline worker completed");
            }
            Err(e) => {
                tracing::error!("Pipeline worker failed: {}", e);
                let _ = self.event_tx.send(ProgressEvent::Error(e.to_string()));
                self.state = WorkerState::Failed;
            }
        }
        self.state
    }

    fn process(
        &mut self,
        source: Box<dyn Read + Send>,
        total_bytes: Option<u64>,
        sink: &mut Box<dyn Write + Send>,
    ) -> Result<()> {
        let mut reader =
            FrameReader::new(source, &self.config, self.running.clone(), total_bytes);
        let filter = MessageFilter::from_config(&self.config);
        let mut window = SampleHoldWindow::from_config(&self.config, &*self.codec)
            .context("Failed to build the sample-hold window")?;
        let formatter = OutputFormatter::from_config(&self.config, &window)
            .context("Failed to build the output formatter")?;

        if let Some(header) = formatter.header() {
            sink.write_all(header.as_bytes())?;
        }

        let mut last_percent = None;
        loop {
            if !self.running.load(Ordering::SeqCst) {
                tracing::info!("Pipeline worker cancelled");
                break;
            }

            let msg = match reader.next(&*self.codec)? {
                FrameEvent::Eof => break,
                FrameEvent::Frame(frame) => {
                    let mut msg = self.codec.decode(&frame.payload)?;
                    msg.set_timestamp(frame.timestamp_us);
                    msg
                }
                FrameEvent::Skipped {
                    timestamp_us,
                    bytes,
                } => Message::bad(BAD_PREFIX_REASON, timestamp_us, bytes),
            };

            if filter.accept(&msg, &*self.codec) {
                if let WindowUpdate::RowReady(row) = window.update(&msg) {
                    let rendered = formatter.render(&msg, &row)?;
                    sink.write_all(&rendered)?;
                }
            }

            if let Some(percent) = reader.progress_percent() {
                if last_percent != Some(percent) {
                    let _ = self.event_tx.send(ProgressEvent::Progress(percent));
                    last_percent = Some(percent);
                }
            }
        }
        Ok(())
    }
}

/// Handle to a spawned worker: the event channel, the stop flag, and the
/// join handle.
pub struct WorkerHandle {
    events: Receiver<ProgressEvent>,
    running: Arc<AtomicBool>,
    handle: JoinHandle<WorkerState>,
}

impl WorkerHandle {
    /// The progress/error channel. Momentarily empty does not mean done;
    /// the channel disconnects when the worker exits.
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// The shared stop flag, for wiring into signal handlers.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Request cooperative cancellation. The worker observes the flag
    /// within one poll interval and completes.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for the worker to exit and return its terminal state.
    pub fn join(self) -> WorkerState {
        self.handle.join().unwrap_or(WorkerState::Failed)
    }
}

/// Spawn a worker on a dedicated thread.
pub fn spawn(
    config: RunConfig,
    codec: Box<dyn MessageCodec>,
    source: Box<dyn Read + Send>,
    total_bytes: Option<u64>,
    sink: Box<dyn Write + Send>,
) -> WorkerHandle {
    let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    let handle = std::thread::spawn(move || {
        let mut worker = PipelineWorker::new(config, codec, event_tx, running_clone);
        worker.run(source, total_bytes, sink)
    });
    WorkerHandle {
        events: event_rx,
        running,
        handle,
    }
}
