use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tokio::sync::mpsc::UnboundedSender;

use voicegate_foundation::{PipelineError, WorkerState};
use voicegate_vad::VadParams;

use crate::messages::{CaptureFrame, WorkerCommand, WorkerEvent};
use crate::worker::{CaptureWorker, FrameOutcome};

/// Capacity of the capture-to-worker frame queue. At 96 ms frames this is
/// several seconds of headroom before frames are shed.
const FRAME_QUEUE_CAPACITY: usize = 64;

/// Poll interval for the worker loop when no audio is queued.
const IDLE_POLL: Duration = Duration::from_millis(25);

/// Producer handle the capture layer pushes frames into.
///
/// `push` never blocks: when the worker falls behind and the queue is full,
/// the frame is dropped and counted. The capture thread pays a `try_send`
/// and nothing more.
#[derive(Clone)]
pub struct FrameSender {
    tx: Sender<CaptureFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameSender {
    pub fn push(&self, frame: CaptureFrame) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!("worker frame queue full; {} frames dropped so far", dropped);
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("worker frame queue disconnected");
            }
        }
    }

    /// Frames shed because the worker fell behind.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A dedicated worker thread bridging the capture side to the coordinator.
///
/// Frames arrive on a bounded queue fed by [`FrameSender`]; commands arrive
/// on their own channel and take priority over queued audio.
pub struct WorkerThread {
    handle: JoinHandle<()>,
    frames: FrameSender,
    commands: Sender<WorkerCommand>,
}

impl WorkerThread {
    /// Validate the configuration and start the worker thread in `Ready`
    /// state. Configuration errors surface synchronously, before any thread
    /// is spawned.
    pub fn spawn(
        params: VadParams,
        vad_enabled: bool,
        events: UnboundedSender<WorkerEvent>,
    ) -> Result<Self, PipelineError> {
        let mut worker = CaptureWorker::new(events);
        worker.initialize(params, vad_enabled)?;

        let (frame_tx, frame_rx) = bounded(FRAME_QUEUE_CAPACITY);
        let (command_tx, command_rx) = unbounded();

        let handle = thread::Builder::new()
            .name("vad-worker".to_string())
            .spawn(move || run_loop(worker, frame_rx, command_rx))
            .map_err(|e| PipelineError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            handle,
            frames: FrameSender {
                tx: frame_tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            commands: command_tx,
        })
    }

    pub fn frame_sender(&self) -> FrameSender {
        self.frames.clone()
    }

    /// Fire-and-forget command delivery; the worker treats every command as
    /// idempotent.
    pub fn send(&self, command: WorkerCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("worker command channel closed");
        }
    }

    /// Stop the worker and wait for the thread to exit.
    pub fn shutdown(self) {
        self.send(WorkerCommand::Stop);
        drop(self.frames);
        drop(self.commands);
        if self.handle.join().is_err() {
            tracing::error!("vad-worker thread panicked");
        }
    }
}

fn run_loop(
    mut worker: CaptureWorker,
    frames: Receiver<CaptureFrame>,
    commands: Receiver<WorkerCommand>,
) {
    tracing::info!("vad-worker thread started");
    loop {
        // Commands take priority over queued audio.
        while let Ok(command) = commands.try_recv() {
            worker.handle_command(command);
        }
        if worker.state() == WorkerState::Stopped {
            break;
        }
        match frames.recv_timeout(IDLE_POLL) {
            Ok(frame) => {
                if worker.process_frame(frame) == FrameOutcome::Finished {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::info!("vad-worker thread stopped");
}
