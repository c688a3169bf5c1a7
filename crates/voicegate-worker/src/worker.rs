use tokio::sync::mpsc::UnboundedSender;

use voicegate_foundation::{PipelineError, WorkerState};
use voicegate_vad::{
    codec, detector, energy, FrameMetrics, PcmFrame, SegmentEvent, SpeechScorer, VadParams,
    VadSegmenter, VadState,
};

use crate::messages::{CaptureFrame, WorkerCommand, WorkerEvent};

/// Outcome of a single `process_frame` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Keep delivering frames.
    Continue,
    /// The worker is stopped; the host can reclaim the callback slot.
    Finished,
}

/// The real-time half of the pipeline.
///
/// Owns the detector and segmenter and is driven one frame per capture
/// callback, either directly by the capture layer or by [`WorkerThread`].
/// All output leaves through the event channel; sends are fire-and-forget,
/// so processing a frame never blocks and never allocates beyond the
/// converted frame itself.
///
/// [`WorkerThread`]: crate::thread::WorkerThread
pub struct CaptureWorker {
    state: WorkerState,
    vad_enabled: bool,
    scorer: Option<Box<dyn SpeechScorer>>,
    segmenter: Option<VadSegmenter>,
    events: UnboundedSender<WorkerEvent>,
    /// Stream position derived from processed sample counts.
    clock_ms: f64,
}

impl CaptureWorker {
    pub fn new(events: UnboundedSender<WorkerEvent>) -> Self {
        Self {
            state: WorkerState::Uninitialized,
            vad_enabled: true,
            scorer: None,
            segmenter: None,
            events,
            clock_ms: 0.0,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Validate and store parameters, build the detector, and move
    /// `Uninitialized -> Ready`. On failure the worker stays uninitialized.
    pub fn initialize(&mut self, params: VadParams, vad_enabled: bool) -> Result<(), PipelineError> {
        params.validate().map_err(PipelineError::Config)?;
        let scorer = detector::build_scorer(params.detector).map_err(PipelineError::Config)?;
        self.state.transition(WorkerState::Ready)?;
        self.segmenter = Some(VadSegmenter::new(params));
        self.scorer = Some(scorer);
        self.vad_enabled = vad_enabled;
        tracing::info!(vad_enabled, "worker initialized");
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), PipelineError> {
        self.state.transition(WorkerState::Running)
    }

    /// Suspend processing, discarding any in-flight utterance without a
    /// `SpeechEnd`.
    pub fn pause(&mut self) -> Result<(), PipelineError> {
        self.state.transition(WorkerState::Ready)?;
        if let Some(segmenter) = &mut self.segmenter {
            segmenter.reset();
        }
        Ok(())
    }

    /// Replace parameters mid-session. Segmentation state restarts; the
    /// lifecycle state is unchanged.
    pub fn reconfigure(&mut self, params: VadParams, vad_enabled: bool) -> Result<(), PipelineError> {
        params.validate().map_err(PipelineError::Config)?;
        let scorer = detector::build_scorer(params.detector).map_err(PipelineError::Config)?;
        self.segmenter = Some(VadSegmenter::new(params));
        self.scorer = Some(scorer);
        self.vad_enabled = vad_enabled;
        self.clock_ms = 0.0;
        tracing::info!(vad_enabled, "worker reconfigured");
        Ok(())
    }

    /// Terminal: buffered state is dropped without a `SpeechEnd` and all
    /// further frames are declined. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.state == WorkerState::Stopped {
            return;
        }
        // The transition table admits Stopped from every state.
        let _ = self.state.transition(WorkerState::Stopped);
        self.segmenter = None;
        self.scorer = None;
        tracing::info!("worker stopped");
    }

    pub fn handle_command(&mut self, command: WorkerCommand) {
        let result = match command {
            WorkerCommand::Start => self.start(),
            WorkerCommand::Pause => self.pause(),
            WorkerCommand::Reconfigure {
                params,
                vad_enabled,
            } => self.reconfigure(params, vad_enabled),
            WorkerCommand::Stop => {
                self.stop();
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::warn!("worker command rejected: {}", e);
        }
    }

    /// Process one capture callback's worth of audio.
    ///
    /// Only valid while `Running`; other non-terminal states drop the frame.
    /// With VAD disabled the converted frame is forwarded unconditionally.
    pub fn process_frame(&mut self, frame: CaptureFrame) -> FrameOutcome {
        match self.state {
            WorkerState::Running => {}
            WorkerState::Stopped => return FrameOutcome::Finished,
            _ => return FrameOutcome::Continue,
        }
        if frame.samples.is_empty() || frame.sample_rate == 0 {
            tracing::warn!(
                samples = frame.samples.len(),
                sample_rate = frame.sample_rate,
                "dropping malformed capture frame"
            );
            return FrameOutcome::Continue;
        }

        let timestamp_ms = self.clock_ms as u64;
        self.clock_ms += frame.samples.len() as f64 * 1000.0 / frame.sample_rate as f64;

        if self.vad_enabled {
            self.process_gated(frame, timestamp_ms);
        } else {
            self.process_passthrough(frame, timestamp_ms);
        }
        FrameOutcome::Continue
    }

    fn process_gated(&mut self, frame: CaptureFrame, timestamp_ms: u64) {
        let (Some(scorer), Some(segmenter)) = (self.scorer.as_mut(), self.segmenter.as_mut())
        else {
            tracing::warn!("running worker has no segmenter; frame dropped");
            return;
        };

        let score = scorer.score(&frame.samples);
        let pcm = PcmFrame {
            samples: codec::encode_i16(&frame.samples),
            sample_rate: frame.sample_rate,
            timestamp_ms,
        };

        let events = &self.events;
        let mut delivery_failed = false;
        segmenter.process(pcm, score, &mut |ev| {
            let message = match ev {
                SegmentEvent::SpeechStart { timestamp_ms } => {
                    WorkerEvent::SpeechStart { timestamp_ms }
                }
                SegmentEvent::SpeechEnd {
                    timestamp_ms,
                    duration_ms,
                } => WorkerEvent::SpeechEnd {
                    timestamp_ms,
                    duration_ms,
                },
                SegmentEvent::Audio(frame) => WorkerEvent::Audio(frame),
            };
            if events.send(message).is_err() {
                delivery_failed = true;
            }
        });

        let metrics = FrameMetrics {
            timestamp_ms,
            rms: score,
            dbfs: energy::rms_to_dbfs(score),
            is_speech: segmenter.state() == VadState::Speaking,
        };
        if self.events.send(WorkerEvent::Activity(metrics)).is_err() {
            delivery_failed = true;
        }
        if delivery_failed {
            // Stale audio is meaningless to retry; keep processing.
            tracing::warn!("event receiver gone; segment output dropped");
        }
    }

    fn process_passthrough(&mut self, frame: CaptureFrame, timestamp_ms: u64) {
        let rms = energy::rms(&frame.samples);
        let pcm = PcmFrame {
            samples: codec::encode_i16(&frame.samples),
            sample_rate: frame.sample_rate,
            timestamp_ms,
        };
        let metrics = FrameMetrics {
            timestamp_ms,
            rms,
            dbfs: energy::rms_to_dbfs(rms),
            // No state machine involvement in pass-through mode.
            is_speech: false,
        };

        let audio_ok = self.events.send(WorkerEvent::Audio(pcm)).is_ok();
        let activity_ok = self.events.send(WorkerEvent::Activity(metrics)).is_ok();
        if !audio_ok || !activity_ok {
            tracing::warn!("event receiver gone; pass-through frame dropped");
        }
    }
}
