use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use voicegate_foundation::PipelineError;
use voicegate_telemetry::{SessionStats, StatsSnapshot};
use voicegate_vad::{FrameMetrics, PcmFrame};
use voicegate_worker::{FrameSender, WorkerCommand, WorkerEvent, WorkerThread};

use crate::options::{VadOptions, VadOptionsPatch};

type VoiceListener = Box<dyn FnMut() + Send>;
type ActivityListener = Box<dyn FnMut(FrameMetrics) + Send>;
type AudioSink = Box<dyn FnMut(PcmFrame) + Send>;

#[derive(Default)]
struct Listeners {
    voice_start: Vec<VoiceListener>,
    voice_end: Vec<VoiceListener>,
    voice_activity: Vec<ActivityListener>,
    audio: Option<AudioSink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatePhase {
    Idle,
    Running,
    Paused,
    Destroyed,
}

/// Owns the worker's configuration and lifecycle from the application
/// thread.
///
/// All communication with the real-time side is by message: configuration
/// and lifecycle commands flow down a command channel, events and audio
/// flow back over the event channel into a pump task that dispatches to
/// registered listeners and the statistics accumulator.
pub struct VoiceGate {
    options: VadOptions,
    listeners: Arc<Mutex<Listeners>>,
    stats: SessionStats,
    /// End-of-voice debounce window; follows `update_config` live.
    debounce_ms: Arc<AtomicU64>,
    worker: Option<WorkerThread>,
    pump: Option<JoinHandle<()>>,
    phase: GatePhase,
}

impl VoiceGate {
    /// Merge caller options over the defaults. Contradictory options are
    /// rejected here, before any session resource exists.
    pub fn new(patch: &VadOptionsPatch) -> Result<Self, PipelineError> {
        let mut options = VadOptions::default();
        options.apply(patch);
        options.to_params()?;
        let debounce_ms = Arc::new(AtomicU64::new(options.silence_duration_ms as u64));
        Ok(Self {
            options,
            listeners: Arc::new(Mutex::new(Listeners::default())),
            stats: SessionStats::new(),
            debounce_ms,
            worker: None,
            pump: None,
            phase: GatePhase::Idle,
        })
    }

    pub fn options(&self) -> &VadOptions {
        &self.options
    }

    pub fn on_voice_start(&self, listener: impl FnMut() + Send + 'static) {
        self.listeners.lock().voice_start.push(Box::new(listener));
    }

    pub fn on_voice_end(&self, listener: impl FnMut() + Send + 'static) {
        self.listeners.lock().voice_end.push(Box::new(listener));
    }

    pub fn on_voice_activity(&self, listener: impl FnMut(FrameMetrics) + Send + 'static) {
        self.listeners
            .lock()
            .voice_activity
            .push(Box::new(listener));
    }

    /// Register the single upstream consumer of forwarded PCM. Audio
    /// ownership moves to it; a later registration replaces the sink.
    pub fn set_audio_sink(&self, sink: impl FnMut(PcmFrame) + Send + 'static) {
        self.listeners.lock().audio = Some(Box::new(sink));
    }

    /// Activate the session, spawning the worker thread and event pump on
    /// first use; after a pause this resumes the existing worker.
    ///
    /// Must be called within a tokio runtime. A configuration error aborts
    /// activation synchronously and leaves the gate inactive.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        match self.phase {
            GatePhase::Destroyed => Err(PipelineError::Destroyed),
            GatePhase::Running => Ok(()),
            GatePhase::Paused => {
                if let Some(worker) = &self.worker {
                    worker.send(WorkerCommand::Start);
                }
                self.phase = GatePhase::Running;
                Ok(())
            }
            GatePhase::Idle => {
                let params = self.options.to_params()?;
                let (event_tx, event_rx) = mpsc::unbounded_channel();
                let worker = WorkerThread::spawn(params, self.options.enabled, event_tx)?;
                worker.send(WorkerCommand::Start);

                let router = EventRouter::new(
                    self.listeners.clone(),
                    self.stats.clone(),
                    self.debounce_ms.clone(),
                );
                self.pump = Some(tokio::spawn(pump(event_rx, router)));
                self.worker = Some(worker);
                self.phase = GatePhase::Running;
                tracing::info!("voice gate started");
                Ok(())
            }
        }
    }

    /// Suspend detection. Any in-flight utterance is discarded on the
    /// worker without a speech-end event.
    pub fn pause(&mut self) -> Result<(), PipelineError> {
        match self.phase {
            GatePhase::Destroyed => Err(PipelineError::Destroyed),
            GatePhase::Running => {
                if let Some(worker) = &self.worker {
                    worker.send(WorkerCommand::Pause);
                }
                self.phase = GatePhase::Paused;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Merge new options over the current ones. A live worker receives the
    /// new parameters as a reconfigure command; nothing changes if the
    /// merged options fail validation.
    pub fn update_config(&mut self, patch: &VadOptionsPatch) -> Result<(), PipelineError> {
        if self.phase == GatePhase::Destroyed {
            return Err(PipelineError::Destroyed);
        }
        let mut merged = self.options.clone();
        merged.apply(patch);
        let params = merged.to_params()?;

        self.debounce_ms
            .store(merged.silence_duration_ms as u64, Ordering::Relaxed);
        if let Some(worker) = &self.worker {
            worker.send(WorkerCommand::Reconfigure {
                params,
                vad_enabled: merged.enabled,
            });
        }
        self.options = merged;
        Ok(())
    }

    /// Tear the session down: stop the worker, close the channels, and join
    /// the worker thread. Idempotent; the gate is unusable afterwards.
    pub fn destroy(&mut self) {
        if self.phase == GatePhase::Destroyed {
            return;
        }
        self.phase = GatePhase::Destroyed;
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        // The pump exits on its own once the worker's event sender drops.
        self.pump.take();
        tracing::info!("voice gate destroyed");
    }

    /// Handle the capture layer pushes frames into. Available once started.
    pub fn frame_sender(&self) -> Option<FrameSender> {
        self.worker.as_ref().map(|w| w.frame_sender())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

impl Drop for VoiceGate {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Routes worker events to listeners and statistics.
///
/// Kept separate from the async pump so the debounce and dispatch logic can
/// be driven deterministically in tests.
struct EventRouter {
    listeners: Arc<Mutex<Listeners>>,
    stats: SessionStats,
    debounce_ms: Arc<AtomicU64>,
    in_voice: bool,
    pending_end: Option<Instant>,
}

impl EventRouter {
    fn new(
        listeners: Arc<Mutex<Listeners>>,
        stats: SessionStats,
        debounce_ms: Arc<AtomicU64>,
    ) -> Self {
        Self {
            listeners,
            stats,
            debounce_ms,
            in_voice: false,
            pending_end: None,
        }
    }

    /// Deadline for the pending end-of-voice dispatch, if armed.
    fn deadline(&self) -> Option<Instant> {
        self.pending_end
    }

    fn handle(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::SpeechStart { .. } => {
                self.stats.record_activation();
                if self.pending_end.take().is_some() {
                    // Speech resumed inside the debounce window; the voice
                    // segment continues and no new start is announced.
                    return;
                }
                if !self.in_voice {
                    self.in_voice = true;
                    for listener in self.listeners.lock().voice_start.iter_mut() {
                        listener();
                    }
                }
            }
            WorkerEvent::SpeechEnd { .. } => {
                if self.in_voice {
                    let window = Duration::from_millis(self.debounce_ms.load(Ordering::Relaxed));
                    self.pending_end = Some(Instant::now() + window);
                }
            }
            WorkerEvent::Audio(frame) => {
                if let Some(sink) = self.listeners.lock().audio.as_mut() {
                    sink(frame);
                }
            }
            WorkerEvent::Activity(metrics) => {
                self.stats.record_frame(metrics.is_speech, metrics.rms);
                for listener in self.listeners.lock().voice_activity.iter_mut() {
                    listener(metrics);
                }
            }
        }
    }

    /// Silence persisted through the debounce window; announce the end.
    fn fire_pending_end(&mut self) {
        if self.pending_end.take().is_some() && self.in_voice {
            self.in_voice = false;
            for listener in self.listeners.lock().voice_end.iter_mut() {
                listener();
            }
        }
    }
}

async fn pump(mut events: mpsc::UnboundedReceiver<WorkerEvent>, mut router: EventRouter) {
    loop {
        let deadline = router.deadline();
        tokio::select! {
            received = events.recv() => match received {
                Some(event) => router.handle(event),
                // Worker gone: teardown discards any pending end.
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                router.fire_pending_end();
            }
        }
    }
    tracing::debug!("event pump exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn router_with_counters() -> (EventRouter, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let listeners = Arc::new(Mutex::new(Listeners::default()));
        let starts = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = listeners.lock();
            let starts = starts.clone();
            guard.voice_start.push(Box::new(move || {
                starts.fetch_add(1, Ordering::Relaxed);
            }));
            let ends = ends.clone();
            guard.voice_end.push(Box::new(move || {
                ends.fetch_add(1, Ordering::Relaxed);
            }));
        }
        let router = EventRouter::new(
            listeners,
            SessionStats::new(),
            Arc::new(AtomicU64::new(100)),
        );
        (router, starts, ends)
    }

    fn activity(is_speech: bool) -> WorkerEvent {
        WorkerEvent::Activity(FrameMetrics {
            timestamp_ms: 0,
            rms: if is_speech { 0.8 } else { 0.1 },
            dbfs: 0.0,
            is_speech,
        })
    }

    #[test]
    fn start_dispatches_once_per_voice_segment() {
        let (mut router, starts, _) = router_with_counters();
        router.handle(WorkerEvent::SpeechStart { timestamp_ms: 0 });
        router.handle(WorkerEvent::SpeechStart { timestamp_ms: 500 });
        assert_eq!(starts.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn speech_end_arms_the_debounce_deadline() {
        let (mut router, _, ends) = router_with_counters();
        router.handle(WorkerEvent::SpeechStart { timestamp_ms: 0 });
        assert!(router.deadline().is_none());

        router.handle(WorkerEvent::SpeechEnd {
            timestamp_ms: 1000,
            duration_ms: 1000,
        });
        assert!(router.deadline().is_some());
        // Nothing fires until the deadline passes.
        assert_eq!(ends.load(Ordering::Relaxed), 0);

        router.fire_pending_end();
        assert_eq!(ends.load(Ordering::Relaxed), 1);
        assert!(router.deadline().is_none());
    }

    #[test]
    fn new_speech_cancels_the_pending_end() {
        let (mut router, starts, ends) = router_with_counters();
        router.handle(WorkerEvent::SpeechStart { timestamp_ms: 0 });
        router.handle(WorkerEvent::SpeechEnd {
            timestamp_ms: 1000,
            duration_ms: 1000,
        });
        router.handle(WorkerEvent::SpeechStart { timestamp_ms: 1100 });

        // The segment continued: no end fired, no second start announced.
        assert!(router.deadline().is_none());
        assert_eq!(ends.load(Ordering::Relaxed), 0);
        assert_eq!(starts.load(Ordering::Relaxed), 1);

        router.fire_pending_end();
        assert_eq!(ends.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn speech_end_without_a_segment_is_ignored() {
        let (mut router, _, ends) = router_with_counters();
        router.handle(WorkerEvent::SpeechEnd {
            timestamp_ms: 0,
            duration_ms: 0,
        });
        assert!(router.deadline().is_none());
        router.fire_pending_end();
        assert_eq!(ends.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn stats_accumulate_the_classification_split() {
        let (mut router, _, _) = router_with_counters();
        let stats = router.stats.clone();

        for _ in 0..40 {
            router.handle(activity(true));
        }
        for _ in 0..60 {
            router.handle(activity(false));
        }
        router.handle(WorkerEvent::SpeechStart { timestamp_ms: 0 });

        let snap = stats.snapshot();
        assert_eq!(snap.total_frames, 100);
        assert_eq!(snap.voice_frames, 40);
        assert_eq!(snap.silence_frames, 60);
        assert_eq!(snap.voice_ratio, "40.00%");
        assert_eq!(snap.activations, 1);
    }

    #[test]
    fn activations_count_every_worker_onset() {
        let (mut router, starts, _) = router_with_counters();
        let stats = router.stats.clone();

        router.handle(WorkerEvent::SpeechStart { timestamp_ms: 0 });
        router.handle(WorkerEvent::SpeechEnd {
            timestamp_ms: 500,
            duration_ms: 500,
        });
        // Resumes within the window: one listener-level segment,
        // two worker-level activations.
        router.handle(WorkerEvent::SpeechStart { timestamp_ms: 600 });

        assert_eq!(stats.snapshot().activations, 2);
        assert_eq!(starts.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn audio_goes_to_the_registered_sink() {
        let listeners = Arc::new(Mutex::new(Listeners::default()));
        let received = Arc::new(AtomicUsize::new(0));
        {
            let received = received.clone();
            listeners.lock().audio = Some(Box::new(move |_frame| {
                received.fetch_add(1, Ordering::Relaxed);
            }));
        }
        let mut router = EventRouter::new(
            listeners,
            SessionStats::new(),
            Arc::new(AtomicU64::new(100)),
        );

        router.handle(WorkerEvent::Audio(PcmFrame {
            samples: vec![0; 16],
            sample_rate: 16_000,
            timestamp_ms: 0,
        }));
        assert_eq!(received.load(Ordering::Relaxed), 1);
    }
}
