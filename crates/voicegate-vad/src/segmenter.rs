use std::collections::VecDeque;

use crate::config::VadParams;
use crate::types::{PcmFrame, SegmentEvent, VadState};

/// Frame-synchronous speech segmenter.
///
/// Consumes (frame, score) pairs and decides which frames belong to an
/// utterance. While `Idle` it keeps a rolling pre-speech history; a frame
/// scoring above the speech threshold starts an utterance, replaying that
/// history so the onset is not clipped. While `Speaking` a rolling trailing
/// window follows the utterance, and silence persisting past the configured
/// duration ends it: the window is flushed for a valid utterance and
/// discarded for a trigger too short to count as speech.
///
/// Time is derived from sample counts, so behavior is deterministic for a
/// given frame sequence and tolerant of variable frame sizes. Processing a
/// frame cannot fail: parameters were validated at construction and the
/// only buffers are the bounded padding windows.
pub struct VadSegmenter {
    params: VadParams,
    state: VadState,
    /// Pre-speech history while `Idle`, trailing window while `Speaking`.
    padding: VecDeque<PcmFrame>,
    speech_start_ms: f64,
    silence_start_ms: Option<f64>,
    clock_ms: f64,
}

impl VadSegmenter {
    pub fn new(params: VadParams) -> Self {
        Self {
            params,
            state: VadState::Idle,
            padding: VecDeque::new(),
            speech_start_ms: 0.0,
            silence_start_ms: None,
            clock_ms: 0.0,
        }
    }

    pub fn state(&self) -> VadState {
        self.state
    }

    pub fn buffered_frames(&self) -> usize {
        self.padding.len()
    }

    /// Stream position in milliseconds, advanced by each processed frame.
    pub fn clock_ms(&self) -> u64 {
        self.clock_ms as u64
    }

    /// Process one frame with its speech score, pushing output into `sink`.
    ///
    /// The frame is moved: it ends up in the padding window, in the sink as
    /// `Audio`, or dropped when a too-short utterance is discarded. Frames
    /// are emitted in capture order and never twice.
    pub fn process(&mut self, frame: PcmFrame, score: f32, sink: &mut dyn FnMut(SegmentEvent)) {
        let frame_start = self.clock_ms;
        let duration = frame.duration_ms();
        self.clock_ms += duration;

        match self.state {
            VadState::Idle => self.process_idle(frame, score, frame_start, duration, sink),
            VadState::Speaking => self.process_speaking(frame, score, frame_start, duration, sink),
        }
    }

    fn process_idle(
        &mut self,
        frame: PcmFrame,
        score: f32,
        frame_start: f64,
        duration: f64,
        sink: &mut dyn FnMut(SegmentEvent),
    ) {
        if score > self.params.speech_threshold {
            self.state = VadState::Speaking;
            self.speech_start_ms = frame_start;
            self.silence_start_ms = None;

            sink(SegmentEvent::SpeechStart {
                timestamp_ms: frame_start as u64,
            });
            // Replay the padding history, then the frame that triggered.
            // The trigger never enters the buffer, so the buffer bound
            // holds even while it drains.
            while let Some(buffered) = self.padding.pop_front() {
                sink(SegmentEvent::Audio(buffered));
            }
            sink(SegmentEvent::Audio(frame));
        } else {
            let cap = padding_frames(self.params.pre_speech_padding_ms, duration);
            if cap == 0 {
                return;
            }
            self.padding.push_back(frame);
            while self.padding.len() > cap {
                self.padding.pop_front();
            }
        }
    }

    fn process_speaking(
        &mut self,
        frame: PcmFrame,
        score: f32,
        frame_start: f64,
        duration: f64,
        sink: &mut dyn FnMut(SegmentEvent),
    ) {
        let cap = padding_frames(self.params.post_speech_padding_ms, duration);
        self.padding.push_back(frame);
        // The trailing window rolls: overflow is emitted right away rather
        // than held until the utterance ends.
        while self.padding.len() > cap {
            if let Some(oldest) = self.padding.pop_front() {
                sink(SegmentEvent::Audio(oldest));
            }
        }

        if score < self.params.silence_threshold {
            let silence_start = *self.silence_start_ms.get_or_insert(frame_start);
            let now = self.clock_ms;
            if now - silence_start >= self.params.silence_duration_ms as f64 {
                self.finish_utterance(silence_start, now, sink);
            }
        } else {
            self.silence_start_ms = None;
        }
    }

    fn finish_utterance(
        &mut self,
        silence_start: f64,
        now: f64,
        sink: &mut dyn FnMut(SegmentEvent),
    ) {
        // The utterance ends where the confirming silence began; the
        // trailing silence does not count toward the minimum duration.
        let speech_ms = silence_start - self.speech_start_ms;
        if speech_ms >= self.params.min_speech_duration_ms as f64 {
            while let Some(buffered) = self.padding.pop_front() {
                sink(SegmentEvent::Audio(buffered));
            }
            sink(SegmentEvent::SpeechEnd {
                timestamp_ms: now as u64,
                duration_ms: speech_ms as u64,
            });
        } else {
            // False trigger: too short to count as speech.
            self.padding.clear();
        }
        self.state = VadState::Idle;
        self.speech_start_ms = 0.0;
        self.silence_start_ms = None;
    }

    /// Drop all buffered state and return to `Idle` without emitting.
    ///
    /// The stream clock keeps running so timestamps stay continuous across
    /// a pause.
    pub fn reset(&mut self) {
        self.state = VadState::Idle;
        self.padding.clear();
        self.speech_start_ms = 0.0;
        self.silence_start_ms = None;
    }
}

/// Padding window bound: `ceil(padding_ms / frame_duration_ms)`, recomputed
/// per frame so variable frame sizes are tolerated.
fn padding_frames(padding_ms: u32, frame_duration_ms: f64) -> usize {
    if frame_duration_ms <= 0.0 {
        return 0;
    }
    (padding_ms as f64 / frame_duration_ms).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> VadParams {
        VadParams::default()
    }

    fn frame(tag: i16) -> PcmFrame {
        PcmFrame {
            samples: vec![tag; 1536],
            sample_rate: 16_000,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn starts_idle_and_empty() {
        let seg = VadSegmenter::new(params());
        assert_eq!(seg.state(), VadState::Idle);
        assert_eq!(seg.buffered_frames(), 0);
        assert_eq!(seg.clock_ms(), 0);
    }

    #[test]
    fn clock_advances_by_frame_duration() {
        let mut seg = VadSegmenter::new(params());
        let mut sink = |_: SegmentEvent| {};
        seg.process(frame(0), 0.0, &mut sink);
        assert_eq!(seg.clock_ms(), 96);
        seg.process(frame(0), 0.0, &mut sink);
        assert_eq!(seg.clock_ms(), 192);
    }

    #[test]
    fn reset_returns_to_idle_and_keeps_the_clock() {
        let mut seg = VadSegmenter::new(params());
        let mut sink = |_: SegmentEvent| {};
        seg.process(frame(0), 0.8, &mut sink);
        assert_eq!(seg.state(), VadState::Speaking);
        seg.reset();
        assert_eq!(seg.state(), VadState::Idle);
        assert_eq!(seg.buffered_frames(), 0);
        assert_eq!(seg.clock_ms(), 96);
    }

    #[test]
    fn zero_pre_padding_keeps_no_history() {
        let mut seg = VadSegmenter::new(VadParams {
            pre_speech_padding_ms: 0,
            ..params()
        });
        let mut sink = |_: SegmentEvent| {};
        for _ in 0..5 {
            seg.process(frame(0), 0.1, &mut sink);
        }
        assert_eq!(seg.buffered_frames(), 0);
    }
}
