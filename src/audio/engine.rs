use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::analyser::AnalyserTap;
use super::frame::StereoFrame;
use super::voice::Voice;
use crate::audio_api::AudioCommand;

pub const MAX_VOICES: usize = 64; // hard cap so we never grow the voice list in the callback
pub const MASTER_GAIN: f32 = 0.7;
const SCRATCH_FRAMES: usize = 4096;

// The hardware clock: frames the engine has rendered, shared with the control
// thread. Monotonic and never touched by anything but the render loop.
#[derive(Clone, Debug)]
pub struct FrameClock {
    frames: Arc<AtomicU64>,
    sample_rate: f32,
}

impl FrameClock {
    fn new(sample_rate: f32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

// Counters the control thread can read; the callback itself never logs.
#[derive(Clone, Debug, Default)]
pub struct EngineStats {
    late: Arc<AtomicU64>,
    stolen: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl EngineStats {
    pub fn late_voices(&self) -> u64 {
        self.late.load(Ordering::Relaxed)
    }

    // voices cut short to make room for a newer trigger
    pub fn stolen_voices(&self) -> u64 {
        self.stolen.load(Ordering::Relaxed)
    }

    // triggers that never reached the engine (command queue full)
    pub fn dropped_voices(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn count_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct Engine {
    sample_rate: f32,
    frames_rendered: u64,
    clock: FrameClock,
    voices: Vec<Voice>,
    tap: AnalyserTap,
    stats: EngineStats,
    scratch: Vec<StereoFrame>,
}

impl Engine {
    pub fn new(sample_rate: f32, tap: AnalyserTap) -> Self {
        Self {
            sample_rate,
            frames_rendered: 0,
            clock: FrameClock::new(sample_rate),
            voices: Vec::with_capacity(MAX_VOICES),
            tap,
            stats: EngineStats::default(),
            scratch: vec![StereoFrame::zero(); SCRATCH_FRAMES],
        }
    }

    pub fn clock(&self) -> FrameClock {
        self.clock.clone()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.clone()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Connect(voice) => self.connect(voice),
        }
    }

    fn connect(&mut self, mut voice: Voice) {
        let sr = self.sample_rate;
        if voice.start_frame(sr) < self.frames_rendered {
            // already in the past: play it now rather than lose it
            voice.delay_to(self.frames_rendered as f64 / sr as f64);
            self.stats.late.fetch_add(1, Ordering::Relaxed);
        }
        if self.voices.len() >= MAX_VOICES {
            // new triggers always sound; the oldest voice gives way
            let oldest = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.start_frame(sr))
                .map(|(i, _)| i);
            if let Some(i) = oldest {
                self.voices.swap_remove(i);
                self.stats.stolen.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.voices.push(voice);
    }

    /// Mix every live voice into `out`, starting each one on its own frame.
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        let sr = self.sample_rate;
        for (i, frame) in out.iter_mut().enumerate() {
            let n = self.frames_rendered + i as u64;
            let mut mix = 0.0f32;
            for voice in &mut self.voices {
                mix += voice.render(n, sr);
            }
            *frame = StereoFrame::mono(mix * MASTER_GAIN);
        }
        self.frames_rendered += out.len() as u64;

        let now = self.frames_rendered;
        self.voices.retain(|v| !v.is_finished(now, sr));
        self.tap.write_frames(out);
        self.clock.frames.store(now, Ordering::Release);
    }

    // cpal hands us interleaved floats with whatever channel count the
    // device has; go through the scratch block so nothing allocates
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let mut scratch = std::mem::take(&mut self.scratch);
        for chunk in data.chunks_mut(SCRATCH_FRAMES * channels) {
            let n_frames = chunk.len() / channels;
            let block = &mut scratch[..n_frames];
            self.render_block(block);
            for (frame, out) in block.iter().zip(chunk.chunks_mut(channels)) {
                frame.write_interleaved(out);
            }
        }
        self.scratch = scratch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::node::{Layer, Waveform};
    use crate::audio::param::AudioParam;
    use crate::shared::Instrument;

    const SR: f32 = 1000.0;

    fn square_voice(start: f64, stop: f64) -> Voice {
        Voice::new(Instrument::Rim, start).with_layer(Layer::oscillator(
            Waveform::Square,
            AudioParam::new(10.0),
            AudioParam::new(1.0),
            start,
            stop,
        ))
    }

    fn render(engine: &mut Engine, n: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::zero(); n];
        engine.render_block(&mut out);
        out
    }

    #[test]
    fn voice_starts_on_its_exact_frame() {
        let mut engine = Engine::new(SR, AnalyserTap::new());
        engine.handle_cmd(AudioCommand::Connect(square_voice(0.037, 0.5)));
        let out = render(&mut engine, 64);
        assert_eq!(out[36].left, 0.0);
        assert!((out[37].left - MASTER_GAIN).abs() < 1e-6);
    }

    #[test]
    fn master_gain_scales_the_mix() {
        let mut engine = Engine::new(SR, AnalyserTap::new());
        engine.handle_cmd(AudioCommand::Connect(square_voice(0.0, 0.5)));
        engine.handle_cmd(AudioCommand::Connect(square_voice(0.0, 0.5)));
        let out = render(&mut engine, 1);
        assert!((out[0].left - 2.0 * MASTER_GAIN).abs() < 1e-6);
        assert_eq!(out[0].left, out[0].right);
    }

    #[test]
    fn clock_advances_with_rendered_frames() {
        let mut engine = Engine::new(SR, AnalyserTap::new());
        let clock = engine.clock();
        assert_eq!(clock.now(), 0.0);
        render(&mut engine, 250);
        assert_eq!(clock.frames(), 250);
        assert!((clock.now() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn finished_voices_are_released() {
        let mut engine = Engine::new(SR, AnalyserTap::new());
        engine.handle_cmd(AudioCommand::Connect(square_voice(0.0, 0.03)));
        render(&mut engine, 20);
        assert_eq!(engine.active_voices(), 1);
        render(&mut engine, 20);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn late_voices_still_play() {
        let mut engine = Engine::new(SR, AnalyserTap::new());
        render(&mut engine, 100);
        engine.handle_cmd(AudioCommand::Connect(square_voice(0.05, 0.08)));
        let out = render(&mut engine, 40);
        assert!((out[0].left - MASTER_GAIN).abs() < 1e-6);
        assert_eq!(out[30].left, 0.0);
        assert_eq!(engine.stats().late_voices(), 1);
    }

    #[test]
    fn full_engine_steals_the_oldest_voice() {
        let mut engine = Engine::new(SR, AnalyserTap::new());
        for i in 0..MAX_VOICES {
            let start = i as f64 * 0.001;
            engine.handle_cmd(AudioCommand::Connect(square_voice(start, 1.0)));
        }
        engine.handle_cmd(AudioCommand::Connect(square_voice(0.5, 0.6)));
        assert_eq!(engine.active_voices(), MAX_VOICES);
        assert_eq!(engine.stats().stolen_voices(), 1);
        assert_eq!(engine.stats().dropped_voices(), 0);
        // the voice that started at frame 0 is the one that went
        assert!(engine.voices.iter().all(|v| v.start_frame(SR) > 0));
        assert!(engine.voices.iter().any(|v| v.start_frame(SR) == 500));
    }

    #[test]
    fn interleaved_output_fills_every_channel() {
        let mut engine = Engine::new(SR, AnalyserTap::new());
        engine.handle_cmd(AudioCommand::Connect(square_voice(0.0, 1.0)));
        let mut data = vec![9.0f32; 4 * 3];
        engine.render_interleaved(&mut data, 3);
        assert!((data[0] - MASTER_GAIN).abs() < 1e-6);
        assert!((data[1] - MASTER_GAIN).abs() < 1e-6);
        assert_eq!(data[2], 0.0);
        assert_eq!(engine.clock().frames(), 4);
    }
}
