// Offline rendering: the real scheduler against an engine driven by hand.
// Each heartbeat is followed by one heartbeat interval of rendered audio.

use std::path::Path;
use std::time::Instant;

use crate::audio::{AnalyserTap, Engine, NoiseBufferSet, StereoFrame, Voice};
use crate::audio_api::{AudioCommand, OutputGraph};
use crate::error::Result;
use crate::pipeline::project::ProjectState;
use crate::scheduler::{Scheduler, SchedulerConfig, step_duration};
use crate::shared::NUM_STEPS;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

pub struct OfflineOutput {
    engine: Engine,
    noise: NoiseBufferSet,
}

impl OfflineOutput {
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f32;
        Self {
            engine: Engine::new(sample_rate, AnalyserTap::new()),
            noise: NoiseBufferSet::generate(sample_rate),
        }
    }

    pub fn with_noise(sample_rate: u32, noise: NoiseBufferSet) -> Self {
        Self {
            engine: Engine::new(sample_rate as f32, AnalyserTap::new()),
            noise,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn render(&mut self, out: &mut [StereoFrame]) {
        self.engine.render_block(out);
    }
}

impl OutputGraph for OfflineOutput {
    fn current_time(&self) -> f64 {
        self.engine.clock().now()
    }

    fn noise(&self) -> &NoiseBufferSet {
        &self.noise
    }

    fn connect(&mut self, voice: Voice) {
        self.engine.handle_cmd(AudioCommand::Connect(voice));
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BounceOptions {
    pub bars: u32,
    pub sample_rate: u32,
    pub config: SchedulerConfig,
}

impl Default for BounceOptions {
    fn default() -> Self {
        Self {
            bars: 1,
            sample_rate: DEFAULT_SAMPLE_RATE,
            config: SchedulerConfig::default(),
        }
    }
}

/// Render `bars` passes of the pattern. Step 0 lands on frame 0 and the
/// result is exactly `bars * 16` steps long, so it loops cleanly.
pub fn bounce(state: &ProjectState, opts: BounceOptions) -> Result<Vec<StereoFrame>> {
    let sr = opts.sample_rate;
    let config = SchedulerConfig {
        start_margin: 0.0,
        ..opts.config
    };
    let total_secs = opts.bars as f64 * NUM_STEPS as f64 * step_duration(state.bpm);
    let total_frames = (total_secs * sr as f64).round() as usize;
    let block = ((config.heartbeat_interval.as_secs_f64() * sr as f64).round() as usize).max(1);

    let mut output = OfflineOutput::new(sr);
    let mut scheduler = Scheduler::new(config);
    scheduler.start(Some(&output), Instant::now())?;

    let mut frames = vec![StereoFrame::zero(); total_frames];
    for chunk in frames.chunks_mut(block) {
        scheduler.heartbeat(&state.pattern, state.bpm, &mut output);
        output.render(chunk);
    }
    scheduler.stop();

    let stats = output.engine().stats();
    tracing::info!(
        bars = opts.bars,
        bpm = state.bpm,
        frames = total_frames,
        late = stats.late_voices(),
        stolen = stats.stolen_voices(),
        "bounce rendered"
    );
    Ok(frames)
}

/// 16-bit stereo PCM.
pub fn write_wav(path: &Path, frames: &[StereoFrame], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let scale = i16::MAX as f32;
    for f in frames {
        writer.write_sample((f.left.clamp(-1.0, 1.0) * scale) as i16)?;
        writer.write_sample((f.right.clamp(-1.0, 1.0) * scale) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::project::Pattern;
    use crate::shared::Instrument;

    fn opts(bars: u32) -> BounceOptions {
        BounceOptions {
            bars,
            sample_rate: 8000,
            ..BounceOptions::default()
        }
    }

    fn peak(frames: &[StereoFrame]) -> f32 {
        frames.iter().map(|f| f.left.abs()).fold(0.0, f32::max)
    }

    #[test]
    fn length_is_whole_bars() {
        let state = ProjectState {
            pattern: Pattern::default(),
            bpm: 120,
        };
        // 2 bars * 16 steps * 0.125 s = 4 s
        assert_eq!(bounce(&state, opts(2)).unwrap().len(), 32000);
    }

    #[test]
    fn empty_pattern_is_silent() {
        let state = ProjectState {
            pattern: Pattern::default(),
            bpm: 120,
        };
        let frames = bounce(&state, opts(1)).unwrap();
        assert_eq!(peak(&frames), 0.0);
    }

    #[test]
    fn kicks_land_on_their_steps() {
        let mut pattern = Pattern::default();
        pattern.set(Instrument::Kick, 0, true);
        pattern.set(Instrument::Kick, 8, true);
        let state = ProjectState { pattern, bpm: 120 };
        let frames = bounce(&state, opts(1)).unwrap();

        // step 0 at frame 0, step 8 at 1.0 s = frame 8000
        assert!(peak(&frames[..400]) > 0.1);
        assert!(peak(&frames[3000..7999]) < 0.01);
        assert!(frames[7999].left.abs() < 0.01);
        assert!(peak(&frames[8000..8400]) > 0.1);
    }

    #[test]
    fn wav_has_the_rendered_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let state = ProjectState::default();
        let frames = bounce(&state, opts(1)).unwrap();
        write_wav(&path, &frames, 8000).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.duration() as usize, frames.len());
    }
}
