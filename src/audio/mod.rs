use crossbeam_channel::Sender;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio_api::{AudioCommand, OutputGraph};
use crate::error::{Error, Result};

mod analyser;
mod engine;
mod frame;
mod node;
mod noise;
mod param;
mod voice;

pub use analyser::{Analyser, AnalyserTap, FFT_SIZE, SMOOTHING};
pub use engine::{Engine, EngineStats, FrameClock, MASTER_GAIN, MAX_VOICES};
pub use frame::StereoFrame;
pub use node::{Filter, FilterKind, Layer, NoisePlayer, Oscillator, Source, Waveform};
pub use noise::{NoiseBuffer, NoiseBufferSet};
pub use param::{AudioParam, DECAY_FLOOR, ParamError};
pub use voice::Voice;

const COMMAND_QUEUE: usize = 1024;

// Control-side handle to the running output stream. Dropping it closes the
// stream.
pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    clock: FrameClock,
    noise: NoiseBufferSet,
    stats: EngineStats,
    analyser: Analyser,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        if self.tx.try_send(cmd).is_err() {
            self.stats.count_dropped();
            tracing::warn!("audio command queue full, voice dropped");
        }
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Smoothed master level from the analysis tap.
    pub fn level(&mut self) -> f32 {
        self.analyser.level()
    }

    pub fn spectrum(&mut self, bands: usize) -> Vec<f32> {
        self.analyser.bands(bands)
    }
}

impl OutputGraph for AudioHandle {
    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn noise(&self) -> &NoiseBufferSet {
        &self.noise
    }

    fn connect(&mut self, voice: Voice) {
        self.send(AudioCommand::Connect(voice));
    }
}

/// Open the default output device and start rendering. Noise buffers are
/// generated here, once, at the device's sample rate.
pub fn start_audio() -> Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);

    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| Error::Stream(e.to_string()))?;

    let sample_rate = config.sample_rate() as f32;
    let channels = config.channels() as usize;
    tracing::info!(
        host = host.id().name(),
        sample_rate,
        channels,
        "opening output stream"
    );

    let tap = AnalyserTap::new();
    let mut engine = Engine::new(sample_rate, tap.clone());
    let clock = engine.clock();
    let stats = engine.stats();

    let output_stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let err_fn = |err: cpal::StreamError| tracing::error!(%err, "audio output stream error");
            device
                .build_output_stream(
                    &config.into(),
                    move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                        while let Ok(cmd) = rx.try_recv() {
                            engine.handle_cmd(cmd);
                        }
                        engine.render_interleaved(data, channels);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| Error::Stream(e.to_string()))?
        }
        other => return Err(Error::UnsupportedSampleFormat(format!("{other:?}"))),
    };
    output_stream
        .play()
        .map_err(|e| Error::Stream(e.to_string()))?;

    Ok(AudioHandle {
        tx,
        clock,
        noise: NoiseBufferSet::generate(sample_rate),
        stats,
        analyser: tap.reader(),
        _output_stream: output_stream,
    })
}
