// The six drum recipes. Pure functions: the noise content comes from the
// session's pre-generated buffers, never from a per-hit random source.

use crate::audio::{
    AudioParam, DECAY_FLOOR, Filter, Layer, NoiseBufferSet, ParamError, Voice, Waveform,
};
use crate::shared::Instrument;

pub const KICK_SECS: f64 = 0.3;
pub const SNARE_SECS: f64 = 0.2;
pub const HIHAT_SECS: f64 = 0.1;
pub const TOM_SECS: f64 = 0.25;
pub const CLAP_SECS: f64 = 0.18;
pub const RIM_SECS: f64 = 0.03;

const CLAP_BURSTS: usize = 3;
const CLAP_BURST_GAP: f64 = 0.01;
const CLAP_TAIL_OFFSET: f64 = 0.03;

/// Build the voice for `instrument` sounding at `at` on the audio clock.
pub fn voice(instrument: Instrument, at: f64, noise: &NoiseBufferSet) -> Result<Voice, ParamError> {
    match instrument {
        Instrument::Kick => kick(at),
        Instrument::Snare => snare(at, noise),
        Instrument::HiHat => hihat(at, noise),
        Instrument::Tom => tom(at),
        Instrument::Clap => clap(at, noise),
        Instrument::Rim => rim(at),
    }
}

// peak at `at`, exponential fall to the floor `secs` later. Holding the peak
// before `at` keeps the first frame loud when `at` rounds down to it.
fn decay(peak: f32, at: f64, secs: f64) -> Result<AudioParam, ParamError> {
    let mut env = AudioParam::new(peak);
    env.set_value_at_time(peak, at)?
        .exponential_ramp_to_value_at_time(DECAY_FLOOR, at + secs)?;
    Ok(env)
}

fn sweep(from_hz: f32, to_hz: f32, at: f64, secs: f64) -> Result<AudioParam, ParamError> {
    let mut freq = AudioParam::new(from_hz);
    freq.set_value_at_time(from_hz, at)?
        .exponential_ramp_to_value_at_time(to_hz, at + secs)?;
    Ok(freq)
}

pub fn kick(at: f64) -> Result<Voice, ParamError> {
    let body = Layer::oscillator(
        Waveform::Sine,
        sweep(150.0, 30.0, at, 0.1)?,
        decay(1.0, at, KICK_SECS)?,
        at,
        at + KICK_SECS,
    );
    // short pitched blip on top for the beater attack
    let click = Layer::oscillator(
        Waveform::Sine,
        sweep(1000.0, 100.0, at, 0.02)?,
        decay(0.5, at, 0.02)?,
        at,
        at + 0.02,
    );
    Ok(Voice::new(Instrument::Kick, at).with_layer(body).with_layer(click))
}

pub fn snare(at: f64, noise: &NoiseBufferSet) -> Result<Voice, ParamError> {
    let rattle = Layer::noise(noise.long.clone(), decay(0.8, at, SNARE_SECS)?, at, at + SNARE_SECS)
        .through(Filter::highpass(1000.0));
    let body = Layer::oscillator(
        Waveform::Triangle,
        sweep(180.0, 80.0, at, 0.1)?,
        decay(0.7, at, 0.1)?,
        at,
        at + 0.1,
    );
    Ok(Voice::new(Instrument::Snare, at).with_layer(rattle).with_layer(body))
}

pub fn hihat(at: f64, noise: &NoiseBufferSet) -> Result<Voice, ParamError> {
    let metal = Layer::noise(noise.medium.clone(), decay(0.4, at, 0.08)?, at, at + HIHAT_SECS)
        .through(Filter::highpass(7000.0))
        .through(Filter::bandpass(10000.0, 1.0));
    Ok(Voice::new(Instrument::HiHat, at).with_layer(metal))
}

pub fn tom(at: f64) -> Result<Voice, ParamError> {
    let body = Layer::oscillator(
        Waveform::Sine,
        sweep(200.0, 80.0, at, 0.2)?,
        decay(0.7, at, TOM_SECS)?,
        at,
        at + TOM_SECS,
    );
    Ok(Voice::new(Instrument::Tom, at).with_layer(body))
}

pub fn clap(at: f64, noise: &NoiseBufferSet) -> Result<Voice, ParamError> {
    let mut voice = Voice::new(Instrument::Clap, at);
    for i in 0..CLAP_BURSTS {
        let t = at + i as f64 * CLAP_BURST_GAP;
        let burst = Layer::noise(noise.short.clone(), decay(0.6, t, 0.02)?, t, t + 0.02)
            .through(Filter::bandpass(2500.0, 3.0));
        voice = voice.with_layer(burst);
    }
    let t = at + CLAP_TAIL_OFFSET;
    let tail = Layer::noise(noise.medium.clone(), decay(0.4, t, 0.12)?, t, at + CLAP_SECS)
        .through(Filter::bandpass(2500.0, 2.0));
    Ok(voice.with_layer(tail))
}

pub fn rim(at: f64) -> Result<Voice, ParamError> {
    let tone = Layer::oscillator(
        Waveform::Triangle,
        AudioParam::new(800.0),
        decay(0.5, at, RIM_SECS)?,
        at,
        at + RIM_SECS,
    );
    let edge = Layer::oscillator(
        Waveform::Square,
        AudioParam::new(1200.0),
        decay(0.5, at, RIM_SECS)?,
        at,
        at + RIM_SECS,
    )
    .with_level(0.3);
    Ok(Voice::new(Instrument::Rim, at).with_layer(tone).with_layer(edge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NoiseBuffer;

    fn noise() -> NoiseBufferSet {
        NoiseBufferSet::with_seed(48000.0, 3)
    }

    fn noise_buffers(v: &Voice) -> Vec<&NoiseBuffer> {
        v.layers.iter().filter_map(|l| l.noise_buffer()).collect()
    }

    #[test]
    fn durations_match_each_recipe() {
        let n = noise();
        let cases = [
            (Instrument::Kick, KICK_SECS),
            (Instrument::Snare, SNARE_SECS),
            (Instrument::HiHat, HIHAT_SECS),
            (Instrument::Tom, TOM_SECS),
            (Instrument::Clap, CLAP_SECS),
            (Instrument::Rim, RIM_SECS),
        ];
        for (inst, secs) in cases {
            let v = voice(inst, 2.0, &n).unwrap();
            assert_eq!(v.instrument, inst);
            assert_eq!(v.start, 2.0);
            assert!((v.duration() - secs).abs() < 1e-9, "{inst:?}");
        }
    }

    #[test]
    fn envelopes_end_on_the_floor_not_zero() {
        let n = noise();
        for inst in Instrument::ALL {
            let v = voice(inst, 1.0, &n).unwrap();
            for layer in &v.layers {
                let end = layer.envelope.value_at(layer.envelope.end_time());
                assert_eq!(end, DECAY_FLOOR, "{inst:?}");
                assert!(layer.envelope.value_at(layer.stop) > 0.0);
            }
        }
    }

    #[test]
    fn kick_sweeps_down_and_clicks() {
        let v = kick(0.0).unwrap();
        assert_eq!(v.layers.len(), 2);
        let crate::audio::Source::Oscillator(body) = &v.layers[0].source else {
            panic!("kick body should be an oscillator");
        };
        assert!((body.frequency.value_at(0.0) - 150.0).abs() < 1e-3);
        assert!((body.frequency.value_at(0.1) - 30.0).abs() < 1e-3);
        assert!((v.layers[1].stop - 0.02).abs() < 1e-12);
    }

    #[test]
    fn noise_voices_reuse_session_buffers() {
        let n = noise();
        let first = snare(0.0, &n).unwrap();
        let second = snare(0.125, &n).unwrap();
        let a = noise_buffers(&first);
        let b = noise_buffers(&second);
        assert_eq!(a.len(), 1);
        assert!(a[0].same_buffer(b[0]));
        assert!(a[0].same_buffer(&n.long));

        let hat = hihat(0.0, &n).unwrap();
        assert!(noise_buffers(&hat)[0].same_buffer(&n.medium));
    }

    #[test]
    fn clap_bursts_are_ten_ms_apart() {
        let v = clap(1.0, &noise()).unwrap();
        assert_eq!(v.layers.len(), CLAP_BURSTS + 1);
        let starts: Vec<f64> = v.layers.iter().map(|l| l.start).collect();
        assert!((starts[1] - starts[0] - 0.01).abs() < 1e-9);
        assert!((starts[2] - starts[1] - 0.01).abs() < 1e-9);
        assert!((starts[3] - 1.03).abs() < 1e-9);
        for l in &v.layers[..CLAP_BURSTS] {
            assert_eq!(l.filters[0].q, 3.0);
        }
        assert_eq!(v.layers[3].filters[0].q, 2.0);
    }

    #[test]
    fn hihat_filters_high_then_band() {
        let v = hihat(0.0, &noise()).unwrap();
        let f = &v.layers[0].filters;
        assert_eq!(f.len(), 2);
        assert_eq!(f[0].kind, crate::audio::FilterKind::Highpass);
        assert_eq!(f[0].frequency, 7000.0);
        assert_eq!(f[1].kind, crate::audio::FilterKind::Bandpass);
        assert_eq!(f[1].frequency, 10000.0);
    }

    #[test]
    fn rim_square_is_attenuated() {
        let v = rim(0.0).unwrap();
        assert_eq!(v.layers[0].level, 1.0);
        assert_eq!(v.layers[1].level, 0.3);
    }

    #[test]
    fn first_frame_is_not_silenced_by_rounding() {
        let n = noise();
        let sr = 48000.0f32;
        // 1.00001 s lands at frame 48000.48, which rounds to a frame just
        // before the hit's own time
        let at = 1.00001;
        for inst in Instrument::ALL {
            let v = voice(inst, at, &n).unwrap();
            for layer in &v.layers {
                let first = layer.start_frame(sr) as f64 / sr as f64;
                assert!(first <= layer.start);
                assert!(layer.envelope.value_at(first) > 0.3, "{inst:?}");
            }
        }
    }

    #[test]
    fn voices_sound_then_fade() {
        let n = noise();
        let sr = 48000.0;
        for inst in Instrument::ALL {
            let mut v = voice(inst, 0.0, &n).unwrap();
            let frames = (v.stop * sr as f64) as u64;
            let head: f32 = (0..frames / 4).map(|f| v.render(f, sr).abs()).sum();
            let mut tail = 0.0f32;
            for f in frames / 4..frames {
                let s = v.render(f, sr).abs();
                if f >= frames * 3 / 4 {
                    tail += s;
                }
            }
            assert!(head > 0.0, "{inst:?} is silent");
            assert!(tail < head, "{inst:?} does not decay");
        }
    }
}
