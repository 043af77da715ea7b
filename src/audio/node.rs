// Sources, filters, and the layer that chains them into a gain envelope.

use std::f64::consts::TAU;

use super::noise::NoiseBuffer;
use super::param::AudioParam;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
}

#[derive(Clone, Debug)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: AudioParam,
    phase: f64, // [0, 1)
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: AudioParam) -> Self {
        Self {
            waveform,
            frequency,
            phase: 0.0,
        }
    }

    fn next(&mut self, t: f64, dt: f64) -> f32 {
        let out = match self.waveform {
            Waveform::Sine => (self.phase * TAU).sin(),
            // peaks at +-1 on the quarter turns, same phase as the sine
            Waveform::Triangle => {
                let p = self.phase;
                if p < 0.25 {
                    4.0 * p
                } else if p < 0.75 {
                    2.0 - 4.0 * p
                } else {
                    4.0 * p - 4.0
                }
            }
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        let freq = self.frequency.value_at(t).max(0.0) as f64;
        self.phase = (self.phase + freq * dt).fract();
        out as f32
    }

    fn shift(&mut self, dt: f64) {
        self.frequency.shift(dt);
    }
}

// One-shot playback of a shared noise buffer, silent once it runs out.
#[derive(Clone, Debug)]
pub struct NoisePlayer {
    buffer: NoiseBuffer,
    pos: f64,
}

impl NoisePlayer {
    pub fn new(buffer: NoiseBuffer) -> Self {
        Self { buffer, pos: 0.0 }
    }

    pub fn buffer(&self) -> &NoiseBuffer {
        &self.buffer
    }

    fn next(&mut self, dt: f64) -> f32 {
        let idx = self.pos as usize;
        let out = self.buffer.samples().get(idx).copied().unwrap_or(0.0);
        self.pos += self.buffer.sample_rate() as f64 * dt;
        out
    }
}

#[derive(Clone, Debug)]
pub enum Source {
    Oscillator(Oscillator),
    Noise(NoisePlayer),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Highpass,
    Bandpass,
}

pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// RBJ cookbook biquad, Direct Form I. Coefficients are computed on the first
/// sample, once the render sample rate is known.
#[derive(Clone, Debug)]
pub struct Filter {
    pub kind: FilterKind,
    pub frequency: f32,
    pub q: f32,
    prepared_for: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Filter {
    pub fn new(kind: FilterKind, frequency: f32, q: f32) -> Self {
        Self {
            kind,
            frequency,
            q,
            prepared_for: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn highpass(frequency: f32) -> Self {
        Self::new(FilterKind::Highpass, frequency, BUTTERWORTH_Q)
    }

    pub fn bandpass(frequency: f32, q: f32) -> Self {
        Self::new(FilterKind::Bandpass, frequency, q)
    }

    fn prepare(&mut self, sample_rate: f32) {
        // keep the centre below nyquist so low sample rates stay stable
        let freq = self.frequency.min(sample_rate * 0.49);
        let omega = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * self.q);

        let (b0, b1, b2) = match self.kind {
            FilterKind::Highpass => ((1.0 + cos_w) / 2.0, -(1.0 + cos_w), (1.0 + cos_w) / 2.0),
            // constant 0 dB peak gain
            FilterKind::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w / a0;
        self.a2 = (1.0 - alpha) / a0;
        self.prepared_for = sample_rate;
    }

    pub fn process(&mut self, input: f32, sample_rate: f32) -> f32 {
        if self.prepared_for != sample_rate {
            self.prepare(sample_rate);
        }
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// source -> filters -> level -> gain envelope, alive between `start` and `stop`.
#[derive(Clone, Debug)]
pub struct Layer {
    pub source: Source,
    pub filters: Vec<Filter>,
    pub level: f32,
    pub envelope: AudioParam,
    pub start: f64,
    pub stop: f64,
}

impl Layer {
    pub fn oscillator(
        waveform: Waveform,
        frequency: AudioParam,
        envelope: AudioParam,
        start: f64,
        stop: f64,
    ) -> Self {
        Self {
            source: Source::Oscillator(Oscillator::new(waveform, frequency)),
            filters: Vec::new(),
            level: 1.0,
            envelope,
            start,
            stop,
        }
    }

    pub fn noise(buffer: NoiseBuffer, envelope: AudioParam, start: f64, stop: f64) -> Self {
        Self {
            source: Source::Noise(NoisePlayer::new(buffer)),
            filters: Vec::new(),
            level: 1.0,
            envelope,
            start,
            stop,
        }
    }

    pub fn through(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_level(mut self, level: f32) -> Self {
        self.level = level;
        self
    }

    pub fn noise_buffer(&self) -> Option<&NoiseBuffer> {
        match &self.source {
            Source::Noise(player) => Some(player.buffer()),
            Source::Oscillator(_) => None,
        }
    }

    pub fn start_frame(&self, sample_rate: f32) -> u64 {
        to_frame(self.start, sample_rate)
    }

    pub fn stop_frame(&self, sample_rate: f32) -> u64 {
        to_frame(self.stop, sample_rate)
    }

    /// Render one frame of this layer. Silent outside `[start, stop)`.
    pub fn render(&mut self, frame: u64, sample_rate: f32) -> f32 {
        if frame < self.start_frame(sample_rate) || frame >= self.stop_frame(sample_rate) {
            return 0.0;
        }
        let dt = 1.0 / sample_rate as f64;
        let t = frame as f64 * dt;
        let mut x = match &mut self.source {
            Source::Oscillator(osc) => osc.next(t, dt),
            Source::Noise(player) => player.next(dt),
        };
        for filter in &mut self.filters {
            x = filter.process(x, sample_rate);
        }
        x * self.level * self.envelope.value_at(t)
    }

    pub(crate) fn shift(&mut self, dt: f64) {
        self.start += dt;
        self.stop += dt;
        self.envelope.shift(dt);
        if let Source::Oscillator(osc) = &mut self.source {
            osc.shift(dt);
        }
    }
}

pub fn to_frame(secs: f64, sample_rate: f32) -> u64 {
    (secs.max(0.0) * sample_rate as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(v: f32) -> AudioParam {
        AudioParam::new(v)
    }

    #[test]
    fn layer_is_silent_outside_its_window() {
        let sr = 1000.0;
        let mut layer = Layer::oscillator(Waveform::Square, constant(100.0), constant(1.0), 0.01, 0.02);
        assert_eq!(layer.render(9, sr), 0.0);
        assert_eq!(layer.render(10, sr), 1.0);
        assert_eq!(layer.render(20, sr), 0.0);
    }

    #[test]
    fn level_scales_output() {
        let sr = 1000.0;
        let mut layer =
            Layer::oscillator(Waveform::Square, constant(100.0), constant(0.5), 0.0, 1.0).with_level(0.3);
        assert!((layer.render(0, sr) - 0.15).abs() < 1e-6);
    }

    #[test]
    fn triangle_stays_bounded() {
        let mut osc = Oscillator::new(Waveform::Triangle, constant(440.0));
        let dt = 1.0 / 48000.0;
        for i in 0..4800 {
            let s = osc.next(i as f64 * dt, dt);
            assert!((-1.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = Filter::highpass(1000.0);
        let mut last = 1.0;
        for _ in 0..4800 {
            last = f.process(1.0, 48000.0);
        }
        assert!(last.abs() < 1e-3);
    }

    #[test]
    fn bandpass_passes_its_centre() {
        let sr = 48000.0;
        let mut f = Filter::bandpass(1000.0, 1.0);
        let mut peak = 0.0f32;
        for i in 0..9600 {
            let x = (TAU * 1000.0 * i as f64 / sr as f64).sin() as f32;
            let y = f.process(x, sr);
            if i > 4800 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak > 0.9 && peak < 1.1, "peak {peak}");
    }

    #[test]
    fn rounds_start_to_the_nearest_frame() {
        assert_eq!(to_frame(0.0104, 1000.0), 10);
        assert_eq!(to_frame(0.0106, 1000.0), 11);
        assert_eq!(to_frame(-1.0, 1000.0), 0);
    }
}
