// Analysis tap on the master bus. The audio callback only copies samples into
// a ring (and skips the copy if a reader holds the lock); all the maths runs on
// the reader side.

use std::sync::{Arc, Mutex};

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::frame::StereoFrame;

pub const FFT_SIZE: usize = 2048;
pub const SMOOTHING: f32 = 0.8;

#[derive(Debug)]
struct Ring {
    data: Box<[f32]>,
    write: usize,
}

// writer half, owned by the engine
#[derive(Clone, Debug)]
pub struct AnalyserTap {
    ring: Arc<Mutex<Ring>>,
}

impl AnalyserTap {
    pub fn new() -> Self {
        Self {
            ring: Arc::new(Mutex::new(Ring {
                data: vec![0.0; FFT_SIZE].into_boxed_slice(),
                write: 0,
            })),
        }
    }

    pub fn write_frames(&self, frames: &[StereoFrame]) {
        let Ok(mut ring) = self.ring.try_lock() else {
            return;
        };
        for f in frames {
            let w = ring.write;
            ring.data[w] = 0.5 * (f.left + f.right);
            ring.write = (w + 1) % FFT_SIZE;
        }
    }

    pub fn reader(&self) -> Analyser {
        Analyser::new(self.clone())
    }
}

impl Default for AnalyserTap {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader half: waveform snapshots, a smoothed level and a smoothed spectrum.
pub struct Analyser {
    tap: AnalyserTap,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    spectrum: Vec<f32>,
    level: f32,
}

impl Analyser {
    fn new(tap: AnalyserTap) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(FFT_SIZE);
        Self {
            tap,
            fft,
            window: blackman(FFT_SIZE),
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            spectrum: vec![0.0; FFT_SIZE / 2],
            level: 0.0,
        }
    }

    /// The last `FFT_SIZE` master samples, oldest first.
    pub fn time_domain(&self) -> Vec<f32> {
        let ring = match self.tap.ring.lock() {
            Ok(ring) => ring,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut out = Vec::with_capacity(FFT_SIZE);
        out.extend_from_slice(&ring.data[ring.write..]);
        out.extend_from_slice(&ring.data[..ring.write]);
        out
    }

    /// RMS of the current window, smoothed against the previous reading.
    pub fn level(&mut self) -> f32 {
        let samples = self.time_domain();
        let rms = (samples.iter().map(|s| s * s).sum::<f32>() / FFT_SIZE as f32).sqrt();
        self.level = SMOOTHING * self.level + (1.0 - SMOOTHING) * rms;
        self.level
    }

    /// Magnitude per bin (`FFT_SIZE / 2` bins), smoothed over successive calls.
    pub fn frequency_data(&mut self) -> &[f32] {
        let samples = self.time_domain();
        for ((slot, s), w) in self.scratch.iter_mut().zip(&samples).zip(&self.window) {
            *slot = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.scratch);
        let norm = 1.0 / FFT_SIZE as f32;
        for (bin, c) in self.spectrum.iter_mut().zip(&self.scratch) {
            *bin = SMOOTHING * *bin + (1.0 - SMOOTHING) * c.norm() * norm;
        }
        &self.spectrum
    }

    /// Peak magnitude in `n` log-spaced bands from bin 1 up to Nyquist.
    pub fn bands(&mut self, n: usize) -> Vec<f32> {
        let bins = self.frequency_data();
        let top = bins.len() as f32;
        (0..n)
            .map(|b| {
                let lo = (top.powf(b as f32 / n as f32) as usize).min(bins.len() - 1);
                let hi = (top.powf((b + 1) as f32 / n as f32) as usize)
                    .max(lo + 1)
                    .min(bins.len());
                bins[lo..hi].iter().copied().fold(0.0, f32::max)
            })
            .collect()
    }
}

fn blackman(n: usize) -> Vec<f32> {
    let a0 = 0.42;
    let a1 = 0.5;
    let a2 = 0.08;
    (0..n)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}
