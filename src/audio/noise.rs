use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SHORT_NOISE_SECS: f64 = 0.05;
pub const MEDIUM_NOISE_SECS: f64 = 0.2;
pub const LONG_NOISE_SECS: f64 = 0.5;

// One immutable block of white noise. Cloning only bumps the refcount, so
// every voice that plays it reads the very same samples.
#[derive(Clone, Debug)]
pub struct NoiseBuffer {
    samples: Arc<[f32]>,
    sample_rate: f32,
}

impl NoiseBuffer {
    fn generate(secs: f64, sample_rate: f32, rng: &mut XorShift) -> Self {
        let len = (secs * sample_rate as f64).round() as usize;
        let samples: Arc<[f32]> = (0..len).map(|_| rng.next_bipolar()).collect();
        Self { samples, sample_rate }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    // identity, not content
    pub fn same_buffer(&self, other: &NoiseBuffer) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}

/// The three noise sources shared by every noise-based voice in a session.
/// Built once when the output comes up, never regenerated per hit.
#[derive(Clone, Debug)]
pub struct NoiseBufferSet {
    pub short: NoiseBuffer,
    pub medium: NoiseBuffer,
    pub long: NoiseBuffer,
}

impl NoiseBufferSet {
    pub fn generate(sample_rate: f32) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15);
        Self::with_seed(sample_rate, seed)
    }

    pub fn with_seed(sample_rate: f32, seed: u64) -> Self {
        let mut rng = XorShift::new(seed);
        let set = Self {
            short: NoiseBuffer::generate(SHORT_NOISE_SECS, sample_rate, &mut rng),
            medium: NoiseBuffer::generate(MEDIUM_NOISE_SECS, sample_rate, &mut rng),
            long: NoiseBuffer::generate(LONG_NOISE_SECS, sample_rate, &mut rng),
        };
        tracing::debug!(
            sample_rate,
            short = set.short.len(),
            medium = set.medium.len(),
            long = set.long.len(),
            "noise buffers generated"
        );
        set
    }
}

// xorshift64*, plenty for noise
struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x2545_F491_4F6C_DD1D } else { seed })
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    // uniform in [-1, 1]
    fn next_bipolar(&mut self) -> f32 {
        let unit = (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32;
        unit * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_have_their_fixed_durations() {
        let set = NoiseBufferSet::with_seed(48000.0, 7);
        assert_eq!(set.short.len(), 2400);
        assert_eq!(set.medium.len(), 9600);
        assert_eq!(set.long.len(), 24000);
        assert!((set.long.duration() - LONG_NOISE_SECS).abs() < 1e-9);
    }

    #[test]
    fn samples_stay_in_range() {
        let set = NoiseBufferSet::with_seed(44100.0, 42);
        for s in set.long.samples() {
            assert!((-1.0..=1.0).contains(s));
        }
        // not a constant
        let first = set.long.samples()[0];
        assert!(set.long.samples().iter().any(|&s| s != first));
    }

    #[test]
    fn clones_share_the_same_buffer() {
        let set = NoiseBufferSet::with_seed(44100.0, 1);
        let a = set.medium.clone();
        let b = set.medium.clone();
        assert!(a.same_buffer(&b));
        assert!(!a.same_buffer(&set.long));
    }
}
