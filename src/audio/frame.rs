// One stereo frame. The drum voices are mono, so most frames are built with
// `mono` and only split again when written to a device or a WAV file.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn mono(sample: f32) -> Self {
        Self {
            left: sample,
            right: sample,
        }
    }

    // write into an interleaved device buffer of any channel count
    pub fn write_interleaved(&self, out: &mut [f32]) {
        match out.len() {
            0 => {}
            1 => out[0] = 0.5 * (self.left + self.right),
            _ => {
                out[0] = self.left;
                out[1] = self.right;
                for extra in &mut out[2..] {
                    *extra = 0.0;
                }
            }
        }
    }
}
