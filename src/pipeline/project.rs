// The pattern grid and the little bit of state that gets saved with it.

use serde::{Deserialize, Deserializer, Serialize}; // serde does json
use crate::shared::{DEFAULT_BPM, Instrument, NUM_INSTRUMENTS, NUM_STEPS, clamp_bpm};

// 6 rows (one per instrument, in Instrument::ALL order) x 16 steps. The size
// is baked into the type, so a loaded file with the wrong shape never gets
// this far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern {
    cells: [[bool; NUM_STEPS]; NUM_INSTRUMENTS],
}

impl Pattern {
    pub fn cells(&self) -> &[[bool; NUM_STEPS]; NUM_INSTRUMENTS] {
        &self.cells
    }

    pub fn is_active(&self, instrument: Instrument, step: usize) -> bool {
        self.cells[instrument.row()]
            .get(step)
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, instrument: Instrument, step: usize, value: bool) {
        if let Some(cell) = self.cells[instrument.row()].get_mut(step) {
            *cell = value;
        }
    }

    pub fn toggle(&mut self, instrument: Instrument, step: usize) {
        let current = self.is_active(instrument, step);
        self.set(instrument, step, !current);
    }

    pub fn fill_row(&mut self, instrument: Instrument) {
        self.cells[instrument.row()] = [true; NUM_STEPS];
    }

    pub fn clear(&mut self) {
        self.cells = [[false; NUM_STEPS]; NUM_INSTRUMENTS];
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| **c).count()
    }

    // the usual four-on-the-floor starter beat
    pub fn demo() -> Self {
        let mut p = Self::default();
        for step in (0..NUM_STEPS).step_by(4) {
            p.set(Instrument::Kick, step, true);
        }
        p.set(Instrument::Snare, 4, true);
        p.set(Instrument::Snare, 12, true);
        for step in (2..NUM_STEPS).step_by(4) {
            p.set(Instrument::HiHat, step, true);
        }
        p
    }
}

// What goes on disk: { "pattern": [[bool; 16]; 6], "bpm": int }
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    pub pattern: Pattern,
    // out-of-range or fractional tempos from disk are rounded and clamped,
    // same as the live control
    #[serde(deserialize_with = "clamped_bpm")]
    pub bpm: u32,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            pattern: Pattern::demo(),
            bpm: DEFAULT_BPM,
        }
    }
}

fn clamped_bpm<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let raw = f64::deserialize(d)?;
    Ok(clamp_bpm(raw.round() as i64))
}
