// Types shared between the engine, the middle layer and the TUI.
//
// Keys (see tui/input.rs):
//   arrows        //  MoveCursor
//   enter / x     //  ToggleCell at the cursor
//   space         //  PlayPress (start/stop)
//   + / -         //  NudgeBpm(+1 / -1)
//   ] / [         //  NudgeBpm(+10 / -10)
//   c             //  ClearPattern
//   esc           //  Quit
//
// Like before, the TUI only renders a DisplayState; everything stateful lives
// in the middle layer.

use serde::{Deserialize, Serialize};

pub const NUM_INSTRUMENTS: usize = 6;
pub const NUM_STEPS: usize = 16;

pub const BPM_MIN: u32 = 60;
pub const BPM_MAX: u32 = 180;
pub const DEFAULT_BPM: u32 = 120;

pub fn clamp_bpm(bpm: i64) -> u32 {
    bpm.clamp(BPM_MIN as i64, BPM_MAX as i64) as u32
}

// Row order of the pattern grid. The scheduler fires a step's instruments in
// exactly this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    Kick,
    Snare,
    HiHat,
    Tom,
    Clap,
    Rim,
}

impl Instrument {
    pub const ALL: [Instrument; NUM_INSTRUMENTS] = [
        Instrument::Kick,
        Instrument::Snare,
        Instrument::HiHat,
        Instrument::Tom,
        Instrument::Clap,
        Instrument::Rim,
    ];

    pub fn row(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Instrument::Kick => "kick",
            Instrument::Snare => "snare",
            Instrument::HiHat => "hihat",
            Instrument::Tom => "tom",
            Instrument::Clap => "clap",
            Instrument::Rim => "rim",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Instrument::Kick => "KICK",
            Instrument::Snare => "SNARE",
            Instrument::HiHat => "HIHAT",
            Instrument::Tom => "TOM",
            Instrument::Clap => "CLAP",
            Instrument::Rim => "RIM",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    MoveCursor(Direction),
    ToggleCell,
    PlayPress,
    NudgeBpm(i32),
    ClearPattern,
    Quit,
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub cells: [[bool; NUM_STEPS]; NUM_INSTRUMENTS],
    pub cursor: (usize, usize), // (row, step)
    pub playing_step: Option<u8>, // last step whose notice came due, while running
    pub playing: bool,
    pub bpm: u32,
    pub level: f32, // smoothed master level from the analyser tap
    pub spectrum: Vec<f32>,
    pub display_text: String,
}
