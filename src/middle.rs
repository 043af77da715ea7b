// The middle layer: owns the pattern, tempo, transport and (once it exists)
// the audio output. The TUI sends it InputEvents and renders whatever
// DisplayState it hands back; the scheduler reads pattern and tempo from here
// on every heartbeat. Everything lives on the main thread, so none of it
// needs a lock.

use std::collections::VecDeque;
use std::time::Instant;

use crate::audio_api::OutputGraph;
use crate::error::Result;
use crate::pipeline::project::{Pattern, ProjectState};
use crate::scheduler::{Scheduler, SchedulerConfig, StepNotice, step_duration};
use crate::shared::{
    Direction, DisplayState, InputEvent, Instrument, NUM_INSTRUMENTS, NUM_STEPS, clamp_bpm,
};

type OutputFactory<G> = Box<dyn FnMut() -> Result<G>>;

pub struct Sequencer<G: OutputGraph> {
    pub state: ProjectState,
    scheduler: Scheduler,
    output: Option<G>,
    open_output: OutputFactory<G>,
    pending: VecDeque<StepNotice>,
    playing_step: Option<u8>,
    cursor: (usize, usize),
    level: f32,
    spectrum: Vec<f32>,
    status: String,
}

impl<G: OutputGraph> Sequencer<G> {
    /// `open_output` is called at most once, the first time the user asks for
    /// sound.
    pub fn new(
        state: ProjectState,
        config: SchedulerConfig,
        open_output: impl FnMut() -> Result<G> + 'static,
    ) -> Self {
        Self {
            state,
            scheduler: Scheduler::new(config),
            output: None,
            open_output: Box::new(open_output),
            pending: VecDeque::new(),
            playing_step: None,
            cursor: (0, 0),
            level: 0.0,
            spectrum: Vec::new(),
            status: String::new(),
        }
    }

    /// Bring the output up if it isn't yet. Later calls are no-ops.
    pub fn init_audio(&mut self) -> Result<&mut G> {
        let output = match self.output.take() {
            Some(output) => output,
            None => {
                let output = (self.open_output)()?;
                tracing::info!("audio output initialized");
                output
            }
        };
        Ok(self.output.insert(output))
    }

    pub fn output(&self) -> Option<&G> {
        self.output.as_ref()
    }

    pub fn output_mut(&mut self) -> Option<&mut G> {
        self.output.as_mut()
    }

    pub fn start(&mut self) -> Result<()> {
        self.scheduler.start(self.output.as_ref(), Instant::now())
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
        self.pending.clear();
        self.playing_step = None;
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    // takes effect from the next step the scheduler places
    pub fn set_tempo(&mut self, bpm: i64) -> u32 {
        let bpm = clamp_bpm(bpm);
        if bpm != self.state.bpm {
            tracing::info!(bpm, "tempo changed");
        }
        self.state.bpm = bpm;
        bpm
    }

    pub fn tempo(&self) -> u32 {
        self.state.bpm
    }

    pub fn step_duration(&self) -> f64 {
        step_duration(self.state.bpm)
    }

    pub fn pattern(&self) -> &Pattern {
        &self.state.pattern
    }

    pub fn next_wake(&self) -> Option<Instant> {
        self.scheduler.next_wake()
    }

    pub fn set_meter(&mut self, level: f32, spectrum: Vec<f32>) {
        self.level = level;
        self.spectrum = spectrum;
    }

    /// Give the scheduler its heartbeat if one is owed, and move the
    /// playhead to the last step whose time has come on the audio clock.
    /// Returns the notices committed by this call.
    pub fn tick(&mut self, now: Instant) -> Vec<StepNotice> {
        let Some(output) = self.output.as_mut() else {
            return Vec::new();
        };
        let fresh = self
            .scheduler
            .poll(now, &self.state.pattern, self.state.bpm, output);
        self.pending.extend(fresh.iter().copied());

        let audio_now = output.current_time();
        while let Some(notice) = self.pending.front() {
            if notice.time > audio_now {
                break;
            }
            self.playing_step = Some(notice.step);
            self.pending.pop_front();
        }
        fresh
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::MoveCursor(dir) => self.move_cursor(dir),
            InputEvent::ToggleCell => {
                let (row, step) = self.cursor;
                self.state.pattern.toggle(Instrument::ALL[row], step);
            }
            InputEvent::PlayPress => {
                if self.is_running() {
                    self.stop();
                } else {
                    // first sound the user asks for is what opens the device
                    self.init_audio()?;
                    self.start()?;
                    self.status.clear();
                }
            }
            InputEvent::NudgeBpm(delta) => {
                self.set_tempo(self.state.bpm as i64 + delta as i64);
            }
            InputEvent::ClearPattern => self.state.pattern.clear(),
            InputEvent::Quit => self.stop(),
        }
        Ok(())
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
    }

    pub fn display_state(&self) -> DisplayState {
        let display_text = if !self.status.is_empty() {
            self.status.clone()
        } else if self.is_running() {
            "PLAY".to_string()
        } else {
            "STOP".to_string()
        };
        DisplayState {
            cells: *self.state.pattern.cells(),
            cursor: self.cursor,
            playing_step: self.playing_step,
            playing: self.is_running(),
            bpm: self.state.bpm,
            level: self.level,
            spectrum: self.spectrum.clone(),
            display_text,
        }
    }

    fn move_cursor(&mut self, dir: Direction) {
        let (row, step) = self.cursor;
        self.cursor = match dir {
            Direction::Up => ((row + NUM_INSTRUMENTS - 1) % NUM_INSTRUMENTS, step),
            Direction::Down => ((row + 1) % NUM_INSTRUMENTS, step),
            Direction::Left => (row, (step + NUM_STEPS - 1) % NUM_STEPS),
            Direction::Right => (row, (step + 1) % NUM_STEPS),
        };
    }
}
