// Two clocks: the audio clock (frames rendered) is exact but can't wake
// anyone; the heartbeat is a coarse timer that only checks the look-ahead
// window. Trigger times always come from the audio clock.

use std::time::{Duration, Instant};

use crate::audio_api::OutputGraph;
use crate::error::{Error, Result};
use crate::pipeline::project::Pattern;
use crate::shared::{Instrument, NUM_STEPS};
use crate::sound_bank;

pub const STEPS_PER_BEAT: f64 = 4.0; // 16th notes

/// Seconds per step at `bpm`.
pub fn step_duration(bpm: u32) -> f64 {
    60.0 / bpm as f64 / STEPS_PER_BEAT
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// How far ahead of the audio clock steps are committed, in seconds.
    pub lookahead: f64,
    pub heartbeat_interval: Duration,
    /// Gap between `start()` and the first step, in seconds.
    pub start_margin: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead: 0.1,
            heartbeat_interval: Duration::from_millis(25),
            start_margin: 0.05,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transport {
    Stopped,
    Running,
}

/// "Step `step` sounds at `time`" for the UI. Only meant to be roughly on
/// time; nothing audible depends on it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepNotice {
    pub step: u8,
    pub time: f64,
}

// The coarse wake-up. Armed means a heartbeat is owed at or after `due`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Heartbeat {
    due: Option<Instant>,
}

impl Heartbeat {
    pub fn arm(&mut self, at: Instant) {
        self.due = Some(at);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.due.is_some_and(|due| now >= due)
    }
}

#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    transport: Transport,
    current_step: usize,
    next_step_time: f64,
    heartbeat: Heartbeat,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            transport: Transport::Stopped,
            current_step: 0,
            next_step_time: 0.0,
            heartbeat: Heartbeat::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.transport == Transport::Running
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn next_step_time(&self) -> f64 {
        self.next_step_time
    }

    pub fn next_wake(&self) -> Option<Instant> {
        self.heartbeat.due()
    }

    /// Start the transport. The first heartbeat is owed immediately but runs
    /// on the next `poll`, not here. Fails if there is no output to play on.
    pub fn start<G: OutputGraph>(&mut self, output: Option<&G>, now: Instant) -> Result<()> {
        let output = output.ok_or(Error::AudioNotInitialized)?;
        if self.is_running() {
            return Ok(());
        }
        self.transport = Transport::Running;
        self.current_step = 0;
        self.next_step_time = output.current_time() + self.config.start_margin;
        self.heartbeat.arm(now);
        tracing::info!(first_step_at = self.next_step_time, "transport started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.transport = Transport::Stopped;
        self.heartbeat.cancel();
        self.current_step = 0;
        tracing::info!("transport stopped");
    }

    // heartbeat if one is owed, then re-arm
    pub fn poll<G: OutputGraph>(
        &mut self,
        now: Instant,
        pattern: &Pattern,
        bpm: u32,
        output: &mut G,
    ) -> Vec<StepNotice> {
        if !self.is_running() || !self.heartbeat.is_due(now) {
            return Vec::new();
        }
        let notices = self.heartbeat(pattern, bpm, output);
        self.heartbeat.arm(now + self.config.heartbeat_interval);
        notices
    }

    /// Commit every step that starts inside the look-ahead window. After a
    /// stall this drains the whole backlog at the steps' original times.
    pub fn heartbeat<G: OutputGraph>(
        &mut self,
        pattern: &Pattern,
        bpm: u32,
        output: &mut G,
    ) -> Vec<StepNotice> {
        if !self.is_running() {
            return Vec::new();
        }
        let horizon = output.current_time() + self.config.lookahead;
        let mut notices = Vec::new();
        while self.next_step_time < horizon {
            let step = self.current_step;
            let at = self.next_step_time;
            for instrument in Instrument::ALL {
                if !pattern.is_active(instrument, step) {
                    continue;
                }
                match sound_bank::voice(instrument, at, output.noise()) {
                    Ok(voice) => output.connect(voice),
                    Err(err) => {
                        tracing::error!(instrument = instrument.name(), step, %err, "voice skipped")
                    }
                }
            }
            notices.push(StepNotice {
                step: step as u8,
                time: at,
            });
            // tempo is read per advance, committed times never move
            self.next_step_time += step_duration(bpm);
            self.current_step = (step + 1) % NUM_STEPS;
        }
        if notices.len() > 1 {
            tracing::debug!(steps = notices.len(), "heartbeat committed several steps");
        }
        notices
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
