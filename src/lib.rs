pub mod audio;
pub mod audio_api;
pub mod bounce;
pub mod error;
pub mod middle;
pub mod pipeline;
pub mod scheduler;
pub mod shared;
pub mod sound_bank;
pub mod tui;

pub use audio::{AudioHandle, start_audio};
pub use audio_api::OutputGraph;
pub use error::{Error, Result};
pub use middle::Sequencer;
pub use pipeline::project::{Pattern, ProjectState};
pub use scheduler::{Scheduler, SchedulerConfig, StepNotice, step_duration};
pub use shared::Instrument;
