use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use beatgrid::bounce::{self, BounceOptions};
use beatgrid::pipeline::persistence;
use beatgrid::scheduler::SchedulerConfig;
use beatgrid::shared::InputEvent;
use beatgrid::{AudioHandle, Sequencer, start_audio, tui};

#[derive(Parser, Debug)]
#[command(name = "beatgrid", version, about = "Six-voice, sixteen-step drum machine")]
struct Cli {
    /// Project directory; the pattern is kept in <DIR>/.beatgrid/project.json
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Look-ahead window in milliseconds
    #[arg(long, global = true, default_value_t = 100)]
    lookahead_ms: u64,

    /// Scheduler heartbeat interval in milliseconds
    #[arg(long, global = true, default_value_t = 25)]
    heartbeat_ms: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the saved pattern to a WAV file instead of playing it
    Bounce {
        out: PathBuf,
        #[arg(long, default_value_t = 1)]
        bars: u32,
        #[arg(long, default_value_t = bounce::DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,
    },
}

impl Cli {
    fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            lookahead: self.lookahead_ms as f64 / 1000.0,
            heartbeat_interval: Duration::from_millis(self.heartbeat_ms.max(1)),
            ..SchedulerConfig::default()
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let project_dir = match &cli.project {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("no current directory")?,
    };
    let config = cli.scheduler_config();

    match cli.command {
        Some(Command::Bounce { ref out, bars, sample_rate }) => {
            init_stderr_tracing();
            let state = persistence::load_project(&project_dir);
            let frames = bounce::bounce(&state, BounceOptions { bars, sample_rate, config })?;
            bounce::write_wav(out, &frames, sample_rate)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("wrote {} ({} frames)", out.display(), frames.len());
            Ok(())
        }
        None => {
            init_file_tracing(&project_dir)?;
            run_tui(&project_dir, config)
        }
    }
}

// the TUI owns the terminal, so logs go to <project>/.beatgrid/beatgrid.log
fn init_file_tracing(project_dir: &Path) -> anyhow::Result<()> {
    let dir = project_dir.join(persistence::BEATGRID_DIR);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("beatgrid.log"))
        .context("opening log file")?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn init_stderr_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("beatgrid=info"))
}

fn run_tui(project_dir: &Path, config: SchedulerConfig) -> anyhow::Result<()> {
    let state = persistence::load_project(project_dir);
    // the device is only opened on the first play press
    let mut middle: Sequencer<AudioHandle> = Sequencer::new(state, config, start_audio);

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let frame_time = Duration::from_millis(16); // ~60fps
    let mut reported_late = 0;

    loop {
        let now = Instant::now();
        middle.tick(now);

        let (level, spectrum) = middle
            .output_mut()
            .map(|out| (out.level(), out.spectrum(tui::view::SPECTRUM_BANDS)))
            .unwrap_or_default();
        middle.set_meter(level, spectrum);
        if let Some(out) = middle.output() {
            let late = out.stats().late_voices();
            if late > reported_late {
                tracing::warn!(late, "voices started late, the heartbeat stalled");
                reported_late = late;
            }
        }

        let ds = middle.display_state();
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        // sleep until the next frame or the next heartbeat, whichever is first
        let timeout = middle
            .next_wake()
            .map(|due| due.saturating_duration_since(Instant::now()).min(frame_time))
            .unwrap_or(frame_time);

        for event in tui::input::poll_input(timeout)? {
            if event == InputEvent::Quit {
                middle.stop();
                if let Err(err) = persistence::save_project(project_dir, &middle.state) {
                    tracing::error!(%err, "could not save project");
                }
                return Ok(());
            }
            if let Err(err) = middle.handle_input(event) {
                tracing::error!(%err, "input failed");
                middle.set_status("NO AUDIO");
            }
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
