// Called on startup and quit; keeps the grid and tempo between sessions.
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::pipeline::project::ProjectState;

pub const BEATGRID_DIR: &str = ".beatgrid";
const PROJECT_FILE: &str = "project.json";

// <project_dir>/.beatgrid/project.json
pub fn project_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(BEATGRID_DIR).join(PROJECT_FILE)
}

// A missing file is a fresh project; an unreadable one is logged and replaced
// by the default rather than stopping the app.
pub fn load_project(project_dir: &Path) -> ProjectState {
    let path = project_file_path(project_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return ProjectState::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "could not read project, using default");
            return ProjectState::default();
        }
    };
    match serde_json::from_str(&data) {
        Ok(state) => {
            tracing::info!(path = %path.display(), "project loaded");
            state
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "malformed project, using default");
            ProjectState::default()
        }
    }
}

// Save the project state to disk, making the files if they don't exist already
pub fn save_project(project_dir: &Path, state: &ProjectState) -> Result<()> {
    let path = project_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .beatgrid/ if needed
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(&path, json)?;
    tracing::debug!(path = %path.display(), "project saved");
    Ok(())
}
