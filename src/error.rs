use crate::audio::ParamError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport was started before the audio output existed.
    #[error("audio output is not initialized; call init_audio before start")]
    AudioNotInitialized,

    /// An automation event was rejected.
    #[error("automation error: {0}")]
    Param(#[from] ParamError),

    #[error("no default output device")]
    NoOutputDevice,

    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("project file error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
