//! Crate-wide error type and result alias.

use thiserror::Error;

/// Everything that can abort playback before or during a session.
///
/// Per-item decode and resample faults never surface here; they are dropped
/// where they occur so playback continues uninterrupted.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("media error: {0}")]
    Media(#[from] ffmpeg_next::Error),

    #[error("no video stream in input")]
    NoVideoStream,

    #[error("no audio output device available")]
    NoAudioDevice,

    #[error("unsupported audio sample format {0:?}")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    #[error("audio device config error: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("audio stream build error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("audio stream start error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
