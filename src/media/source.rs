//! Container opening and stream discovery.

use std::path::Path;

use ffmpeg_next::codec;
use ffmpeg_next::format::{self, context::input::PacketIter};
use ffmpeg_next::media;
use ffmpeg_next::Rational;

use crate::error::{PlayerError, Result};

/// Frame rate assumed when a stream declares none (or a non-positive one).
pub const FALLBACK_FPS: f64 = 30.0;

/// An opened media container with its selected streams.
///
/// Stream selection is first-wins per type: the first video stream and the
/// first audio stream found in container order are used, everything else is
/// ignored. A video stream is required; audio is optional and its absence
/// makes the audio path downstream a no-op.
pub struct MediaSource {
    input: format::context::Input,
    video_index: usize,
    audio_index: Option<usize>,
    video_parameters: codec::Parameters,
    audio_parameters: Option<codec::Parameters>,
    frame_rate: f64,
}

impl MediaSource {
    /// Open a container and discover its playable streams.
    pub fn open(path: &Path) -> Result<Self> {
        let input = format::input(&path)?;

        let mut video = None;
        let mut audio = None;
        let mut ignored = 0usize;
        for stream in input.streams() {
            let parameters = stream.parameters();
            match parameters.medium() {
                media::Type::Video if video.is_none() => {
                    video = Some((stream.index(), parameters, stream.avg_frame_rate()));
                }
                media::Type::Audio if audio.is_none() => {
                    audio = Some((stream.index(), parameters));
                }
                _ => ignored += 1,
            }
        }
        if ignored > 0 {
            tracing::trace!(ignored, "dropping streams beyond the first video/audio");
        }

        let (video_index, video_parameters, declared_rate) =
            video.ok_or(PlayerError::NoVideoStream)?;
        let (audio_index, audio_parameters) = match audio {
            Some((index, parameters)) => (Some(index), Some(parameters)),
            None => (None, None),
        };

        let frame_rate = fps_or_default(declared_rate);
        tracing::debug!(
            video_index,
            ?audio_index,
            frame_rate,
            "opened {}",
            path.display()
        );

        Ok(Self {
            input,
            video_index,
            audio_index,
            video_parameters,
            audio_parameters,
            frame_rate,
        })
    }

    /// Index of the selected video stream.
    pub fn video_index(&self) -> usize {
        self.video_index
    }

    /// Index of the selected audio stream, if the container has one.
    pub fn audio_index(&self) -> Option<usize> {
        self.audio_index
    }

    /// Codec parameters of the selected video stream.
    pub fn video_parameters(&self) -> codec::Parameters {
        self.video_parameters.clone()
    }

    /// Codec parameters of the selected audio stream, if any.
    pub fn audio_parameters(&self) -> Option<codec::Parameters> {
        self.audio_parameters.clone()
    }

    /// Effective video frame rate, with the fallback already applied.
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Demultiplexed packets in container order, all streams interleaved.
    pub fn packets(&mut self) -> PacketIter<'_> {
        self.input.packets()
    }
}

/// Declared average frame rate as an `f64`, or [`FALLBACK_FPS`] when the
/// stream leaves it undeclared (0/0) or non-positive.
pub fn fps_or_default(rate: Rational) -> f64 {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        f64::from(rate.numerator()) / f64::from(rate.denominator())
    } else {
        FALLBACK_FPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_rate_passes_through() {
        assert_eq!(fps_or_default(Rational::new(30, 1)), 30.0);
        let ntsc = fps_or_default(Rational::new(30000, 1001));
        assert!((ntsc - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_undeclared_rate_falls_back_to_30() {
        assert_eq!(fps_or_default(Rational::new(0, 0)), FALLBACK_FPS);
        assert_eq!(fps_or_default(Rational::new(0, 1)), FALLBACK_FPS);
    }

    #[test]
    fn test_non_positive_rate_falls_back_to_30() {
        assert_eq!(fps_or_default(Rational::new(-25, 1)), FALLBACK_FPS);
        assert_eq!(fps_or_default(Rational::new(25, -1)), FALLBACK_FPS);
    }

    #[test]
    fn test_missing_file_is_an_open_error() {
        ffmpeg_next::init().unwrap();
        let result = MediaSource::open(Path::new("/nonexistent/clip.mp4"));
        assert!(matches!(result, Err(PlayerError::Media(_))));
    }
}
