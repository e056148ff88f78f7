//! Queued audio output.
//!
//! Decoded samples are pushed into an unbounded channel; the device callback
//! pulls one sample per slot and substitutes silence when the channel runs
//! dry. This keeps the producer side free of backpressure and makes "how
//! much is still queued" a channel length query.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, SupportedStreamConfig};
use crossbeam::channel::{unbounded, Sender};

use crate::decode::audio::BYTES_PER_SAMPLE;
use crate::error::{PlayerError, Result};

/// Rate requested from the device before falling back to its default.
const PREFERRED_RATE: u32 = 44_100;
const PREFERRED_CHANNELS: u16 = 2;

pub struct AudioSink {
    // Held only to keep the device playing; dropped on session end.
    _stream: Option<cpal::Stream>,
    queue: Option<Sender<i16>>,
    rate: u32,
    channels: u16,
}

impl AudioSink {
    /// Open the default output device, preferring 44.1kHz stereo S16 and
    /// falling back to whatever the device offers by default.
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlayerError::NoAudioDevice)?;

        let config = preferred_config(&device)?;
        let sample_format = config.sample_format();
        let stream_config: cpal::StreamConfig = config.into();
        let rate = stream_config.sample_rate.0;
        let channels = stream_config.channels;

        let (tx, rx) = unbounded::<i16>();
        let stream = match sample_format {
            SampleFormat::I16 => device.build_output_stream(
                &stream_config,
                move |data: &mut [i16], _| {
                    for slot in data {
                        *slot = rx.try_recv().unwrap_or(0);
                    }
                },
                stream_error,
                None,
            )?,
            SampleFormat::U16 => device.build_output_stream(
                &stream_config,
                move |data: &mut [u16], _| {
                    for slot in data {
                        *slot = rx
                            .try_recv()
                            .map(|s| (i32::from(s) + 32_768) as u16)
                            .unwrap_or(32_768);
                    }
                },
                stream_error,
                None,
            )?,
            SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| {
                    for slot in data {
                        *slot = rx
                            .try_recv()
                            .map(|s| f32::from(s) / 32_768.0)
                            .unwrap_or(0.0);
                    }
                },
                stream_error,
                None,
            )?,
            other => return Err(PlayerError::UnsupportedSampleFormat(other)),
        };
        stream.play()?;

        tracing::debug!(rate, channels, %sample_format, "audio sink opened");
        Ok(Self {
            _stream: Some(stream),
            queue: Some(tx),
            rate,
            channels,
        })
    }

    /// A sink for sessions without an audio stream: accepts nothing and
    /// always reports an empty queue.
    pub fn disabled() -> Self {
        Self {
            _stream: None,
            queue: None,
            rate: PREFERRED_RATE,
            channels: PREFERRED_CHANNELS,
        }
    }

    /// Rate and channel count the device actually accepted.
    pub fn negotiated(&self) -> (u32, u16) {
        (self.rate, self.channels)
    }

    /// Queue interleaved native-endian S16 bytes for playback.
    pub fn queue(&self, bytes: &[u8]) {
        if let Some(tx) = &self.queue {
            for pair in bytes.chunks_exact(2) {
                let _ = tx.send(i16::from_ne_bytes([pair[0], pair[1]]));
            }
        }
    }

    /// Bytes queued but not yet handed to the device callback.
    pub fn queued_bytes(&self) -> usize {
        self.queue
            .as_ref()
            .map_or(0, |tx| tx.len() * BYTES_PER_SAMPLE)
    }
}

fn preferred_config(device: &cpal::Device) -> Result<SupportedStreamConfig> {
    if let Ok(ranges) = device.supported_output_configs() {
        for range in ranges {
            if range.channels() == PREFERRED_CHANNELS
                && range.sample_format() == SampleFormat::I16
                && range.min_sample_rate() <= SampleRate(PREFERRED_RATE)
                && SampleRate(PREFERRED_RATE) <= range.max_sample_rate()
            {
                return Ok(range.with_sample_rate(SampleRate(PREFERRED_RATE)));
            }
        }
    }
    Ok(device.default_output_config()?)
}

fn stream_error(err: cpal::StreamError) {
    tracing::warn!(%err, "audio output stream error");
}
