//! Audio decode and resample path.
//!
//! Decoded frames are resampled to packed signed 16-bit at the sink's
//! negotiated rate and channel count. The destination buffer is sized with
//! round-up rescaling that folds in the resampler's internal delay, so a
//! conversion can never truncate; its capacity only ever grows (high-water
//! mark), it is never shrunk mid-session.

use ffmpeg_next::codec;
use ffmpeg_next::decoder;
use ffmpeg_next::format::{sample, Sample};
use ffmpeg_next::frame;
use ffmpeg_next::software::resampling;
use ffmpeg_next::{ChannelLayout, Packet};

use crate::error::Result;

/// Interchange format handed to the sink: packed (interleaved) signed 16-bit.
const OUTPUT_FORMAT: Sample = Sample::I16(sample::Type::Packed);

/// Bytes per sample of [`OUTPUT_FORMAT`].
pub const BYTES_PER_SAMPLE: usize = 2;

/// Swresample wrapper producing interleaved S16 at a fixed target rate and
/// channel count, with a reused, monotonically grown destination buffer.
pub struct PcmResampler {
    ctx: resampling::Context,
    dst: frame::Audio,
    dst_layout: ChannelLayout,
    capacity: usize,
    src_rate: u32,
    dst_rate: u32,
    channels: u16,
}

impl PcmResampler {
    pub fn new(
        src_format: Sample,
        src_layout: ChannelLayout,
        src_rate: u32,
        dst_rate: u32,
        dst_channels: u16,
    ) -> Result<Self> {
        let dst_layout = layout_for(dst_channels);
        let ctx = resampling::Context::get(
            src_format,
            src_layout,
            src_rate,
            OUTPUT_FORMAT,
            dst_layout,
            dst_rate,
        )?;
        Ok(Self {
            ctx,
            dst: frame::Audio::empty(),
            dst_layout,
            capacity: 0,
            src_rate,
            dst_rate,
            channels: dst_channels,
        })
    }

    /// Convert one decoded frame and return the produced interleaved bytes.
    ///
    /// The byte length is exactly `samples * channels * BYTES_PER_SAMPLE`.
    pub fn convert(&mut self, src: &frame::Audio) -> Result<&[u8]> {
        let delay = self.ctx.delay().map(|d| d.input).unwrap_or(0);
        let required = required_samples(delay, src.samples(), self.src_rate, self.dst_rate);
        if required == 0 {
            return Ok(&[]);
        }

        if required > self.capacity {
            self.dst = frame::Audio::new(OUTPUT_FORMAT, required, self.dst_layout);
            self.capacity = required;
        } else {
            // The previous conversion shrank the frame's sample window to
            // what it produced; reopen the full allocated window.
            self.dst.set_samples(self.capacity);
        }

        self.ctx.run(src, &mut self.dst)?;
        let bytes = self.dst.samples() * self.channels as usize * BYTES_PER_SAMPLE;
        Ok(&self.dst.data(0)[..bytes])
    }
}

/// Output sample count needed to hold a conversion of `src_samples` plus the
/// resampler's buffered delay, rounded up so nothing is truncated.
pub fn required_samples(delay: i64, src_samples: usize, src_rate: u32, dst_rate: u32) -> usize {
    let pending = delay + src_samples as i64;
    let scaled = i128::from(pending) * i128::from(dst_rate);
    ((scaled + i128::from(src_rate) - 1) / i128::from(src_rate)) as usize
}

fn layout_for(channels: u16) -> ChannelLayout {
    match channels {
        1 => ChannelLayout::MONO,
        2 => ChannelLayout::STEREO,
        n => ChannelLayout::default(i32::from(n)),
    }
}

/// Decode half of the audio path: packets in, resampled S16 chunks out.
pub struct AudioDecoder {
    decoder: decoder::Audio,
    resampler: PcmResampler,
    decoded: frame::Audio,
}

impl AudioDecoder {
    /// Open the decoder and build the resampler targeting the sink's
    /// negotiated rate and channel count.
    pub fn new(
        parameters: codec::Parameters,
        target_rate: u32,
        target_channels: u16,
    ) -> Result<Self> {
        let decoder = codec::context::Context::from_parameters(parameters)?
            .decoder()
            .audio()?;
        // Some decoders report a channel count without a layout.
        let src_layout = if decoder.channel_layout().is_empty() {
            ChannelLayout::default(i32::from(decoder.channels()))
        } else {
            decoder.channel_layout()
        };
        let resampler = PcmResampler::new(
            decoder.format(),
            src_layout,
            decoder.rate(),
            target_rate,
            target_channels,
        )?;
        Ok(Self {
            decoder,
            resampler,
            decoded: frame::Audio::empty(),
        })
    }

    /// Hand one encoded packet to the decoder. Decoder rejection drops the
    /// packet and playback continues.
    pub fn submit(&mut self, packet: &Packet) {
        if let Err(err) = self.decoder.send_packet(packet) {
            tracing::trace!(%err, "dropping undecodable audio packet");
        }
    }

    /// Signal that no more packets will arrive, releasing any frames the
    /// decoder still holds into a final [`Self::drain`].
    pub fn flush(&mut self) {
        if let Err(err) = self.decoder.send_eof() {
            tracing::trace!(%err, "audio decoder refused end of stream");
        }
    }

    /// Pull every frame the decoder currently has, resample each, and hand
    /// the bytes to `consume`. A frame the resampler rejects is skipped.
    pub fn drain(&mut self, mut consume: impl FnMut(&[u8])) {
        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            match self.resampler.convert(&self.decoded) {
                Ok(bytes) => consume(bytes),
                Err(err) => tracing::trace!(%err, "skipping unresamplable audio frame"),
            }
        }
    }
}
