//! Video decode and RGB conversion path.
//!
//! Packets go in, converted frames come out. The conversion context is built
//! once from the decoder's reported format and dimensions, outputs packed
//! RGB24 at source size (terminal-size reduction happens in the renderer),
//! and writes into a single frame that is reused for the whole session.

use ffmpeg_next::codec;
use ffmpeg_next::decoder;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame;
use ffmpeg_next::software::scaling;
use ffmpeg_next::Packet;

use crate::error::Result;

pub struct VideoDecoder {
    decoder: decoder::Video,
    scaler: scaling::Context,
    decoded: frame::Video,
    rgb: frame::Video,
}

impl VideoDecoder {
    pub fn new(parameters: codec::Parameters) -> Result<Self> {
        let decoder = codec::context::Context::from_parameters(parameters)?
            .decoder()
            .video()?;
        let scaler = scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            scaling::Flags::BILINEAR,
        )?;
        Ok(Self {
            decoder,
            scaler,
            decoded: frame::Video::empty(),
            rgb: frame::Video::empty(),
        })
    }

    /// Hand one encoded packet to the decoder. Decoder rejection drops the
    /// packet and playback continues.
    pub fn submit(&mut self, packet: &Packet) {
        if let Err(err) = self.decoder.send_packet(packet) {
            tracing::trace!(%err, "dropping undecodable video packet");
        }
    }

    /// Signal that no more packets will arrive, releasing any frames the
    /// decoder still holds into subsequent [`Self::next_frame`] calls.
    pub fn flush(&mut self) {
        if let Err(err) = self.decoder.send_eof() {
            tracing::trace!(%err, "video decoder refused end of stream");
        }
    }

    /// Next converted RGB frame, or `None` when the decoder needs more input
    /// (or has emitted everything after [`Self::flush`]).
    ///
    /// A frame the conversion context rejects (for example a mid-stream
    /// dimension change) is skipped, not surfaced.
    pub fn next_frame(&mut self) -> Option<&frame::Video> {
        loop {
            self.decoder.receive_frame(&mut self.decoded).ok()?;
            match self.scaler.run(&self.decoded, &mut self.rgb) {
                Ok(()) => return Some(&self.rgb),
                Err(err) => tracing::trace!(%err, "skipping unconvertible video frame"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaSource;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    const WIDTH: usize = 64;
    const HEIGHT: usize = 48;
    const FRAMES: usize = 12;

    /// Writes a raw YUV4MPEG2 clip; the format is plain bytes, so the test
    /// does not depend on any encoder being present.
    fn write_y4m_clip(path: &Path) {
        let mut file = File::create(path).unwrap();
        writeln!(file, "YUV4MPEG2 W{WIDTH} H{HEIGHT} F25:1 Ip A1:1 C420mpeg2").unwrap();
        for i in 0..FRAMES {
            file.write_all(b"FRAME\n").unwrap();
            let luma = (i * 20) as u8;
            file.write_all(&vec![luma; WIDTH * HEIGHT]).unwrap();
            file.write_all(&vec![128u8; WIDTH * HEIGHT / 4]).unwrap();
            file.write_all(&vec![128u8; WIDTH * HEIGHT / 4]).unwrap();
        }
    }

    #[test]
    fn test_decodes_every_frame_through_end_of_stream() {
        ffmpeg_next::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.y4m");
        write_y4m_clip(&path);

        let mut source = MediaSource::open(&path).unwrap();
        assert_eq!(source.audio_index(), None);
        assert_eq!(source.frame_rate(), 25.0);

        let mut video = VideoDecoder::new(source.video_parameters()).unwrap();
        let video_index = source.video_index();

        let mut seen = 0;
        for (stream, packet) in source.packets() {
            assert_eq!(stream.index(), video_index);
            video.submit(&packet);
            while let Some(rgb) = video.next_frame() {
                assert_eq!(rgb.width() as usize, WIDTH);
                assert_eq!(rgb.height() as usize, HEIGHT);
                assert!(rgb.stride(0) >= WIDTH * 3);
                seen += 1;
            }
        }

        video.flush();
        while video.next_frame().is_some() {
            seen += 1;
        }
        assert_eq!(seen, FRAMES);

        // Drained decoders stay drained.
        assert!(video.next_frame().is_none());
    }

    #[test]
    fn test_gray_input_converts_to_gray_rgb() {
        ffmpeg_next::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.y4m");
        write_y4m_clip(&path);

        let mut source = MediaSource::open(&path).unwrap();
        let mut video = VideoDecoder::new(source.video_parameters()).unwrap();

        let mut first_brightness = None;
        let mut last_brightness = 0u32;
        for (_, packet) in source.packets() {
            video.submit(&packet);
            while let Some(rgb) = video.next_frame() {
                let data = rgb.data(0);
                let p = u32::from(data[0]) + u32::from(data[1]) + u32::from(data[2]);
                if first_brightness.is_none() {
                    first_brightness = Some(p);
                }
                last_brightness = p;
            }
        }

        // Luma rises across the clip, so converted brightness must as well.
        assert!(last_brightness > first_brightness.unwrap());
    }
}
