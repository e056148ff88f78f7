//! Playback session driver.
//!
//! A session is single threaded: packets are read in stream order, video
//! frames are presented with a sleep-based cadence derived from the declared
//! frame rate, and audio is pushed to the sink as fast as it decodes. After
//! the input runs out the decoders are flushed and the audio queue is given
//! time to play out. A quit key ends the session early; it is noticed once
//! per packet while running and once per wait while draining.

use std::path::Path;
use std::thread;
use std::time::Duration;

use ffmpeg_next::frame;
use ffmpeg_next::Packet;

use crate::audio::AudioSink;
use crate::decode::{AudioDecoder, VideoDecoder};
use crate::error::Result;
use crate::media::MediaSource;
use crate::playback::Phase;
use crate::render::Terminal;

/// Cadence for presenting frames that emerge after end of input, where the
/// declared frame rate no longer applies.
const FLUSH_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Poll interval while waiting for the audio queue to play out.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// What the drive loop needs from the video decode path.
trait FrameSource {
    fn submit(&mut self, packet: &Packet);
    fn flush(&mut self);
    fn next_frame(&mut self) -> Option<&frame::Video>;
}

impl FrameSource for VideoDecoder {
    fn submit(&mut self, packet: &Packet) {
        VideoDecoder::submit(self, packet);
    }

    fn flush(&mut self) {
        VideoDecoder::flush(self);
    }

    fn next_frame(&mut self) -> Option<&frame::Video> {
        VideoDecoder::next_frame(self)
    }
}

/// What the drive loop needs from the display surface.
trait Screen {
    fn draw(&mut self, frame: &frame::Video) -> Result<()>;
    fn poll_quit(&mut self) -> Result<bool>;
}

impl Screen for Terminal {
    fn draw(&mut self, frame: &frame::Video) -> Result<()> {
        Terminal::draw(self, frame)
    }

    fn poll_quit(&mut self) -> Result<bool> {
        Terminal::poll_quit(self)
    }
}

pub struct Player {
    source: MediaSource,
    video: VideoDecoder,
    audio: Option<AudioDecoder>,
    sink: AudioSink,
    terminal: Terminal,
    frame_interval: Duration,
}

impl Player {
    /// Open the file and set up the whole pipeline. Everything fallible
    /// happens before the terminal is touched, so a failed start never
    /// leaves the screen in raw mode.
    pub fn new(path: &Path) -> Result<Self> {
        ffmpeg_next::init()?;
        let source = MediaSource::open(path)?;
        let video = VideoDecoder::new(source.video_parameters())?;

        let (sink, audio) = match source.audio_parameters() {
            Some(parameters) => {
                let sink = AudioSink::open()?;
                let (rate, channels) = sink.negotiated();
                match AudioDecoder::new(parameters, rate, channels) {
                    Ok(decoder) => (sink, Some(decoder)),
                    Err(err) => {
                        tracing::warn!(%err, "audio decoder unavailable, continuing without sound");
                        (AudioSink::disabled(), None)
                    }
                }
            }
            None => (AudioSink::disabled(), None),
        };

        let frame_interval = frame_interval(source.frame_rate());
        let terminal = Terminal::new()?;
        Ok(Self {
            source,
            video,
            audio,
            sink,
            terminal,
            frame_interval,
        })
    }

    /// Play the session through, or until a quit key arrives.
    pub fn run(self) -> Result<()> {
        let Player {
            mut source,
            mut video,
            mut audio,
            sink,
            mut terminal,
            frame_interval,
        } = self;
        drive(
            &mut source,
            &mut video,
            audio.as_mut(),
            &sink,
            &mut terminal,
            frame_interval,
        )
    }
}

/// Walk the session phases to completion. Quit is polled once per packet
/// while running and once per wait while draining; the flush pass has no
/// poll point, and frames the decoder held back are always presented.
fn drive(
    source: &mut MediaSource,
    video: &mut impl FrameSource,
    mut audio: Option<&mut AudioDecoder>,
    sink: &AudioSink,
    screen: &mut impl Screen,
    frame_interval: Duration,
) -> Result<()> {
    let video_index = source.video_index();
    let audio_index = source.audio_index();

    let mut phase = Phase::Running;
    while !phase.is_stopped() {
        if phase.is_running() {
            for (stream, packet) in source.packets() {
                if screen.poll_quit()? {
                    tracing::debug!("quit requested");
                    return Ok(());
                }
                let index = stream.index();
                if index == video_index {
                    video.submit(&packet);
                    while let Some(frame) = video.next_frame() {
                        screen.draw(frame)?;
                        thread::sleep(frame_interval);
                    }
                } else if Some(index) == audio_index {
                    if let Some(decoder) = audio.as_deref_mut() {
                        decoder.submit(&packet);
                        decoder.drain(|bytes| sink.queue(bytes));
                    }
                }
            }
        } else if phase.is_flushing() {
            video.flush();
            while let Some(frame) = video.next_frame() {
                screen.draw(frame)?;
                thread::sleep(FLUSH_FRAME_INTERVAL);
            }
            if let Some(decoder) = audio.as_deref_mut() {
                decoder.flush();
                decoder.drain(|bytes| sink.queue(bytes));
            }
        } else {
            while sink.queued_bytes() > 0 {
                if screen.poll_quit()? {
                    return Ok(());
                }
                thread::sleep(DRAIN_POLL_INTERVAL);
            }
        }
        phase = phase.advance();
        tracing::debug!(?phase, "phase change");
    }
    Ok(())
}

/// Delay between presented frames for a declared frame rate, truncated to
/// whole microseconds the way a usleep-based pacer would.
fn frame_interval(fps: f64) -> Duration {
    Duration::from_micros((1_000_000.0 / fps) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::FALLBACK_FPS;
    use ffmpeg_next::format::Pixel;
    use std::collections::VecDeque;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_frame_interval_truncates_to_microseconds() {
        assert_eq!(frame_interval(25.0), Duration::from_micros(40_000));
        assert_eq!(frame_interval(30.0), Duration::from_micros(33_333));
        assert_eq!(frame_interval(60.0), Duration::from_micros(16_666));
    }

    #[test]
    fn test_fallback_rate_paces_at_thirty_frames() {
        assert_eq!(frame_interval(FALLBACK_FPS), Duration::from_micros(33_333));
    }

    #[test]
    fn test_missing_file_fails_before_touching_the_terminal() {
        let err = Player::new(Path::new("/no/such/clip.mp4"));
        assert!(err.is_err());
        // The terminal was never entered, so raw mode must be off.
        assert!(!crossterm::terminal::is_raw_mode_enabled().unwrap());
    }

    /// Four gray 16x16 frames; enough to walk every phase.
    fn write_clip(path: &Path) {
        let mut file = File::create(path).unwrap();
        file.write_all(b"YUV4MPEG2 W16 H16 F25:1 Ip A1:1 C420mpeg2\n")
            .unwrap();
        for i in 0..4u8 {
            file.write_all(b"FRAME\n").unwrap();
            file.write_all(&vec![60 + i * 40; 16 * 16]).unwrap();
            file.write_all(&[128u8; 16 * 16 / 4]).unwrap();
            file.write_all(&[128u8; 16 * 16 / 4]).unwrap();
        }
    }

    #[test]
    fn test_video_only_session_plays_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.y4m");
        write_clip(&path);
        // Needs a tty for the terminal session; skip quietly where absent.
        match Player::new(&path) {
            Ok(player) => player.run().unwrap(),
            Err(_) => assert!(!crossterm::terminal::is_raw_mode_enabled().unwrap()),
        }
    }

    /// Stands in for the video decode path, withholding the last `held`
    /// frames until the flush signal arrives.
    struct BufferingDecoder {
        held: usize,
        pending: VecDeque<frame::Video>,
        flushed: bool,
        current: Option<frame::Video>,
    }

    impl BufferingDecoder {
        fn new(held: usize) -> Self {
            Self {
                held,
                pending: VecDeque::new(),
                flushed: false,
                current: None,
            }
        }
    }

    impl FrameSource for BufferingDecoder {
        fn submit(&mut self, _packet: &Packet) {
            self.pending.push_back(frame::Video::new(Pixel::RGB24, 8, 8));
        }

        fn flush(&mut self) {
            self.flushed = true;
        }

        fn next_frame(&mut self) -> Option<&frame::Video> {
            let withheld = if self.flushed { 0 } else { self.held };
            if self.pending.len() > withheld {
                self.current = self.pending.pop_front();
                self.current.as_ref()
            } else {
                None
            }
        }
    }

    /// Counts draws and polls, reporting quit on every poll past `quit_after`.
    struct CountingScreen {
        drawn: usize,
        polled: usize,
        quit_after: usize,
    }

    impl CountingScreen {
        fn new(quit_after: usize) -> Self {
            Self {
                drawn: 0,
                polled: 0,
                quit_after,
            }
        }
    }

    impl Screen for CountingScreen {
        fn draw(&mut self, _frame: &frame::Video) -> Result<()> {
            self.drawn += 1;
            Ok(())
        }

        fn poll_quit(&mut self) -> Result<bool> {
            self.polled += 1;
            Ok(self.polled > self.quit_after)
        }
    }

    #[test]
    fn test_quit_while_running_stops_without_flushing() {
        ffmpeg_next::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.y4m");
        write_clip(&path);
        let mut source = MediaSource::open(&path).unwrap();
        let mut video = BufferingDecoder::new(2);
        let sink = AudioSink::disabled();
        let mut screen = CountingScreen::new(0);

        drive(&mut source, &mut video, None, &sink, &mut screen, Duration::ZERO).unwrap();

        // Quit on the first poll: nothing was presented and the decoder was
        // never flushed.
        assert_eq!(screen.polled, 1);
        assert_eq!(screen.drawn, 0);
        assert!(!video.flushed);
    }

    #[test]
    fn test_flush_presents_frames_the_decoder_held_back() {
        ffmpeg_next::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.y4m");
        write_clip(&path);
        let mut source = MediaSource::open(&path).unwrap();
        let mut video = BufferingDecoder::new(2);
        let sink = AudioSink::disabled();
        // Any poll after the four per-packet ones reports quit; the flush
        // pass must not ask.
        let mut screen = CountingScreen::new(4);

        drive(&mut source, &mut video, None, &sink, &mut screen, Duration::ZERO).unwrap();

        assert!(video.flushed);
        assert_eq!(screen.drawn, 4);
        assert_eq!(screen.polled, 4);
    }
}
