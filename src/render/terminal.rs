//! Raw-mode terminal output.
//!
//! The terminal is switched to the alternate screen with the cursor hidden
//! for the whole session and restored on drop, even when the session ends
//! with an error.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, queue, style, terminal};
use ffmpeg_next::frame;

use crate::error::Result;
use crate::render::ascii;

pub struct Terminal {
    stdout: io::Stdout,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        // No value exists yet for Drop to clean up, so raw mode has to be
        // undone by hand if entering the screen fails.
        if let Err(err) = execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(err.into());
        }
        Ok(Self { stdout })
    }

    /// Rasterize one RGB frame at whatever size the terminal has right now
    /// and write it in a single flush.
    pub fn draw(&mut self, frame: &frame::Video) -> Result<()> {
        let (cols, rows) = terminal::size()?;
        let lines = ascii::frame_to_lines(
            frame.data(0),
            frame.stride(0),
            frame.width() as usize,
            frame.height() as usize,
            cols as usize,
            rows as usize,
        );
        for (row, line) in lines.iter().enumerate() {
            queue!(
                self.stdout,
                cursor::MoveTo(0, row as u16),
                style::Print(line)
            )?;
        }
        self.stdout.flush()?;
        Ok(())
    }

    /// Drain pending key events, reporting whether a quit key was pressed.
    /// Raw mode swallows the usual SIGINT, so Ctrl-C is treated as quit here
    /// alongside `q`.
    pub fn poll_quit(&mut self) -> Result<bool> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(true),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(true);
                    }
                    _ => {}
                }
            }
        }
        Ok(false)
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = execute!(self.stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
