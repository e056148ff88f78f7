pub mod ascii;
pub mod terminal;

pub use ascii::{frame_to_lines, glyph_for, ASCII_RAMP};
pub use terminal::Terminal;
