pub mod source;

pub use source::{fps_or_default, MediaSource, FALLBACK_FPS};
