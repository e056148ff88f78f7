pub mod audio;
pub mod video;

pub use audio::{AudioDecoder, PcmResampler};
pub use video::VideoDecoder;
