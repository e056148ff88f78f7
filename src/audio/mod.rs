pub mod sink;

pub use sink::AudioSink;
