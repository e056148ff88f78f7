//! Entry point: argument handling, logging setup, and session dispatch.

mod audio;
mod decode;
mod error;
mod media;
mod playback;
mod render;

use std::env;
use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use crate::playback::Player;

fn main() {
    // Silent unless RUST_LOG asks for output; diagnostics go to stderr so
    // they never mix with the rendered frames.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: glyphcast <video-file>");
        process::exit(1);
    }

    if let Err(err) = Player::new(Path::new(&args[1])).and_then(Player::run) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
