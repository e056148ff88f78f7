pub mod driver;
pub mod phase;

pub use driver::Player;
pub use phase::Phase;
