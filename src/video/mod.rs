pub mod capture;
pub mod converter;
pub mod player;

pub use capture::*;
pub use converter::*;
pub use player::*;
