pub mod config;
pub mod exponent;
pub mod output_path;


pub use config::*;
pub use exponent::*;
pub use output_path::*;
