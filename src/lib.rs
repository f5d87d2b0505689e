pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod logging;
pub mod models;
pub mod playback;
pub mod player;
pub mod preview;
pub mod quality;
pub mod sim;
pub mod surface;
pub mod waveform;

#[cfg(test)]
mod testing;

pub use error::*;
pub use models::*;
