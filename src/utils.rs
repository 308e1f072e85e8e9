//! Sample loading and buffer helpers.

pub mod buffer;
pub mod decoder;

pub use decoder::{load_mono, AudioDecoder, MonoSampleBuffer};
