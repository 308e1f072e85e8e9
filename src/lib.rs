#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod error;
mod granular;
#[cfg(any(feature = "cpal-output", feature = "wav-output"))]
mod output;
mod source;

// public, flat re-exports
pub use error::Error;

pub use granular::{
    apply_window, interpolate_cubic, GrainControls, GrainPool, GrainState, GrainWindowMode,
    GranularOptions, GranularParameters,
};

#[cfg(feature = "cpal-output")]
pub use output::{AudioHostId, DefaultOutputDevice};
#[cfg(any(feature = "cpal-output", feature = "wav-output"))]
pub use output::OutputDevice;

pub use source::{
    empty::EmptySource,
    granular::{GranularHandle, GranularMessage, GranularSource},
    Source,
};

// public mods
pub mod utils;

#[cfg(any(feature = "cpal-output", feature = "wav-output"))]
pub mod outputs {
    //! Available audio output device implementations.

    #[cfg(feature = "cpal-output")]
    pub use super::output::cpal::CpalOutput;
    #[cfg(feature = "wav-output")]
    pub use super::output::wav::WavOutput;
}
