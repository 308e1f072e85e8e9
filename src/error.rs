use std::{error, fmt, io};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by granulator.
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    SampleLoadError { path: String, reason: String },
    AudioDecodingError(Box<dyn error::Error + Send + Sync>),
    OutputDeviceError(Box<dyn error::Error + Send + Sync>),
    GrainIndexError(usize),
    ParameterError(String),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleLoadError { path, reason } => {
                write!(f, "Failed loading file with path \"{path}\": {reason}")
            }
            Self::AudioDecodingError(err) | Self::OutputDeviceError(err) => err.fmt(f),
            Self::GrainIndexError(index) => write!(f, "Grain with index {index} not found"),
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}
