use crate::{granular::GrainWindowMode, Error};

// -------------------------------------------------------------------------------------------------

/// Setup options of a [`GrainPool`](super::GrainPool). Immutable after the pool got created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GranularOptions {
    /// Number of grains in the pool (1 - [`MAX_GRAIN_COUNT`](Self::MAX_GRAIN_COUNT)).
    pub grain_count: usize,
    /// Envelope shape that is applied to all grains.
    pub window: GrainWindowMode,
    /// Optional seed for the grain re-trigger randomization. When `None` the random
    /// generator is seeded from the OS.
    pub seed: Option<u64>,
}

impl Default for GranularOptions {
    fn default() -> Self {
        Self {
            grain_count: 8,
            window: GrainWindowMode::HalfSine,
            seed: None,
        }
    }
}

impl GranularOptions {
    /// Maximum number of grains a pool can be configured with.
    pub const MAX_GRAIN_COUNT: usize = 256;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn grain_count(mut self, grain_count: usize) -> Self {
        self.grain_count = grain_count;
        self
    }

    pub fn window(mut self, window: GrainWindowMode) -> Self {
        self.window = window;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate all options.
    pub fn validate(&self) -> Result<(), Error> {
        if self.grain_count < 1 || self.grain_count > Self::MAX_GRAIN_COUNT {
            return Err(Error::ParameterError(format!(
                "Grain count must be between 1 and {}, but is {}",
                Self::MAX_GRAIN_COUNT,
                self.grain_count
            )));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// User facing control parameters of a [`GrainPool`](super::GrainPool), in time domain units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GranularParameters {
    /// Size of each grain in milliseconds (0.0 - 1000.0).
    pub grain_size_ms: f32,
    /// Start position of the grains in the sample in milliseconds (>= 0.0).
    pub file_position_ms: f32,
    /// Samples a grain's read pointer advances per frame (-2.0 - 2.0).
    /// Negative values play grains in reverse.
    pub playback_speed: f32,
    /// Probability that a grain gets played (0.0 - 1.0). Stored only: see
    /// [`GrainPool::set_grain_muted`](super::GrainPool::set_grain_muted).
    pub probability: f32,
    /// Amount of randomness that gets applied to the grain size (0.0 - 1.0).
    pub grain_size_randomness: f32,
    /// Amount of randomness that gets applied to the file position (0.0 - 1.0).
    pub file_position_randomness: f32,
}

impl Default for GranularParameters {
    fn default() -> Self {
        Self {
            grain_size_ms: 715.0,
            file_position_ms: 3770.0,
            playback_speed: 1.0,
            probability: 0.5,
            grain_size_randomness: 0.85,
            file_position_randomness: 0.45,
        }
    }
}

impl GranularParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate all parameters.
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1000.0).contains(&self.grain_size_ms) {
            return Err(Error::ParameterError(
                "Grain size must be between 0 and 1000 ms".to_string(),
            ));
        }

        if !(self.file_position_ms >= 0.0 && self.file_position_ms.is_finite()) {
            return Err(Error::ParameterError(
                "File position must be a positive number of ms".to_string(),
            ));
        }

        if !(-2.0..=2.0).contains(&self.playback_speed) {
            return Err(Error::ParameterError(
                "Playback speed must be between -2.0 and 2.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.probability) {
            return Err(Error::ParameterError(
                "Probability must be between 0.0 and 1.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.grain_size_randomness) {
            return Err(Error::ParameterError(
                "Grain size randomness must be between 0.0 and 1.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.file_position_randomness) {
            return Err(Error::ParameterError(
                "File position randomness must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Global control state of a [`GrainPool`](super::GrainPool), converted to the sample domain.
///
/// Read by every grain when it gets re-triggered. Grains in the middle of a cycle keep their
/// own size and position until their next re-trigger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrainControls {
    /// Grain size in samples.
    pub grain_size: f32,
    /// Grain start position in samples.
    pub file_position: f32,
    /// Samples a grain's pointer advances per frame.
    pub playback_speed: f32,
    /// Play probability in percent (0 - 100).
    pub probability: f32,
    pub grain_size_randomness: f32,
    pub file_position_randomness: f32,
}

impl Default for GrainControls {
    fn default() -> Self {
        Self {
            grain_size: 0.0,
            file_position: 0.0,
            playback_speed: 1.0,
            probability: 100.0,
            grain_size_randomness: 0.0,
            file_position_randomness: 0.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options() {
        assert!(GranularOptions::default().validate().is_ok());
        assert!(GranularOptions::new().grain_count(1).validate().is_ok());
        assert!(GranularOptions::new().grain_count(0).validate().is_err());
        assert!(GranularOptions::new()
            .grain_count(GranularOptions::MAX_GRAIN_COUNT + 1)
            .validate()
            .is_err());

        let options = GranularOptions::new()
            .window(GrainWindowMode::RampUp)
            .seed(42);
        assert_eq!(options.window, GrainWindowMode::RampUp);
        assert_eq!(options.seed, Some(42));
    }

    #[test]
    fn parameters() {
        assert!(GranularParameters::default().validate().is_ok());

        let invalid = [
            GranularParameters {
                grain_size_ms: 1001.0,
                ..Default::default()
            },
            GranularParameters {
                file_position_ms: -1.0,
                ..Default::default()
            },
            GranularParameters {
                file_position_ms: f32::INFINITY,
                ..Default::default()
            },
            GranularParameters {
                playback_speed: -2.5,
                ..Default::default()
            },
            GranularParameters {
                probability: 1.5,
                ..Default::default()
            },
            GranularParameters {
                grain_size_randomness: -0.1,
                ..Default::default()
            },
            GranularParameters {
                file_position_randomness: f32::NAN,
                ..Default::default()
            },
        ];
        for parameters in invalid {
            assert!(parameters.validate().is_err(), "{parameters:?}");
        }
    }
}
