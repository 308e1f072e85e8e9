use std::f32::consts::PI;

// -------------------------------------------------------------------------------------------------

/// Amplitude envelope shape applied over a grain's cycle.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
    strum::EnumCount,
)]
#[repr(u8)]
pub enum GrainWindowMode {
    /// Linear fade out: full gain at the cycle start, silence at its end.
    RampDown = 0,
    /// Linear fade in: silence at the cycle start, full gain at its end.
    RampUp = 1,
    /// Half sine: silence at both cycle boundaries, full gain at the cycle's midpoint.
    #[default]
    HalfSine = 2,
}

// -------------------------------------------------------------------------------------------------

/// Calculate the window gain for a grain, which is `pointer` samples into a cycle of
/// `grain_size` samples.
///
/// Grains smaller than a single sample are inert and always get a gain of 0, as well as
/// pointers outside of the grain's cycle.
#[inline]
pub fn apply_window(mode: GrainWindowMode, pointer: f32, grain_size: f32) -> f32 {
    if grain_size < 1.0 || !(0.0..=grain_size).contains(&pointer) {
        return 0.0;
    }
    match mode {
        GrainWindowMode::RampDown => 1.0 - pointer / grain_size,
        GrainWindowMode::RampUp => pointer / grain_size,
        GrainWindowMode::HalfSine => {
            // sin(PI) is not exactly 0 in f32 precision
            if pointer == 0.0 || pointer == grain_size {
                0.0
            } else {
                (PI * pointer / grain_size).sin()
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::VariantNames;

    #[test]
    fn inert_grains() {
        for mode in [
            GrainWindowMode::RampDown,
            GrainWindowMode::RampUp,
            GrainWindowMode::HalfSine,
        ] {
            for pointer in [-10.0, 0.0, 0.5, 0.99, 100.0] {
                assert_eq!(apply_window(mode, pointer, 0.0), 0.0);
                assert_eq!(apply_window(mode, pointer, 0.999), 0.0);
            }
        }
    }

    #[test]
    fn half_sine() {
        let mode = GrainWindowMode::HalfSine;
        for grain_size in [1.0, 7.0, 441.0, 31531.5] {
            assert_eq!(apply_window(mode, 0.0, grain_size), 0.0);
            assert_eq!(apply_window(mode, grain_size, grain_size), 0.0);
            assert!((apply_window(mode, grain_size / 2.0, grain_size) - 1.0).abs() < 1e-5);
            let quarter = apply_window(mode, grain_size / 4.0, grain_size);
            assert!((quarter - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);
        }
    }

    #[test]
    fn ramps() {
        assert_eq!(apply_window(GrainWindowMode::RampDown, 0.0, 100.0), 1.0);
        assert_eq!(apply_window(GrainWindowMode::RampDown, 25.0, 100.0), 0.75);
        assert_eq!(apply_window(GrainWindowMode::RampDown, 100.0, 100.0), 0.0);
        assert_eq!(apply_window(GrainWindowMode::RampUp, 0.0, 100.0), 0.0);
        assert_eq!(apply_window(GrainWindowMode::RampUp, 25.0, 100.0), 0.25);
        assert_eq!(apply_window(GrainWindowMode::RampUp, 100.0, 100.0), 1.0);

        // outside of the cycle
        for mode in [GrainWindowMode::RampDown, GrainWindowMode::RampUp] {
            assert_eq!(apply_window(mode, -1.0, 100.0), 0.0);
            assert_eq!(apply_window(mode, 101.0, 100.0), 0.0);
            assert_eq!(apply_window(mode, f32::NAN, 100.0), 0.0);
        }
    }

    #[test]
    fn mode_names() {
        assert_eq!(GrainWindowMode::default(), GrainWindowMode::HalfSine);
        assert_eq!(
            GrainWindowMode::VARIANTS,
            &["RampDown", "RampUp", "HalfSine"]
        );
        assert_eq!(
            GrainWindowMode::from_str("RampUp").unwrap(),
            GrainWindowMode::RampUp
        );
        assert!(GrainWindowMode::from_str("Hann").is_err());
    }
}
