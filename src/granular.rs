//! Granular synthesis on a fixed pool of grains.

use std::{path::Path, sync::Arc};

use assume::assume;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{utils::decoder::load_mono, Error};

// -------------------------------------------------------------------------------------------------

mod interpolation;
mod parameters;
mod window;

pub use interpolation::interpolate_cubic;
pub use parameters::{GrainControls, GranularOptions, GranularParameters};
pub use window::{apply_window, GrainWindowMode};

use interpolation::neighbour_samples;

// -------------------------------------------------------------------------------------------------

/// Fixed attenuation applied to each grain, to avoid clipping when grains overlap.
const GRAIN_OUTPUT_GAIN: f32 = 0.75;

// -------------------------------------------------------------------------------------------------

/// Copy of a single grain's state within a [`GrainPool`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GrainState {
    /// Elapsed samples since the grain's current cycle started.
    pub pointer: f32,
    /// Sample offset where the grain's current cycle starts reading.
    pub file_position: f32,
    /// Length of the grain's current cycle in samples.
    pub grain_size: f32,
    /// When set, the grain plays silence until its current cycle ends.
    pub muted: bool,
}

// -------------------------------------------------------------------------------------------------

/// Reads a mono sample buffer through a fixed number of independently positioned grains and
/// sums their windowed, cubic interpolated output into a single signal, one frame at a time.
///
/// Grain state is stored as parallel arrays, indexed by the grain's index. Grains are never
/// created or destroyed after setup: when a grain's cycle ends, it gets re-triggered in place
/// with the current global [`GrainControls`], randomized by a single draw of the pool's
/// random number generator.
///
/// [`process`](Self::process) does not allocate, block or fail: read positions outside of
/// the sample buffer and degenerate grain sizes resolve to silence for the affected grain only.
///
/// The pool is not synchronized. Parameter setters and [`process`](Self::process) must be
/// called from the same thread, which is what [`GranularSource`](crate::GranularSource) does
/// with the messages it receives from its [`GranularHandle`](crate::GranularHandle)s.
pub struct GrainPool<R: Rng = SmallRng> {
    /// Sample rate used to convert time domain parameters to samples.
    sample_rate: u32,
    /// Envelope shape applied to all grains.
    window: GrainWindowMode,
    /// Read-only mono source buffer shared by all grains.
    sample_buffer: Arc<[f32]>,
    /// Read pointer of each grain in frames.
    pointers: Box<[f32]>,
    /// Start position of each grain's current cycle in frames.
    file_positions: Box<[f32]>,
    /// Size of each grain's current cycle in frames.
    grain_sizes: Box<[f32]>,
    /// Whether each grain is muted until its current cycle ends.
    muted: Box<[bool]>,
    /// Global parameters, applied to grains when they get re-triggered.
    controls: GrainControls,
    /// Random number generator for grain re-triggering.
    rng: R,
}

impl GrainPool<SmallRng> {
    /// Load the mono sample from the given file path and create a new grain pool for it.
    ///
    /// The loaded sample is not resampled: when the file's sample rate doesn't match the given
    /// output sample rate, grains will play back pitched.
    pub fn from_file<P: AsRef<Path>>(
        file_path: P,
        sample_rate: u32,
        options: GranularOptions,
    ) -> Result<Self, Error> {
        options.validate()?;
        let sample = load_mono(file_path.as_ref())?;
        if sample.sample_rate() != sample_rate {
            log::warn!(
                "Sample rate of '{}' ({} Hz) does not match the output rate ({} Hz)",
                file_path.as_ref().display(),
                sample.sample_rate(),
                sample_rate
            );
        }
        Self::new(Arc::clone(sample.samples()), sample_rate, options)
    }

    /// Create a new grain pool for the given mono sample buffer, seeding the random number
    /// generator from the options' seed or the OS.
    pub fn new(
        sample_buffer: impl Into<Arc<[f32]>>,
        sample_rate: u32,
        options: GranularOptions,
    ) -> Result<Self, Error> {
        let rng = match options.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self::with_rng(sample_buffer, sample_rate, options, rng)
    }
}

impl<R: Rng> GrainPool<R> {
    /// Create a new grain pool for the given mono sample buffer with a custom random number
    /// generator. The options' seed is ignored.
    pub fn with_rng(
        sample_buffer: impl Into<Arc<[f32]>>,
        sample_rate: u32,
        options: GranularOptions,
        rng: R,
    ) -> Result<Self, Error> {
        options.validate()?;
        if sample_rate == 0 {
            return Err(Error::ParameterError(
                "Sample rate must be greater than 0".to_string(),
            ));
        }
        let sample_buffer = sample_buffer.into();
        if sample_buffer.is_empty() {
            return Err(Error::ParameterError(
                "Sample buffer must not be empty".to_string(),
            ));
        }
        log::debug!(
            "Creating grain pool with {} grains for {} sample frames",
            options.grain_count,
            sample_buffer.len()
        );
        Ok(Self::allocate(
            options.grain_count,
            sample_rate,
            options.window,
            sample_buffer,
            rng,
        ))
    }

    fn allocate(
        grain_count: usize,
        sample_rate: u32,
        window: GrainWindowMode,
        sample_buffer: Arc<[f32]>,
        rng: R,
    ) -> Self {
        Self {
            sample_rate,
            window,
            sample_buffer,
            pointers: vec![0.0; grain_count].into_boxed_slice(),
            file_positions: vec![0.0; grain_count].into_boxed_slice(),
            grain_sizes: vec![0.0; grain_count].into_boxed_slice(),
            muted: vec![false; grain_count].into_boxed_slice(),
            controls: GrainControls::default(),
            rng,
        }
    }

    /// Number of grains in the pool.
    pub fn grain_count(&self) -> usize {
        self.pointers.len()
    }

    /// Sample rate the pool got configured with.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Envelope shape applied to all grains.
    pub fn window(&self) -> GrainWindowMode {
        self.window
    }

    /// The shared, read-only sample buffer.
    pub fn sample_buffer(&self) -> &Arc<[f32]> {
        &self.sample_buffer
    }

    /// Current global control state in the sample domain.
    pub fn controls(&self) -> &GrainControls {
        &self.controls
    }

    /// Copy of the grain's current state, or `None` when the index is out of range.
    pub fn grain(&self, index: usize) -> Option<GrainState> {
        if index >= self.grain_count() {
            return None;
        }
        Some(GrainState {
            pointer: self.pointers[index],
            file_position: self.file_positions[index],
            grain_size: self.grain_sizes[index],
            muted: self.muted[index],
        })
    }

    /// Set grain size in milliseconds.
    pub fn set_grain_size_ms(&mut self, grain_size: f32) {
        self.controls.grain_size = self.ms_to_samples(grain_size);
    }

    /// Set file position in milliseconds.
    pub fn set_file_position_ms(&mut self, file_position: f32) {
        self.controls.file_position = self.ms_to_samples(file_position);
    }

    /// Set the amount of samples the grain's read pointers advance each frame.
    pub fn set_playback_speed(&mut self, playback_speed: f32) {
        self.controls.playback_speed = playback_speed;
    }

    /// Set the probability (0.0 - 1.0) that a grain will be played.
    pub fn set_probability(&mut self, probability: f32) {
        self.controls.probability = probability * 100.0;
    }

    /// Set the amount of randomness (0.0 - 1.0) that is applied to the grain size.
    pub fn set_grain_size_randomness(&mut self, randomness: f32) {
        self.controls.grain_size_randomness = randomness;
    }

    /// Set the amount of randomness (0.0 - 1.0) that is applied to the file position.
    pub fn set_file_position_randomness(&mut self, randomness: f32) {
        self.controls.file_position_randomness = randomness;
    }

    /// Apply a whole block of user parameters.
    pub fn apply_parameters(&mut self, parameters: &GranularParameters) {
        self.set_grain_size_ms(parameters.grain_size_ms);
        self.set_file_position_ms(parameters.file_position_ms);
        self.set_playback_speed(parameters.playback_speed);
        self.set_probability(parameters.probability);
        self.set_grain_size_randomness(parameters.grain_size_randomness);
        self.set_file_position_randomness(parameters.file_position_randomness);
    }

    /// Mute or unmute a grain until its current cycle ends.
    ///
    /// The pool stores a play probability, but does not apply it on its own: probability
    /// based gating should be done here, e.g. by a host which draws against
    /// [`GrainControls::probability`].
    pub fn set_grain_muted(&mut self, index: usize, muted: bool) -> Result<(), Error> {
        let grain_muted = self
            .muted
            .get_mut(index)
            .ok_or(Error::GrainIndexError(index))?;
        *grain_muted = muted;
        Ok(())
    }

    /// Re-trigger a single grain with the current global parameters.
    pub fn update_grain(&mut self, index: usize) -> Result<(), Error> {
        if index >= self.grain_count() {
            return Err(Error::GrainIndexError(index));
        }
        self.retrigger(index);
        Ok(())
    }

    /// Re-trigger all grains with the current global parameters, in grain index order.
    pub fn update_all_grains(&mut self) {
        for index in 0..self.grain_count() {
            self.retrigger(index);
        }
    }

    /// Reset all grains to their initial, inert state. Global parameters are kept.
    pub fn reset(&mut self) {
        self.pointers.fill(0.0);
        self.file_positions.fill(0.0);
        self.grain_sizes.fill(0.0);
        self.muted.fill(false);
    }

    /// Process the next audio frame, summed over all grains.
    pub fn process(&mut self) -> f32 {
        let mut output = 0.0;
        for index in 0..self.grain_count() {
            output += self.process_grain(index);
        }
        output
    }

    /// Process the next audio frame of the grain at the given index.
    ///
    /// Returns 0 for muted grains, grains with read positions outside of the sample buffer and
    /// invalid grain indices. Forward playing grains which read past the buffer restart their
    /// current cycle, reverse playing grains keep moving until they are back in the buffer.
    pub fn process_grain(&mut self, index: usize) -> f32 {
        let grain_count = self.grain_count();
        if index >= grain_count {
            return 0.0;
        }
        assume!(unsafe: self.file_positions.len() == grain_count, "Grain slices share a length");
        assume!(unsafe: self.grain_sizes.len() == grain_count);
        assume!(unsafe: self.muted.len() == grain_count);

        let pointer = self.pointers[index];

        let mut output = 0.0;
        if !self.muted[index] {
            let position = pointer + self.file_positions[index];
            let frame = position.floor();
            if !(frame >= 0.0 && (frame as usize) < self.sample_buffer.len()) {
                if frame >= 0.0 && self.controls.playback_speed < 0.0 {
                    // reverse grains walk back into the buffer
                    self.advance(index, pointer);
                } else {
                    // stop at buffer boundaries: restart the pointer within the current cycle
                    self.pointers[index] = 0.0;
                }
                return 0.0;
            }
            let [f0, f1, f2, f3] = neighbour_samples(&self.sample_buffer, frame as usize);
            let sample = interpolate_cubic(f0, f1, f2, f3, position - frame);

            let gain = apply_window(self.window, pointer, self.grain_sizes[index]);
            output = sample * gain * GRAIN_OUTPUT_GAIN;
        }

        self.advance(index, pointer);
        output
    }

    /// Move the grain's read pointer and re-trigger the grain when its cycle ended.
    #[inline]
    fn advance(&mut self, index: usize, pointer: f32) {
        let pointer = pointer + self.controls.playback_speed;
        if pointer > self.grain_sizes[index] {
            self.pointers[index] = 0.0;
            self.retrigger(index);
        } else if pointer < 0.0 {
            // reverse playback: restart at the end of the new cycle
            self.retrigger(index);
            self.pointers[index] = self.grain_sizes[index];
        } else {
            self.pointers[index] = pointer;
        }
    }

    /// Apply global parameters to the grain. Size and position share a single random draw.
    #[inline]
    fn retrigger(&mut self, index: usize) {
        let random = self.rng.random_range(0..100u32) as f32 / 100.0;

        let controls = &self.controls;
        self.grain_sizes[index] =
            controls.grain_size - random * controls.grain_size_randomness * controls.grain_size;
        self.file_positions[index] = controls.file_position
            + random * controls.file_position_randomness * controls.file_position;
        self.muted[index] = false;
    }

    #[inline]
    fn ms_to_samples(&self, ms: f32) -> f32 {
        ms * self.sample_rate as f32 / 1000.0
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 1000; // 1 ms == 1 sample

    fn ramp_buffer() -> Arc<[f32]> {
        Arc::from([0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0])
    }

    fn pool(grain_count: usize) -> GrainPool {
        GrainPool::new(
            ramp_buffer(),
            SAMPLE_RATE,
            GranularOptions::new().grain_count(grain_count).seed(0x5eed),
        )
        .unwrap()
    }

    #[test]
    fn setup() {
        for grain_count in [1, 2, 8, GranularOptions::MAX_GRAIN_COUNT] {
            let pool = pool(grain_count);
            assert_eq!(pool.grain_count(), grain_count);
            assert_eq!(pool.sample_rate(), SAMPLE_RATE);
            assert_eq!(pool.window(), GrainWindowMode::HalfSine);
            for index in 0..grain_count {
                assert_eq!(pool.grain(index), Some(GrainState::default()));
            }
            assert_eq!(pool.grain(grain_count), None);
        }
    }

    #[test]
    fn setup_from_file() {
        let path = std::env::temp_dir().join(format!(
            "granulator-pool-{}.wav",
            std::process::id()
        ));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for frame in 0..64 {
            writer.write_sample(frame as f32 / 64.0).unwrap();
            writer.write_sample(frame as f32 / 128.0).unwrap();
        }
        writer.finalize().unwrap();

        let options = GranularOptions::new().grain_count(4).seed(1);
        let pool = GrainPool::from_file(&path, 44100, options).unwrap();
        assert_eq!(pool.grain_count(), 4);
        assert_eq!(pool.sample_rate(), 44100);
        assert_eq!(pool.sample_buffer().len(), 64);
        // downmixed to mono
        assert!((pool.sample_buffer()[32] - 0.375).abs() < 1e-6);

        // mismatching sample rates only warn
        let pool = GrainPool::from_file(&path, 48000, options).unwrap();
        assert_eq!(pool.sample_rate(), 48000);
        assert_eq!(pool.sample_buffer().len(), 64);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn setup_failures() {
        let options = GranularOptions::default();
        assert!(matches!(
            GrainPool::new(Vec::<f32>::new(), SAMPLE_RATE, options),
            Err(Error::ParameterError(_))
        ));
        assert!(matches!(
            GrainPool::new(ramp_buffer(), 0, options),
            Err(Error::ParameterError(_))
        ));
        assert!(matches!(
            GrainPool::new(ramp_buffer(), SAMPLE_RATE, options.grain_count(0)),
            Err(Error::ParameterError(_))
        ));
        assert!(matches!(
            GrainPool::from_file("./does/not/exist.wav", SAMPLE_RATE, options),
            Err(Error::SampleLoadError { .. })
        ));
    }

    #[test]
    fn empty_pool() {
        let mut pool = GrainPool::allocate(
            0,
            SAMPLE_RATE,
            GrainWindowMode::HalfSine,
            ramp_buffer(),
            SmallRng::seed_from_u64(0),
        );
        pool.set_grain_size_ms(4.0);
        pool.update_all_grains();
        for _ in 0..16 {
            assert_eq!(pool.process(), 0.0);
        }
        assert_eq!(pool.process_grain(0), 0.0);
        assert!(pool.update_grain(0).is_err());
    }

    #[test]
    fn end_to_end() {
        let mut pool = pool(1);
        pool.apply_parameters(&GranularParameters {
            grain_size_ms: 7.0,
            file_position_ms: 0.0,
            playback_speed: 1.0,
            probability: 1.0,
            grain_size_randomness: 0.0,
            file_position_randomness: 0.0,
        });

        // inert grain: emits silence and gets re-triggered after the first frame
        assert_eq!(pool.process(), 0.0);
        assert_eq!(
            pool.grain(0),
            Some(GrainState {
                pointer: 0.0,
                file_position: 0.0,
                grain_size: 7.0,
                muted: false
            })
        );

        for _cycle in 0..3 {
            for step in 0..8 {
                let expected = step as f32
                    * (std::f32::consts::PI * step as f32 / 7.0).sin()
                    * GRAIN_OUTPUT_GAIN;
                let expected = if step == 7 { 0.0 } else { expected };
                let output = pool.process();
                assert!(
                    (output - expected).abs() < 1e-5,
                    "step {step}: {output} != {expected}"
                );
            }
            // cycle ended: pointer got reset
            assert_eq!(pool.grain(0).unwrap().pointer, 0.0);
        }
    }

    #[test]
    fn fractional_playback() {
        let mut pool = pool(1);
        pool.set_grain_size_ms(7.0);
        pool.set_playback_speed(0.5);
        pool.update_all_grains();

        for step in 0..=14 {
            let pointer = step as f32 * 0.5;
            assert_eq!(pool.grain(0).unwrap().pointer, pointer);
            let output = pool.process();
            // buffer is a linear ramp: inner positions interpolate to their position
            if (1.0..=5.5).contains(&pointer) {
                let expected =
                    pointer * (std::f32::consts::PI * pointer / 7.0).sin() * GRAIN_OUTPUT_GAIN;
                assert!((output - expected).abs() < 1e-5);
            }
        }
        assert_eq!(pool.grain(0).unwrap().pointer, 0.0);
    }

    #[test]
    fn reverse_playback() {
        let mut pool = pool(1);
        pool.set_grain_size_ms(4.0);
        pool.set_file_position_ms(2.0);
        pool.set_playback_speed(-1.0);

        // inert grain gets re-triggered at its end
        assert_eq!(pool.process(), 0.0);
        assert_eq!(pool.grain(0).unwrap().pointer, 4.0);

        let mut outputs = Vec::new();
        for expected_pointer in [4.0, 3.0, 2.0, 1.0, 0.0] {
            assert_eq!(pool.grain(0).unwrap().pointer, expected_pointer);
            outputs.push(pool.process());
        }
        assert_eq!(pool.grain(0).unwrap().pointer, 4.0);
        // pointer 2 reads sample 4 with full gain
        assert!((outputs[2] - 4.0 * GRAIN_OUTPUT_GAIN).abs() < 1e-5);
        assert_eq!(outputs[0], 0.0);
        assert_eq!(outputs[4], 0.0);
    }

    #[test]
    fn reverse_playback_past_buffer_end() {
        let mut pool = pool(1);
        pool.set_grain_size_ms(6.0);
        pool.set_file_position_ms(4.0);
        pool.set_playback_speed(-1.0);

        assert_eq!(pool.process(), 0.0);
        assert_eq!(pool.grain(0).unwrap().pointer, 6.0);

        // cycle starts past the end of the buffer
        for expected_pointer in [5.0, 4.0, 3.0] {
            assert_eq!(pool.process(), 0.0);
            assert_eq!(pool.grain(0).unwrap().pointer, expected_pointer);
            assert_eq!(pool.grain(0).unwrap().file_position, 4.0);
        }
        // pointer 3 reads the last sample with full gain
        assert!((pool.process() - 7.0 * GRAIN_OUTPUT_GAIN).abs() < 1e-5);
        assert_eq!(pool.grain(0).unwrap().pointer, 2.0);

        // keeps playing the part within the buffer in all following cycles
        let mut forward = self::pool(1);
        forward.set_grain_size_ms(6.0);
        forward.set_file_position_ms(4.0);
        let reverse_count = (0..60).filter(|_| pool.process() != 0.0).count();
        let forward_count = (0..60).filter(|_| forward.process() != 0.0).count();
        assert!(reverse_count > 0);
        assert!(forward_count > 0);
    }

    #[test]
    fn out_of_range_read_position() {
        let mut pool = pool(1);
        pool.set_grain_size_ms(10.0);
        pool.set_file_position_ms(100.0);
        pool.set_playback_speed(1.0);
        pool.update_all_grains();
        assert_eq!(pool.grain(0).unwrap().file_position, 100.0);

        for _ in 0..4 {
            assert_eq!(pool.process_grain(0), 0.0);
            assert_eq!(pool.grain(0).unwrap().pointer, 0.0);
        }
        // boundary stops are no re-triggers
        assert_eq!(pool.grain(0).unwrap().file_position, 100.0);

        // grain reads past the end of the buffer mid cycle
        pool.set_file_position_ms(4.0);
        pool.update_all_grains();
        for expected_pointer in [0.0, 1.0, 2.0, 3.0] {
            assert_eq!(pool.grain(0).unwrap().pointer, expected_pointer);
            pool.process_grain(0);
        }
        assert_eq!(pool.grain(0).unwrap().pointer, 4.0);
        assert_eq!(pool.process_grain(0), 0.0);
        assert_eq!(pool.grain(0).unwrap().pointer, 0.0);
    }

    #[test]
    fn degenerate_grain_size() {
        let mut pool = pool(4);
        pool.set_grain_size_ms(0.5);
        pool.set_file_position_ms(2.0);
        pool.set_playback_speed(0.25);
        pool.update_all_grains();
        for _ in 0..32 {
            assert_eq!(pool.process(), 0.0);
        }
    }

    #[test]
    fn retrigger_without_randomness() {
        let mut pool = pool(8);
        pool.set_grain_size_ms(123.0);
        pool.set_file_position_ms(456.0);
        pool.set_grain_size_randomness(0.0);
        pool.set_file_position_randomness(0.0);
        pool.update_all_grains();
        for index in 0..pool.grain_count() {
            let grain = pool.grain(index).unwrap();
            assert_eq!(grain.grain_size, pool.controls().grain_size);
            assert_eq!(grain.file_position, pool.controls().file_position);
            assert_eq!(grain.grain_size, 123.0);
            assert_eq!(grain.file_position, 456.0);
        }
    }

    #[test]
    fn retrigger_with_randomness() {
        let rng = SmallRng::seed_from_u64(1234);
        let mut expected_rng = rng.clone();
        let mut pool =
            GrainPool::with_rng(ramp_buffer(), SAMPLE_RATE, GranularOptions::default(), rng)
                .unwrap();
        pool.set_grain_size_ms(200.0);
        pool.set_file_position_ms(100.0);
        pool.set_grain_size_randomness(0.5);
        pool.set_file_position_randomness(1.0);
        pool.update_all_grains();

        for index in 0..pool.grain_count() {
            let random = expected_rng.random_range(0..100u32) as f32 / 100.0;
            let grain = pool.grain(index).unwrap();
            // size shrinks and position advances with the same draw
            assert_eq!(grain.grain_size, 200.0 - random * 0.5 * 200.0);
            assert_eq!(grain.file_position, 100.0 + random * 1.0 * 100.0);
            assert!(grain.grain_size > 100.0 && grain.grain_size <= 200.0);
            assert!(grain.file_position >= 100.0 && grain.file_position < 200.0);
        }
    }

    #[test]
    fn seeded_pools_are_deterministic() {
        let run = || {
            let mut pool = GrainPool::new(
                (0..4096).map(|i| (i as f32 * 0.05).sin()).collect::<Vec<_>>(),
                44100,
                GranularOptions::new().grain_count(8).seed(42),
            )
            .unwrap();
            pool.apply_parameters(&GranularParameters {
                grain_size_ms: 20.0,
                file_position_ms: 10.0,
                ..Default::default()
            });
            (0..10000).map(|_| pool.process()).collect::<Vec<_>>()
        };
        let output = run();
        assert_eq!(output, run());
        assert!(output.iter().any(|v| *v != 0.0));
        assert!(output.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn parameters_apply_on_retrigger() {
        let mut pool = pool(1);
        pool.set_grain_size_ms(6.0);
        pool.update_all_grains();
        pool.process();
        pool.process();
        assert_eq!(pool.grain(0).unwrap().pointer, 2.0);

        // mid cycle: size and position stay, speed applies immediately
        pool.set_grain_size_ms(3.0);
        pool.set_file_position_ms(1.0);
        pool.set_playback_speed(2.0);
        pool.process();
        let grain = pool.grain(0).unwrap();
        assert_eq!(grain.pointer, 4.0);
        assert_eq!(grain.grain_size, 6.0);
        assert_eq!(grain.file_position, 0.0);

        pool.process(); // 6.0
        pool.process(); // 8.0 > 6.0: re-triggered
        let grain = pool.grain(0).unwrap();
        assert_eq!(grain.pointer, 0.0);
        assert_eq!(grain.grain_size, 3.0);
        assert_eq!(grain.file_position, 1.0);
    }

    #[test]
    fn muted_grains() {
        let mut pool = pool(1);
        pool.set_grain_size_ms(4.0);
        pool.set_file_position_ms(2.0);
        pool.set_probability(0.25);
        assert_eq!(pool.controls().probability, 25.0);
        pool.update_all_grains();

        pool.set_grain_muted(0, true).unwrap();
        for expected_pointer in [1.0, 2.0, 3.0, 4.0] {
            assert_eq!(pool.process(), 0.0);
            assert_eq!(pool.grain(0).unwrap().pointer, expected_pointer);
        }
        assert!(pool.grain(0).unwrap().muted);
        // muting ends with the cycle
        pool.process();
        assert!(!pool.grain(0).unwrap().muted);
        pool.process();
        assert!(pool.process() != 0.0);

        assert!(matches!(
            pool.set_grain_muted(1, true),
            Err(Error::GrainIndexError(1))
        ));
    }

    #[test]
    fn reset() {
        let mut pool = pool(4);
        pool.set_grain_size_ms(5.0);
        pool.set_file_position_ms(1.0);
        pool.update_all_grains();
        pool.process();
        pool.reset();
        for index in 0..pool.grain_count() {
            assert_eq!(pool.grain(index), Some(GrainState::default()));
        }
        assert_eq!(pool.controls().grain_size, 5.0);
    }

    #[test]
    fn window_modes() {
        let mut pool = GrainPool::new(
            ramp_buffer(),
            SAMPLE_RATE,
            GranularOptions::new()
                .grain_count(1)
                .window(GrainWindowMode::RampDown),
        )
        .unwrap();
        pool.set_grain_size_ms(4.0);
        pool.set_file_position_ms(2.0);
        pool.update_all_grains();
        // full gain at the cycle start
        assert!((pool.process() - 2.0 * GRAIN_OUTPUT_GAIN).abs() < 1e-5);
        assert!((pool.process() - 3.0 * 0.75 * GRAIN_OUTPUT_GAIN).abs() < 1e-5);
    }
}
