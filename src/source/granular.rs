use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use rand::{rngs::SmallRng, Rng};

use crate::{
    granular::{GrainPool, GranularParameters},
    source::Source,
    utils::buffer::fan_out_frame,
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Control messages, sent from a [`GranularHandle`] to its [`GranularSource`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GranularMessage {
    SetGrainSize(f32),
    SetFilePosition(f32),
    SetPlaybackSpeed(f32),
    SetProbability(f32),
    SetGrainSizeRandomness(f32),
    SetFilePositionRandomness(f32),
    SetParameters(GranularParameters),
    SetGrainMuted { index: usize, muted: bool },
    RetriggerAll,
    Reset,
}

// -------------------------------------------------------------------------------------------------

/// Change parameters of a [`GranularSource`] from any thread.
///
/// Messages are queued in a bounded lock free queue and get applied by the source in the
/// audio thread, before the next block of frames gets synthesized. When the queue is full,
/// the oldest pending message gets dropped.
///
/// Handles are `Send` and `Sync` so they can be sent across threads.
#[derive(Clone)]
pub struct GranularHandle {
    message_queue: Arc<ArrayQueue<GranularMessage>>,
    grain_count: usize,
}

impl GranularHandle {
    /// Set grain size in milliseconds.
    pub fn set_grain_size_ms(&self, grain_size: f32) {
        self.send(GranularMessage::SetGrainSize(grain_size));
    }

    /// Set file position in milliseconds.
    pub fn set_file_position_ms(&self, file_position: f32) {
        self.send(GranularMessage::SetFilePosition(file_position));
    }

    /// Set the amount of samples the grain's read pointers advance each frame.
    pub fn set_playback_speed(&self, playback_speed: f32) {
        self.send(GranularMessage::SetPlaybackSpeed(playback_speed));
    }

    /// Set the probability (0.0 - 1.0) that a grain will be played.
    pub fn set_probability(&self, probability: f32) {
        self.send(GranularMessage::SetProbability(probability));
    }

    /// Set the amount of randomness (0.0 - 1.0) that is applied to the grain size.
    pub fn set_grain_size_randomness(&self, randomness: f32) {
        self.send(GranularMessage::SetGrainSizeRandomness(randomness));
    }

    /// Set the amount of randomness (0.0 - 1.0) that is applied to the file position.
    pub fn set_file_position_randomness(&self, randomness: f32) {
        self.send(GranularMessage::SetFilePositionRandomness(randomness));
    }

    /// Validate and apply a whole block of parameters at once.
    pub fn set_parameters(&self, parameters: GranularParameters) -> Result<(), Error> {
        parameters.validate()?;
        self.send(GranularMessage::SetParameters(parameters));
        Ok(())
    }

    /// Mute or unmute a single grain until its current cycle ends.
    pub fn set_grain_muted(&self, index: usize, muted: bool) -> Result<(), Error> {
        if index >= self.grain_count {
            return Err(Error::GrainIndexError(index));
        }
        self.send(GranularMessage::SetGrainMuted { index, muted });
        Ok(())
    }

    /// Re-trigger all grains with the current parameters.
    pub fn retrigger_all(&self) {
        self.send(GranularMessage::RetriggerAll);
    }

    /// Reset all grains to their initial state.
    pub fn reset(&self) {
        self.send(GranularMessage::Reset);
    }

    fn send(&self, message: GranularMessage) {
        if let Some(dropped) = self.message_queue.force_push(message) {
            log::warn!("Granular message queue is full. Dropped message: {dropped:?}");
            log::warn!("Increase the granular message queue size to prevent this from happening...");
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A [`Source`] which plays a [`GrainPool`], writing its single channel output into all
/// channels of the output frames.
pub struct GranularSource<R: Rng = SmallRng> {
    pool: GrainPool<R>,
    channel_count: usize,
    message_queue: Arc<ArrayQueue<GranularMessage>>,
}

impl<R: Rng> GranularSource<R> {
    /// Size of the message queue of [`GranularHandle`]s.
    pub const MESSAGE_QUEUE_SIZE: usize = 256;

    /// Create a new granular source, playing the given pool with the given output channel
    /// layout. The pool's sample rate is the source's sample rate.
    pub fn new(pool: GrainPool<R>, channel_count: usize) -> Result<Self, Error> {
        if channel_count == 0 {
            return Err(Error::ParameterError(
                "Channel count must be greater than 0".to_string(),
            ));
        }
        let message_queue = Arc::new(ArrayQueue::new(Self::MESSAGE_QUEUE_SIZE));
        Ok(Self {
            pool,
            channel_count,
            message_queue,
        })
    }

    /// Create a new handle to control the source from other threads.
    pub fn handle(&self) -> GranularHandle {
        GranularHandle {
            message_queue: Arc::clone(&self.message_queue),
            grain_count: self.pool.grain_count(),
        }
    }

    /// Access to the played grain pool.
    pub fn pool(&self) -> &GrainPool<R> {
        &self.pool
    }

    /// Mutable access to the played grain pool.
    pub fn pool_mut(&mut self) -> &mut GrainPool<R> {
        &mut self.pool
    }

    /// Apply all pending handle messages to the pool.
    pub fn process_messages(&mut self) {
        while let Some(message) = self.message_queue.pop() {
            match message {
                GranularMessage::SetGrainSize(value) => self.pool.set_grain_size_ms(value),
                GranularMessage::SetFilePosition(value) => self.pool.set_file_position_ms(value),
                GranularMessage::SetPlaybackSpeed(value) => self.pool.set_playback_speed(value),
                GranularMessage::SetProbability(value) => self.pool.set_probability(value),
                GranularMessage::SetGrainSizeRandomness(value) => {
                    self.pool.set_grain_size_randomness(value)
                }
                GranularMessage::SetFilePositionRandomness(value) => {
                    self.pool.set_file_position_randomness(value)
                }
                GranularMessage::SetParameters(parameters) => {
                    self.pool.apply_parameters(&parameters)
                }
                GranularMessage::SetGrainMuted { index, muted } => {
                    // indices are validated by the handle
                    let _ = self.pool.set_grain_muted(index, muted);
                }
                GranularMessage::RetriggerAll => self.pool.update_all_grains(),
                GranularMessage::Reset => self.pool.reset(),
            }
        }
    }
}

impl<R: Rng + Send + 'static> Source for GranularSource<R> {
    fn write(&mut self, output: &mut [f32]) -> usize {
        // Apply parameter changes between frames only
        self.process_messages();

        let mut written = 0;
        for frame in output.chunks_exact_mut(self.channel_count) {
            fan_out_frame(frame, self.pool.process());
            written += frame.len();
        }
        written
    }

    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn sample_rate(&self) -> u32 {
        self.pool.sample_rate()
    }
}

// -------------------------------------------------------------------------------------------------
