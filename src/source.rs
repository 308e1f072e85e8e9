pub mod empty;
pub mod granular;

// -------------------------------------------------------------------------------------------------

/// Types that can produce audio samples in `f32` format. `Send`able across threads.
pub trait Source: Send + 'static {
    /// Write at most of `output.len()` interleaved samples into the `output`. Returns the
    /// number of written samples. Should take care to always output full frames, and
    /// should _never_ block or allocate.
    fn write(&mut self, output: &mut [f32]) -> usize;
    /// Channel layout of the written interleaved samples.
    fn channel_count(&self) -> usize;
    /// Sample rate of the written samples.
    fn sample_rate(&self) -> u32;
    /// Returns true when the source no longer produces any samples.
    fn is_exhausted(&self) -> bool {
        false
    }
}
