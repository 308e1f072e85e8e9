#[cfg(feature = "cpal-output")]
pub mod cpal;
#[cfg(feature = "wav-output")]
pub mod wav;

use crate::source::Source;

// -------------------------------------------------------------------------------------------------

/// The default real-time audio output type.
#[cfg(feature = "cpal-output")]
pub type DefaultOutputDevice = cpal::CpalOutput;

/// Available audio hosts for cpal output (platform specific)
#[cfg(feature = "cpal-output")]
pub enum AudioHostId {
    Default, // system default
    #[cfg(target_os = "windows")]
    Wasapi,
    #[cfg(target_os = "linux")]
    Alsa,
}

// -------------------------------------------------------------------------------------------------

/// Audio output device, which pulls samples from a single [`Source`].
pub trait OutputDevice {
    /// Actual device's output sample buffer channel count.
    fn channel_count(&self) -> usize;
    /// Actual device's output sample rate.
    fn sample_rate(&self) -> u32;
    /// Actual device's output playhead position in **samples** (NOT frames).
    fn sample_position(&self) -> u64;

    /// Get actual output volume.
    fn volume(&self) -> f32;
    /// Set a new output volume.
    fn set_volume(&mut self, volume: f32);

    /// true when the device is running, pulling samples from its source.
    fn is_running(&self) -> bool;

    /// Play given source as main output source. The source's channel layout and sample
    /// rate must match the device's one.
    fn play(&mut self, source: Box<dyn Source>);
    /// Drop actual source, replacing it with silence
    fn stop(&mut self);
    /// Pause playback without dropping the output source.
    fn pause(&mut self);
    /// Resume from paused playback.
    fn resume(&mut self);

    /// Release audio device
    fn close(&mut self);
}
