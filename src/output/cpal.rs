use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

#[cfg(feature = "assert-allocs")]
use assert_no_alloc::*;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    StreamConfig,
};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::{
    error::Error,
    output::{AudioHostId, OutputDevice},
    source::{empty::EmptySource, Source},
    utils::buffer::{clear_buffer, scale_buffer},
};

// -------------------------------------------------------------------------------------------------

const PREFERRED_SAMPLE_FORMAT: cpal::SampleFormat = cpal::SampleFormat::F32;
const PREFERRED_SAMPLE_RATE: cpal::SampleRate = cpal::SampleRate(44100);
const PREFERRED_CHANNELS: cpal::ChannelCount = 2;
const PREFERRED_BUFFER_SIZE: cpal::BufferSize = if cfg!(debug_assertions) {
    cpal::BufferSize::Default
} else {
    cpal::BufferSize::Fixed(512)
};

// -------------------------------------------------------------------------------------------------

/// Real-time audio output, using the system's default audio device via cpal.
///
/// The device's callback calls the played [`Source`] once per audio block. Sources and
/// volume changes are passed to the callback via a bounded channel, so the callback never
/// locks.
pub struct CpalOutput {
    stream: cpal::Stream,
    channel_count: cpal::ChannelCount,
    sample_rate: cpal::SampleRate,
    volume: f32,
    is_running: Arc<AtomicBool>,
    playback_pos: Arc<AtomicU64>,
    callback_send: Sender<CallbackMsg>,
}

impl CpalOutput {
    pub fn open() -> Result<Self, Error> {
        Self::open_with_host(AudioHostId::Default)
    }

    pub fn open_with_host(hostid: AudioHostId) -> Result<Self, Error> {
        let host = match hostid {
            AudioHostId::Default => cpal::default_host(),
            #[cfg(target_os = "windows")]
            AudioHostId::Wasapi => cpal::host_from_id(cpal::HostId::Wasapi)
                .map_err(|err| Error::OutputDeviceError(Box::new(err)))?,
            #[cfg(target_os = "linux")]
            AudioHostId::Alsa => cpal::host_from_id(cpal::HostId::Alsa)
                .map_err(|err| Error::OutputDeviceError(Box::new(err)))?,
        };

        // Open the default output device.
        let device = host
            .default_output_device()
            .ok_or(cpal::DefaultStreamConfigError::DeviceNotAvailable)?;

        if let Ok(name) = device.name() {
            log::info!("using audio device: {}", name);
        }

        // Get the default device config, so we know what sample format and sample rate
        // the device supports.
        let supported = Self::preferred_output_config(&device)?;
        let config = StreamConfig {
            buffer_size: PREFERRED_BUFFER_SIZE,
            ..supported.config()
        };

        // Shared playback state
        let is_running = Arc::new(AtomicBool::new(true));
        let playback_pos = Arc::new(AtomicU64::new(0));

        let (callback_send, callback_recv) = bounded(16);
        let mut callback = StreamCallback {
            callback_recv,
            source: Box::new(EmptySource),
            volume: 1.0,
            is_running: Arc::clone(&is_running),
            playback_pos: Arc::clone(&playback_pos),
        };

        log::info!("opening output stream: {:?}", config);
        let stream = device.build_output_stream(
            &config,
            move |output: &mut [f32], _: &cpal::OutputCallbackInfo| {
                callback.write_samples(output);
            },
            |err| {
                log::error!("audio output error: {}", err);
            },
            None,
        )?;
        stream.play()?;

        Ok(Self {
            stream,
            channel_count: supported.channels(),
            sample_rate: supported.sample_rate(),
            volume: 1.0,
            is_running,
            playback_pos,
            callback_send,
        })
    }

    fn preferred_output_config(
        device: &cpal::Device,
    ) -> Result<cpal::SupportedStreamConfig, Error> {
        for s in device.supported_output_configs()? {
            let rates = s.min_sample_rate()..=s.max_sample_rate();
            if s.channels() == PREFERRED_CHANNELS
                && s.sample_format() == PREFERRED_SAMPLE_FORMAT
                && rates.contains(&PREFERRED_SAMPLE_RATE)
            {
                return Ok(s.with_sample_rate(PREFERRED_SAMPLE_RATE));
            }
        }

        Ok(device.default_output_config()?)
    }

    fn send_to_callback(&self, msg: CallbackMsg) {
        if self.callback_send.send(msg).is_err() {
            log::error!("output stream callback is dead");
        }
    }
}

impl OutputDevice for CpalOutput {
    fn channel_count(&self) -> usize {
        self.channel_count as usize
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate.0
    }

    fn sample_position(&self) -> u64 {
        self.playback_pos.load(Ordering::Relaxed)
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.send_to_callback(CallbackMsg::SetVolume(volume));
    }

    fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    fn play(&mut self, source: Box<dyn Source>) {
        // ensure source has our sample rate and channel layout
        assert_eq!(source.channel_count(), self.channel_count());
        assert_eq!(source.sample_rate(), self.sample_rate());
        // send message to activate it in the writer
        self.send_to_callback(CallbackMsg::PlaySource(source));
    }

    fn stop(&mut self) {
        self.send_to_callback(CallbackMsg::PlaySource(Box::new(EmptySource)));
    }

    fn pause(&mut self) {
        log::debug!("pausing audio output stream");
        if let Err(err) = self.stream.pause() {
            log::error!("failed to stop stream: {}", err);
        }
        self.is_running.store(false, Ordering::Relaxed);
    }

    fn resume(&mut self) {
        log::debug!("resuming audio output stream");
        if let Err(err) = self.stream.play() {
            log::error!("failed to start stream: {}", err);
        }
        self.is_running.store(true, Ordering::Relaxed);
    }

    fn close(&mut self) {
        log::debug!("closing audio output stream");
        self.stop();
        self.pause();
    }
}

// -------------------------------------------------------------------------------------------------

enum CallbackMsg {
    PlaySource(Box<dyn Source>),
    SetVolume(f32),
}

struct StreamCallback {
    callback_recv: Receiver<CallbackMsg>,
    source: Box<dyn Source>,
    volume: f32,
    is_running: Arc<AtomicBool>,
    playback_pos: Arc<AtomicU64>,
}

impl StreamCallback {
    fn write_samples(&mut self, output: &mut [f32]) {
        // Process any pending data messages.
        while let Ok(msg) = self.callback_recv.try_recv() {
            match msg {
                CallbackMsg::PlaySource(src) => {
                    // NB: dropping the old source deallocates in the audio thread
                    self.source = src;
                }
                CallbackMsg::SetVolume(volume) => {
                    self.volume = volume;
                }
            }
        }

        let written = if self.is_running.load(Ordering::Relaxed) {
            // Write out as many samples as possible from the audio source to the output buffer.
            #[cfg(not(feature = "assert-allocs"))]
            let written = self.source.write(output);
            #[cfg(feature = "assert-allocs")]
            let written = assert_no_alloc(|| self.source.write(output));

            // Apply the global volume level.
            scale_buffer(&mut output[..written], self.volume);

            // Advance playback pos
            self.playback_pos
                .fetch_add(output.len() as u64, Ordering::Relaxed);

            written
        } else {
            0
        };

        // Mute any remaining samples.
        clear_buffer(&mut output[written..]);
    }
}

// -------------------------------------------------------------------------------------------------

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(err: cpal::DefaultStreamConfigError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::SupportedStreamConfigsError> for Error {
    fn from(err: cpal::SupportedStreamConfigsError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(err: cpal::BuildStreamError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::PlayStreamError> for Error {
    fn from(err: cpal::PlayStreamError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}
