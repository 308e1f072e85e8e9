use std::{fs::File, io, path::Path, sync::Arc};

use symphonia::core::{
    audio::{SampleBuffer, SignalSpec},
    codecs::{CodecParameters, Decoder, DecoderOptions},
    conv::ConvertibleSample,
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
    units::TimeStamp,
};

use crate::error::Error;

// -------------------------------------------------------------------------------------------------

/// Decodes audio files of all formats symphonia got configured for into interleaved samples.
pub struct AudioDecoder {
    track_id: u32, // Internal track index.
    decoder: Box<dyn Decoder>,
    format: Box<dyn FormatReader>,
    signal_spec: Option<SignalSpec>,
}

impl AudioDecoder {
    /// Create a new decoder from the given file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = Box::new(File::open(path.as_ref())?);
        let source_stream = MediaSourceStream::new(file, Default::default());
        Self::from_source_stream(source_stream)
    }

    /// Create a new decoder from the given Symphonia MediaSourceStream
    pub fn from_source_stream(source_stream: MediaSourceStream) -> Result<Self, Error> {
        // Unused hint to help the format registry guess what format reader is appropriate.
        let hint = Hint::new();

        // Use the default options when reading and decoding.
        let format_opts: FormatOptions = Default::default();
        let metadata_opts: MetadataOptions = Default::default();
        let decoder_opts: DecoderOptions = Default::default();

        // Probe the media source stream for a format.
        let probed = symphonia::default::get_probe()
            .format(&hint, source_stream, &format_opts, &metadata_opts)
            .map_err(|err| Error::AudioDecodingError(Box::new(err)))?;

        // Get the format reader yielded by the probe operation.
        let format = probed.format;

        // Get the default track.
        let track = format.default_track().ok_or_else(|| {
            Error::AudioDecodingError(Box::new(SymphoniaError::Unsupported(
                "no default audio track",
            )))
        })?;
        let track_id = track.id;

        // Create a decoder for the track.
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &decoder_opts)
            .map_err(|err| Error::AudioDecodingError(Box::new(err)))?;

        // Signal spec may only be known after decoding the first packet.
        let signal_spec = match (track.codec_params.sample_rate, track.codec_params.channels) {
            (Some(rate), Some(channels)) => Some(SignalSpec { rate, channels }),
            _ => None,
        };

        Ok(Self {
            track_id,
            decoder,
            format,
            signal_spec,
        })
    }

    pub fn codec_params(&self) -> &CodecParameters {
        self.decoder.codec_params()
    }

    /// Signal spec of the decoded track, if known.
    pub fn signal_spec(&self) -> Option<SignalSpec> {
        self.signal_spec
    }

    /// Read a next packet of audio from this decoder. Returns `None` in case
    /// of EOF or internal error.
    ///
    /// The given sample buffer gets (re)allocated when it's missing or too small to hold
    /// the decoded packet.
    pub fn read_packet<S>(&mut self, samples: &mut Option<SampleBuffer<S>>) -> Option<TimeStamp>
    where
        S: ConvertibleSample,
    {
        loop {
            // Demux an encoded packet from the media format.
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(io)) if io.kind() == io::ErrorKind::UnexpectedEof => {
                    return None; // End of this stream.
                }
                Err(err) => {
                    log::error!("format error: {err}");
                    return None; // We cannot recover from format errors, quit.
                }
            };
            while !self.format.metadata().is_latest() {
                // Consume any new metadata that has been read since the last packet.
                self.format.metadata().pop();
            }
            // If the packet does not belong to the selected track, skip over it.
            if packet.track_id() != self.track_id {
                continue;
            }
            // Decode the packet into an audio buffer.
            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let required_samples = decoded.capacity() * spec.channels.count();
                    if samples
                        .as_ref()
                        .is_none_or(|buffer| buffer.capacity() < required_samples)
                    {
                        *samples = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }
                    if let Some(samples) = samples.as_mut() {
                        // Interleave the samples into the buffer.
                        samples.copy_interleaved_ref(decoded);
                    }
                    self.signal_spec = Some(spec);
                    return Some(packet.ts());
                }
                Err(SymphoniaError::IoError(err)) => {
                    // The packet failed to decode due to an IO error, skip the packet.
                    log::error!("io decode error: {err}");
                    continue;
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    // The packet failed to decode due to invalid data, skip the packet.
                    log::error!("decode error: {err}");
                    continue;
                }
                Err(err) => {
                    log::error!("fatal decode error: {err}");
                    return None;
                }
            };
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A fully decoded, mono sample buffer.
///
/// The buffer is shared (wrapped in an Arc) and never written after loading, so it can be
/// handed to any number of grain pools without copying.
#[derive(Debug, Clone)]
pub struct MonoSampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    source_channel_count: usize,
}

impl MonoSampleBuffer {
    /// Create a sample buffer from already decoded mono samples.
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            source_channel_count: 1,
        }
    }

    /// The decoded, read-only mono samples.
    pub fn samples(&self) -> &Arc<[f32]> {
        &self.samples
    }

    /// Number of sample frames in the buffer.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample rate of the decoded file. The buffer is never resampled.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the decoded file before it got mixed down to mono.
    pub fn source_channel_count(&self) -> usize {
        self.source_channel_count
    }
}

// -------------------------------------------------------------------------------------------------

/// Decode the given audio file into a mono sample buffer, averaging all channels.
///
/// Fails with [`Error::SampleLoadError`] naming the requested path when the file can not be
/// opened, decoded, or when it contains no samples at all.
pub fn load_mono<P: AsRef<Path>>(path: P) -> Result<MonoSampleBuffer, Error> {
    let path = path.as_ref();
    let load_error = |reason: String| {
        let path = path.display().to_string();
        log::error!("Failed loading file with path \"{path}\": {reason}");
        Error::SampleLoadError { path, reason }
    };

    let mut decoder = AudioDecoder::from_file(path).map_err(|err| load_error(err.to_string()))?;

    // prealloc entire buffer, when the decoder gives us a frame hint
    let mut buffer = Vec::with_capacity(decoder.codec_params().n_frames.unwrap_or(0) as usize);

    let mut decode_buffer = None::<SampleBuffer<f32>>;
    while decoder.read_packet(&mut decode_buffer).is_some() {
        let (Some(spec), Some(decoded)) = (decoder.signal_spec(), decode_buffer.as_ref()) else {
            continue;
        };
        // Downmix to mono
        let channel_count = spec.channels.count().max(1);
        buffer.extend(
            decoded
                .samples()
                .chunks_exact(channel_count)
                .map(|frame| frame.iter().sum::<f32>() / channel_count as f32),
        );
    }

    if buffer.is_empty() {
        return Err(load_error("file contains no audio frames".to_string()));
    }

    let spec = decoder
        .signal_spec()
        .ok_or_else(|| load_error("unknown sample rate or channel layout".to_string()))?;

    log::info!(
        "Loaded sample with {} frames ({} Hz, {} channel(s))",
        buffer.len(),
        spec.rate,
        spec.channels.count()
    );

    Ok(MonoSampleBuffer {
        samples: buffer.into(),
        sample_rate: spec.rate,
        source_channel_count: spec.channels.count(),
    })
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp_wav(name: &str, channels: u16, samples: &[f32]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "granulator-{}-{}.wav",
            name,
            std::process::id()
        ));
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for sample in samples {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn load_mono_file() {
        let samples = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        let path = write_temp_wav("mono", 1, &samples);

        let buffer = load_mono(&path).unwrap();
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.source_channel_count(), 1);
        assert_eq!(buffer.len(), samples.len());
        for (a, b) in buffer.samples().iter().zip(samples.iter()) {
            assert!((a - b).abs() < 1e-6);
        }

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn load_stereo_file_as_mono() {
        let samples = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let path = write_temp_wav("stereo", 2, &samples);

        let buffer = load_mono(&path).unwrap();
        assert_eq!(buffer.source_channel_count(), 2);
        assert_eq!(buffer.len(), 3);
        assert!((buffer.samples()[0] - 0.5).abs() < 1e-6);
        assert!((buffer.samples()[1] - 0.5).abs() < 1e-6);
        assert!(buffer.samples()[2].abs() < 1e-6);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn load_missing_file() {
        let result = load_mono("./this/file/does/not/exist.wav");
        match result {
            Err(Error::SampleLoadError { path, .. }) => {
                assert!(path.contains("exist.wav"));
            }
            _ => panic!("expected a sample load error"),
        }
        let message = load_mono("missing.wav").unwrap_err().to_string();
        assert!(message.contains("\"missing.wav\""));
    }
}
