use std::{
    fs::File,
    io::BufWriter,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, JoinHandle},
    time::Duration,
};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{
    error::Error,
    output::OutputDevice,
    source::{empty::EmptySource, Source},
    utils::buffer::scale_buffer,
};

// -------------------------------------------------------------------------------------------------

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_CHANNEL_COUNT: usize = 2;
const DEFAULT_DURATION: Duration = Duration::from_secs(u64::MAX);

const BUFFER_SIZE_FRAMES: usize = 1024;

// -------------------------------------------------------------------------------------------------

/// Audio output device, which writes audio into a wav file instead of playing it back.
///
/// NOTE: Unlike the real-time output devices, the wav writer device is initially paused, so
/// it must be resumed manually after the source got set up. Rendering happens faster than
/// real-time in a background thread.
pub struct WavOutput {
    stream: Arc<Mutex<WavStream>>,
    thread: Option<JoinHandle<()>>,
}

impl WavOutput {
    /// Open a wav output device to write at the given file using default specs and an
    /// endless duration.
    pub fn open<P: AsRef<Path>>(file_path: P) -> Result<Self, Error> {
        Self::open_with_specs(
            file_path,
            DEFAULT_SAMPLE_RATE,
            DEFAULT_CHANNEL_COUNT,
            DEFAULT_DURATION,
        )
    }

    /// Create a new wav output device with the given parameters.
    ///
    /// * `file_path`: Target file path. Should end with ".wav" extension.
    /// * `sample_rate`: Source and wav file's target sample rate.
    /// * `channel_count`: Source and wav file's channel layout.
    /// * `duration`: Max length of written content. When the source no longer produces any
    ///   output, the wav file will be closed automatically, so the duration also can be endless.
    ///
    /// Wav files contents are always saved as 32bit floats.
    pub fn open_with_specs<P: AsRef<Path>>(
        file_path: P,
        sample_rate: u32,
        channel_count: usize,
        duration: Duration,
    ) -> Result<Self, Error> {
        let spec = WavSpec {
            channels: channel_count as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(file_path, spec)
            .map_err(|e| Error::OutputDeviceError(Box::new(e)))?;

        let stream = Arc::new(Mutex::new(WavStream {
            writer: Some(writer),
            channel_count,
            sample_rate,
            source: Box::new(EmptySource),
            volume: 1.0,
            buffer: vec![0.0; BUFFER_SIZE_FRAMES * channel_count],
            started: false,
            finished: false,
            playback_pos: 0,
            duration,
        }));

        // Start the stream in a new thread
        let thread = thread::Builder::new()
            .name("wav_output".to_string())
            .spawn({
                let stream = Arc::clone(&stream);
                move || {
                    loop {
                        // process the next audio slice
                        {
                            let mut stream = lock(&stream);
                            if let Err(err) = stream.process() {
                                log::error!("Error processing WAV output: {err}");
                                stream.finished = true;
                            }
                            // Stop write loop when duration elapsed
                            if stream.finished {
                                stream.started = false;
                                break;
                            }
                        }
                        // sleep for a short time to avoid busy waiting
                        thread::sleep(Duration::from_millis(1));
                    }

                    // Finalize the WAV file when done
                    lock(&stream).finalize();
                }
            })?;

        Ok(Self {
            stream,
            thread: Some(thread),
        })
    }

    /// Block until all content got written and the file got finalized.
    pub fn wait(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("WAV output thread panicked");
            }
        }
    }

    fn stream(&self) -> MutexGuard<'_, WavStream> {
        lock(&self.stream)
    }
}

impl OutputDevice for WavOutput {
    fn channel_count(&self) -> usize {
        self.stream().channel_count
    }

    fn sample_rate(&self) -> u32 {
        self.stream().sample_rate
    }

    fn sample_position(&self) -> u64 {
        self.stream().playback_pos
    }

    fn volume(&self) -> f32 {
        self.stream().volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.stream().volume = volume;
    }

    fn is_running(&self) -> bool {
        self.stream().started
    }

    fn play(&mut self, source: Box<dyn Source>) {
        let mut inner = self.stream();
        // ensure source has our sample rate and channel layout
        assert_eq!(source.channel_count(), inner.channel_count);
        assert_eq!(source.sample_rate(), inner.sample_rate);
        inner.source = source;
    }

    fn stop(&mut self) {
        self.stream().source = Box::new(EmptySource);
    }

    fn pause(&mut self) {
        self.stream().started = false;
    }

    fn resume(&mut self) {
        self.stream().started = true;
    }

    fn close(&mut self) {
        self.stream().finished = true;
        self.wait();
    }
}

impl Drop for WavOutput {
    fn drop(&mut self) {
        self.close();
    }
}

// -------------------------------------------------------------------------------------------------

fn lock(stream: &Mutex<WavStream>) -> MutexGuard<'_, WavStream> {
    stream
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

// -------------------------------------------------------------------------------------------------

struct WavStream {
    writer: Option<WavWriter<BufWriter<File>>>,
    channel_count: usize,
    sample_rate: u32,
    source: Box<dyn Source>,
    volume: f32,
    buffer: Vec<f32>,
    started: bool,
    finished: bool,
    playback_pos: u64,
    duration: Duration,
}

impl WavStream {
    fn process(&mut self) -> Result<(), Error> {
        // Do nothing when we didn't started yet
        if !self.started || self.finished {
            return Ok(());
        }

        // Stop running when we've exceeded the duration
        let pos_in_frames = self.playback_pos / self.channel_count as u64;
        let max_frames = (self.duration.as_secs_f64() * self.sample_rate as f64) as u64;
        if pos_in_frames >= max_frames {
            self.finished = true;
            return Ok(());
        }

        // Write out as many samples as possible from the audio source to the buffer,
        // but never more than the remaining duration.
        let remaining_samples = (max_frames - pos_in_frames)
            .saturating_mul(self.channel_count as u64)
            .min(self.buffer.len() as u64) as usize;
        let written = self.source.write(&mut self.buffer[..remaining_samples]);

        // Stop writing when no more output is produced
        if written == 0 {
            self.finished = true;
            return Ok(());
        }

        // Apply the global volume level
        scale_buffer(&mut self.buffer[..written], self.volume);

        // Write to WAV file
        if let Some(ref mut writer) = self.writer {
            for sample in &self.buffer[..written] {
                writer
                    .write_sample(*sample)
                    .map_err(|err| Error::OutputDeviceError(Box::new(err)))?;
            }
        }

        self.playback_pos += written as u64;
        Ok(())
    }

    fn finalize(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(err) = writer.finalize() {
                log::error!("Failed to finalize WAV file: {err}");
            }
        }
    }
}

impl Drop for WavStream {
    fn drop(&mut self) {
        self.finalize();
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        granular::{GrainPool, GranularOptions, GranularParameters},
        source::granular::GranularSource,
    };

    #[test]
    fn render_granular_source() {
        let path = std::env::temp_dir().join(format!(
            "granulator-render-{}.wav",
            std::process::id()
        ));
        let sample_rate = 8000;
        let channel_count = 2;

        let buffer = (0..sample_rate)
            .map(|i| (i as f32 * 0.1).sin())
            .collect::<Vec<_>>();
        let mut pool = GrainPool::new(
            buffer,
            sample_rate,
            GranularOptions::new().grain_count(4).seed(1),
        )
        .unwrap();
        pool.apply_parameters(&GranularParameters {
            grain_size_ms: 50.0,
            file_position_ms: 100.0,
            ..Default::default()
        });
        let source = GranularSource::new(pool, channel_count).unwrap();

        let mut output = WavOutput::open_with_specs(
            &path,
            sample_rate,
            channel_count,
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(!output.is_running());
        output.play(Box::new(source));
        output.resume();
        output.wait();
        assert_eq!(output.sample_position(), 4000 * channel_count as u64);
        output.close();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, channel_count as u16);
        assert_eq!(reader.spec().sample_rate, sample_rate);
        let samples = reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(samples.len(), 4000 * channel_count);
        assert!(samples.iter().any(|s| *s != 0.0));
        for frame in samples.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }

        let _ = std::fs::remove_file(path);
    }
}
