//! An example showcasing a grain pool, sweeping the grain's file position while playing.

use std::{path::PathBuf, time::Duration};

use arg::{parse_args, Args};

use granulator::{
    outputs::WavOutput, DefaultOutputDevice, Error, GrainPool, GrainWindowMode, GranularHandle,
    GranularOptions, GranularParameters, GranularSource, OutputDevice,
};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

// Granular parameter consts (tweak as needed!)

const GRAIN_COUNT: usize = 8;
const GRAIN_SIZE: f32 = 180.0; // 0ms - 1000ms
const GRAIN_SIZE_RANDOMNESS: f32 = 0.5; // 0.0 = fixed size, 1.0 = full random
const GRAIN_POSITION_RANDOMNESS: f32 = 0.25; // 0.0 = fixed position, 1.0 = full random
const GRAIN_SPEED: f32 = 1.0; // -2.0 - 2.0, negative values play backwards

const SWEEP_STEPS: usize = 100;
const DEFAULT_DURATION_SECS: u64 = 10;

// -------------------------------------------------------------------------------------------------

/// Arguments for the grains example.
#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "s", long = "sample")]
    /// Audio file to play grains from. Plays a generated chord when not set.
    sample_path: Option<PathBuf>,
    #[arg(short = "g", long = "grains")]
    /// Number of grains (default: 8)
    grain_count: Option<usize>,
    #[arg(short = "w", long = "window")]
    /// Grain window: \"RampDown\", \"RampUp\" or \"HalfSine\" (default: HalfSine)
    window: Option<GrainWindowMode>,
    #[arg(short = "d", long = "duration")]
    /// Playback duration in seconds (default: 10)
    duration: Option<u64>,
    #[arg(short = "o", long = "output")]
    /// Write audio output into the given wav file, instead of using the default audio device.
    output_path: Option<PathBuf>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    // Parse optional arguments
    let args = parse_args::<Arguments>();
    create_logger(args.log_level);

    let duration = Duration::from_secs(args.duration.unwrap_or(DEFAULT_DURATION_SECS));

    if let Some(output_path) = &args.output_path {
        // Wav files render faster than real-time, so the grains play from a static position
        let mut output = WavOutput::open_with_specs(output_path, 44100, 2, duration)?;
        play_grains(&mut output, &args)?;
        println!("Rendering grains into '{}'...", output_path.display());
        output.wait();
    } else {
        let mut output = DefaultOutputDevice::open()?;
        let (handle, sample_duration_ms) = play_grains(&mut output, &args)?;
        println!("Playing grains for {} seconds...", duration.as_secs());

        // Sweep the grain's file position through the first half of the sample
        let step_duration = duration / SWEEP_STEPS as u32;
        for step in 0..SWEEP_STEPS {
            let position = step as f32 / SWEEP_STEPS as f32 * sample_duration_ms * 0.5;
            handle.set_file_position_ms(position);
            std::thread::sleep(step_duration);
        }
        output.close();
    }

    Ok(())
}

/// Create a grain pool from the arguments and play it on the given output. Returns the
/// handle to control the pool and the sample's duration in milliseconds.
fn play_grains(
    output: &mut dyn OutputDevice,
    args: &Arguments,
) -> Result<(GranularHandle, f32), Error> {
    let sample_rate = output.sample_rate();
    let channel_count = output.channel_count();

    // Create the grain pool
    let options = GranularOptions::new()
        .grain_count(args.grain_count.unwrap_or(GRAIN_COUNT))
        .window(args.window.unwrap_or_default());
    let mut pool = if let Some(sample_path) = &args.sample_path {
        GrainPool::from_file(sample_path, sample_rate, options)?
    } else {
        GrainPool::new(generate_chord(sample_rate), sample_rate, options)?
    };
    let sample_duration_ms = pool.sample_buffer().len() as f32 * 1000.0 / sample_rate as f32;

    let parameters = GranularParameters {
        grain_size_ms: GRAIN_SIZE,
        file_position_ms: 0.0,
        playback_speed: GRAIN_SPEED,
        probability: 1.0,
        grain_size_randomness: GRAIN_SIZE_RANDOMNESS,
        file_position_randomness: GRAIN_POSITION_RANDOMNESS,
    };
    parameters.validate()?;
    pool.apply_parameters(&parameters);
    pool.update_all_grains();

    // Play it
    let source = GranularSource::new(pool, channel_count)?;
    let handle = source.handle();
    output.play(Box::new(source));
    output.resume();

    Ok((handle, sample_duration_ms))
}

// -------------------------------------------------------------------------------------------------

fn create_logger(log_level: Option<log::Level>) {
    simple_logger::SimpleLogger::new()
        .with_level(log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        // disable logging in chatty modules
        .with_module_level("symphonia_core", log::LevelFilter::Warn)
        .with_module_level("symphonia_format", log::LevelFilter::Warn)
        .init()
        .expect("Failed to set logger");
}

fn generate_chord(sample_rate: u32) -> Vec<f32> {
    const FREQUENCIES: [f32; 3] = [220.0, 277.18, 329.63];
    (0..sample_rate as usize * 4)
        .map(|frame| {
            let time = frame as f32 / sample_rate as f32;
            FREQUENCIES
                .iter()
                .map(|freq| (std::f32::consts::TAU * freq * time).sin())
                .sum::<f32>()
                / FREQUENCIES.len() as f32
        })
        .collect()
}
