//! Local Audio I/O
//!
//! - cpal: microphone capture
//! - rodio: playback of the synthesized reply
//!
//! Both calls block the current thread; callers run them on
//! `spawn_blocking`.

use anyhow::{Result, Context, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, error, debug};

use super::wav::{downmix, f32_to_i16, resample_linear};

/// Record `duration_secs` from the default microphone as mono i16 at `target_rate`
pub fn record_pcm(duration_secs: f64, target_rate: u32) -> Result<Vec<i16>> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        bail!("Invalid recording duration: {}s", duration_secs);
    }

    let host = cpal::default_host();
    let device = host.default_input_device()
        .context("No input device available (microphone not found)")?;

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using input device: {}", device_name);

    let supported = device.default_input_config()
        .context("Failed to get default input config")?;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.config();
    let channels = stream_config.channels;
    let sample_rate = stream_config.sample_rate.0;

    let captured: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let err_fn = |err| error!("Audio input error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => {
            let buf = captured.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut b) = buf.lock() {
                        b.extend_from_slice(data);
                    }
                },
                err_fn,
                None,
            )?
        }
        cpal::SampleFormat::I16 => {
            let buf = captured.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut b) = buf.lock() {
                        b.extend(data.iter().map(|&s| s as f32 / i16::MAX as f32));
                    }
                },
                err_fn,
                None,
            )?
        }
        format => bail!("Unsupported sample format: {:?}", format),
    };

    stream.play()?;
    std::thread::sleep(Duration::from_secs_f64(duration_secs));
    stream.pause()?;
    drop(stream);

    let raw = captured.lock()
        .map(|s| s.clone())
        .unwrap_or_default();
    debug!("Captured {} raw samples at {}Hz x{}", raw.len(), sample_rate, channels);

    let mono = downmix(&raw, channels);
    let resampled = resample_linear(&mono, sample_rate, target_rate);
    Ok(resampled.into_iter().map(f32_to_i16).collect())
}

/// Play an audio file on the default output device until it finishes
pub fn play_file(path: &Path) -> Result<()> {
    let (_stream, stream_handle) = rodio::OutputStream::try_default()
        .context("Failed to create audio output stream")?;
    let sink = rodio::Sink::try_new(&stream_handle)
        .context("Failed to create audio sink")?;

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {:?}", path))?;
    let source = rodio::Decoder::new(std::io::BufReader::new(file))
        .context("Failed to decode audio file")?;

    sink.append(source);
    info!("Playing audio file: {:?}", path);
    sink.sleep_until_end();
    Ok(())
}
