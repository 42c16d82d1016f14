//! WAV and PCM helpers shared by speech input and output

use anyhow::{Context, Result};

/// Decoded PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct Pcm {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Encode mono/stereo i16 samples as an in-memory WAV file
pub fn pcm_to_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .context("Failed to create WAV writer")?;

    for &sample in samples {
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    Ok(cursor.into_inner())
}

/// Decode WAV bytes to Int16 PCM.
///
/// Parses the header by hand because streaming TTS servers emit
/// 0xFFFFFFFF chunk sizes, which hound rejects. Handles IEEE Float32 and
/// 16/32-bit integer PCM.
pub fn wav_to_pcm(wav_bytes: &[u8]) -> Result<Pcm> {
    // Minimum WAV header: 44 bytes (RIFF + fmt + data headers)
    if wav_bytes.len() < 44 {
        anyhow::bail!("WAV data too short: {} bytes", wav_bytes.len());
    }

    if &wav_bytes[0..4] != b"RIFF" || &wav_bytes[8..12] != b"WAVE" {
        anyhow::bail!("Not a valid WAV file");
    }

    let mut pos = 12;
    let mut data_start = 0usize;
    let mut audio_format = 0u16;
    let mut channels = 1u16;
    let mut sample_rate = 0u32;
    let mut bits_per_sample = 0u16;

    while pos + 8 <= wav_bytes.len() {
        let chunk_id = &wav_bytes[pos..pos + 4];
        let chunk_size = u32::from_le_bytes([
            wav_bytes[pos + 4], wav_bytes[pos + 5],
            wav_bytes[pos + 6], wav_bytes[pos + 7],
        ]);

        if chunk_id == b"fmt " {
            if pos + 8 + 16 <= wav_bytes.len() {
                let fmt = &wav_bytes[pos + 8..];
                audio_format = u16::from_le_bytes([fmt[0], fmt[1]]);
                channels = u16::from_le_bytes([fmt[2], fmt[3]]);
                sample_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
                bits_per_sample = u16::from_le_bytes([fmt[14], fmt[15]]);
            }
            let real_size = if chunk_size == 0xFFFFFFFF { 16 } else { chunk_size as usize };
            pos += 8 + real_size;
        } else if chunk_id == b"data" {
            data_start = pos + 8;
            break;
        } else {
            let real_size = if chunk_size == 0xFFFFFFFF { 0 } else { chunk_size as usize };
            pos += 8 + real_size;
        }
    }

    if data_start == 0 || data_start > wav_bytes.len() {
        anyhow::bail!("Could not find data chunk in WAV");
    }
    if sample_rate == 0 {
        anyhow::bail!("WAV has no fmt chunk");
    }

    let audio_data = &wav_bytes[data_start..];
    let samples: Vec<i16> = match (audio_format, bits_per_sample) {
        (3, 32) => audio_data
            .chunks_exact(4)
            .map(|c| f32_to_i16(f32::from_le_bytes([c[0], c[1], c[2], c[3]])))
            .collect(),
        (1, 16) => audio_data
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect(),
        (1, 32) => audio_data
            .chunks_exact(4)
            .map(|c| (i32::from_le_bytes([c[0], c[1], c[2], c[3]]) >> 16) as i16)
            .collect(),
        (format, bits) => anyhow::bail!("Unsupported WAV encoding: format {} at {} bits", format, bits),
    };

    Ok(Pcm { samples, sample_rate, channels })
}

pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Average interleaved channels down to mono
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Simple linear resampling
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio) as usize;
    let mut result = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx_floor = (src_idx.floor() as usize).min(samples.len() - 1);
        let idx_ceil = (idx_floor + 1).min(samples.len() - 1);
        let frac = src_idx - idx_floor as f64;

        let val = samples[idx_floor] * (1.0 - frac as f32)
                + samples[idx_ceil] * frac as f32;
        result.push(val);
    }

    result
}
