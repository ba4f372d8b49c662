//! WAV encoding of the rendered mix using hound
//!
//! Always 16-bit PCM stereo, so the file carries the canonical 44-byte header.

use crate::error::{MixError, Result};
use crate::model::{AudioBuffer, RENDER_CHANNELS};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Seek, Write};

/// Encode a planar stereo buffer to WAV bytes in memory
pub fn encode_wav(audio: &AudioBuffer) -> Result<Vec<u8>> {
    if audio.channel_count() != RENDER_CHANNELS {
        return Err(MixError::Encode(format!(
            "Expected {} channels, got {}",
            RENDER_CHANNELS,
            audio.channel_count()
        )));
    }

    let spec = WavSpec {
        channels: RENDER_CHANNELS as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, spec)?;
        write_samples(&mut writer, &audio.channels[0], &audio.channels[1])?;

        // Finalize patches the RIFF and data sizes
        writer.finalize()?;
    }

    log::debug!("Encoded {} frames into {} bytes", audio.len(), buffer.len());
    Ok(buffer)
}

fn write_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    left: &[f32],
    right: &[f32],
) -> Result<()> {
    for (&l, &r) in left.iter().zip(right) {
        writer.write_sample(to_i16(l))?;
        writer.write_sample(to_i16(r))?;
    }
    Ok(())
}

/// Asymmetric scaling so both -1.0 and 1.0 map to the full range
fn to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}
