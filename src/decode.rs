//! Audio decode service
//!
//! Decodes any container symphonia understands into a stereo [`AudioBuffer`]
//! at the render sample rate. Mono sources are duplicated, extra channels are
//! dropped, and other sample rates go through a band-limited resampler.

use crate::error::{MixError, Result};
use crate::model::{AudioBuffer, RENDER_CHANNELS, RENDER_SAMPLE_RATE};
use rubato::{FftFixedIn, Resampler};
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode an audio file from disk
pub fn decode_file(path: &Path) -> Result<AudioBuffer> {
    let name = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|e| MixError::Decode {
        track: name.clone(),
        reason: format!("Failed to open audio file: {}", e),
    })?;
    let ext = path.extension().and_then(|e| e.to_str());
    decode_bytes(&name, bytes, ext)
}

/// Decode in-memory audio bytes
///
/// `name` is only used for error messages and logging.
pub fn decode_bytes(name: &str, bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioBuffer> {
    let fail = |reason: String| MixError::Decode {
        track: name.to_string(),
        reason,
    };

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| fail(format!("Failed to probe audio format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| fail("No audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| fail("No sample rate in audio track".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| fail(format!("Failed to create audio decoder: {}", e)))?;

    let mut left: Vec<f32> = Vec::new();
    let mut right: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet in '{}': {:?}", name, e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Error decoding packet in '{}': {:?}", name, e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        let channels = spec.channels.count().max(1);
        for frame in sample_buf.samples().chunks(channels) {
            let l = frame[0];
            let r = if channels > 1 { frame[1] } else { l };
            left.push(l);
            right.push(r);
        }
    }

    if left.is_empty() {
        return Err(fail("No audio frames decoded".to_string()));
    }

    log::debug!(
        "Decoded '{}': {} frames ({:.1}s) at {}Hz",
        name,
        left.len(),
        left.len() as f64 / sample_rate as f64,
        sample_rate
    );

    let buffer = AudioBuffer::new(sample_rate, vec![left, right]);
    debug_assert_eq!(buffer.channel_count(), RENDER_CHANNELS);
    resample(buffer, RENDER_SAMPLE_RATE).map_err(|e| fail(e.to_string()))
}

/// Input frames per resampler call
const RESAMPLE_CHUNK: usize = 1024;

/// FFT sub-chunks per call
const RESAMPLE_SUB_CHUNKS: usize = 2;

/// Band-limited sample rate conversion over all planar channels
///
/// The resampler's own delay is trimmed so frame 0 of the output lines up
/// with frame 0 of the input.
pub fn resample(buffer: AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    if buffer.sample_rate == target_rate || buffer.is_empty() || buffer.sample_rate == 0 {
        return Ok(buffer);
    }

    let source_rate = buffer.sample_rate;
    let channel_count = buffer.channel_count();
    let input_frames = buffer.len();

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        RESAMPLE_SUB_CHUNKS,
        channel_count,
    )?;

    let delay = resampler.output_delay();
    let expected_frames =
        (input_frames as f64 * target_rate as f64 / source_rate as f64).ceil() as usize;
    let wanted = expected_frames + delay;

    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted + RESAMPLE_CHUNK); channel_count];

    // Feed real frames, then zeros until the delayed tail has come out
    let mut pos = 0;
    while pos < input_frames || output[0].len() < wanted {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(input_frames);

        let chunk: Vec<Vec<f32>> = buffer
            .channels
            .iter()
            .map(|input| {
                let mut frames = if pos < end {
                    input[pos..end].to_vec()
                } else {
                    Vec::with_capacity(needed)
                };
                frames.resize(needed, 0.0);
                frames
            })
            .collect();

        let block = resampler.process(&chunk, None)?;
        if block.first().map_or(true, |c| c.is_empty()) {
            break;
        }
        for (out, produced) in output.iter_mut().zip(block) {
            out.extend_from_slice(&produced);
        }

        pos += needed;
    }

    for channel in output.iter_mut() {
        channel.drain(..delay.min(channel.len()));
        channel.truncate(expected_frames);
    }

    log::debug!(
        "Resampled {}Hz -> {}Hz ({} frames)",
        source_rate,
        target_rate,
        expected_frames
    );

    Ok(AudioBuffer::new(target_rate, output))
}
