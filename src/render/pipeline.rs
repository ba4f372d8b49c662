//! Render pipeline: schedule -> engine -> WAV

use super::engine::RenderEngine;
use super::wav::encode_wav;
use crate::automation::{MixSchedule, ScheduledTrack};
use crate::error::{MixError, Result};
use crate::mix::TransitionTechnique;
use crate::model::{AudioBuffer, RenderSeconds, RENDER_SAMPLE_RATE};
use serde::Serialize;

/// One boundary in the finished mix
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transition {
    /// Mix time at which the hand-over starts
    pub time: RenderSeconds,
    pub technique: TransitionTechnique,
}

/// Encoded mix plus where its transitions are
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub wav: Vec<u8>,
    pub transitions: Vec<Transition>,
}

/// Renders a [`MixSchedule`] against the stretched buffers it refers to
pub struct RenderPipeline {
    sample_rate: u32,
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self {
            sample_rate: RENDER_SAMPLE_RATE,
        }
    }

    /// Render and encode
    ///
    /// `buffers[i]` is the stretched audio for timeline track index `i`.
    /// Events with unusable timing are logged and skipped.
    pub fn render(&self, schedule: &MixSchedule, buffers: &[&AudioBuffer]) -> Result<RenderOutput> {
        log::info!(
            "Rendering {} tracks, {:.1}s at {} Hz",
            schedule.tracks.len(),
            schedule.total_duration.seconds(),
            self.sample_rate
        );

        let mut engine = RenderEngine::new(self.sample_rate, schedule.total_duration);
        let mut rendered = 0;

        for track in &schedule.tracks {
            let source = match validate(track, buffers) {
                Ok(source) => source,
                Err(e) => {
                    log::warn!("Skipping event: {}", e);
                    continue;
                }
            };
            engine.add_track(track, source);
            rendered += 1;
        }

        log::info!("Rendered {}/{} events", rendered, schedule.tracks.len());

        let audio = engine.finish();
        let wav = encode_wav(&audio)?;

        Ok(RenderOutput {
            wav,
            transitions: transitions(schedule),
        })
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Boundaries in timeline order; the last track has none
fn transitions(schedule: &MixSchedule) -> Vec<Transition> {
    let count = schedule.tracks.len().saturating_sub(1);
    schedule.tracks[..count]
        .iter()
        .map(|t| Transition {
            time: t.event.transition_start(),
            technique: t.event.technique,
        })
        .collect()
}

fn validate<'a>(track: &ScheduledTrack, buffers: &[&'a AudioBuffer]) -> Result<&'a AudioBuffer> {
    let event = &track.event;
    let degenerate = |reason: String| MixError::DegenerateEvent {
        track: event.track_index,
        reason,
    };

    let timing = [
        event.mix_start_time,
        event.buffer_offset_start,
        event.buffer_offset_end,
    ];
    if timing.iter().any(|t| !t.is_finite()) {
        return Err(degenerate("non-finite timing".to_string()));
    }

    let duration = event.duration();
    if duration.seconds() <= 0.0 {
        return Err(degenerate(format!(
            "non-positive duration {:.3}s",
            duration.seconds()
        )));
    }

    if track
        .clips
        .iter()
        .any(|c| !c.start.is_finite() || !c.offset.is_finite() || !c.duration.is_finite())
    {
        return Err(degenerate("non-finite clip timing".to_string()));
    }

    buffers
        .get(event.track_index)
        .copied()
        .ok_or_else(|| degenerate("no buffer for track".to_string()))
}
