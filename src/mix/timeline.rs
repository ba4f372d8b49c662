//! Timeline construction: placement of stretched tracks in mix time

use super::config::MixConfiguration;
use super::technique::{choose_technique, TransitionTechnique};
use crate::model::RenderSeconds;
use crate::stretch::StretchedTrack;
use rand::Rng;
use serde::Serialize;

/// Silence appended after the last event
pub const SAFETY_TAIL: RenderSeconds = RenderSeconds(10.0);

/// Placement of one track in the mix
///
/// Buffer offsets are in stretched-buffer time; `mix_start_time` is in mix
/// time. Both are [`RenderSeconds`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub track_index: usize,
    pub mix_start_time: RenderSeconds,
    pub buffer_offset_start: RenderSeconds,
    pub buffer_offset_end: RenderSeconds,
    pub buffer_loop_start: RenderSeconds,
    pub buffer_loop_end: RenderSeconds,
    /// Time shared with the next event
    pub overlap_time: RenderSeconds,
    /// Technique for the hand-over to the next event
    pub technique: TransitionTechnique,
    pub gain: f32,
}

impl TimelineEvent {
    /// Length of the primary clip
    pub fn duration(&self) -> RenderSeconds {
        self.buffer_offset_end - self.buffer_offset_start
    }

    /// Mix time at which the primary clip stops
    pub fn end_time(&self) -> RenderSeconds {
        self.mix_start_time + self.duration()
    }

    /// Mix time at which the hand-over begins
    pub fn transition_start(&self) -> RenderSeconds {
        self.end_time() - self.overlap_time
    }

    pub fn has_loop(&self) -> bool {
        self.buffer_loop_end.seconds() > self.buffer_loop_start.seconds()
    }
}

/// Ordered events plus the length of the render
#[derive(Debug, Clone)]
pub struct MixTimeline {
    pub events: Vec<TimelineEvent>,
    pub total_duration: RenderSeconds,
}

/// Sequences stretched tracks into a [`MixTimeline`]
pub struct MixTimelineBuilder<'a> {
    config: &'a MixConfiguration,
}

impl<'a> MixTimelineBuilder<'a> {
    pub fn new(config: &'a MixConfiguration) -> Self {
        Self { config }
    }

    /// Overlap in seconds for a technique at the target tempo
    pub fn overlap_seconds(&self, technique: TransitionTechnique) -> RenderSeconds {
        let bars = technique.overlap_bars(self.config.transition_length_bars);
        RenderSeconds(bars as f64 * self.config.bar_seconds())
    }

    /// Build the timeline, drawing one technique per boundary from `rng`
    pub fn build<R: Rng + ?Sized>(&self, tracks: &[StretchedTrack], rng: &mut R) -> MixTimeline {
        log::info!(
            "Building timeline for {} tracks ({} style, {:.1} BPM)",
            tracks.len(),
            self.config.style,
            self.config.target_bpm
        );

        let last = tracks.len().saturating_sub(1);
        let mut events: Vec<TimelineEvent> = tracks
            .iter()
            .enumerate()
            .map(|(index, track)| {
                let technique = if index < last {
                    choose_technique(self.config.style, rng)
                } else {
                    TransitionTechnique::Blend
                };
                self.place(index, track, technique, index == last)
            })
            .collect();

        // Overlap never exceeds either neighbour so the cursor only moves forward
        for i in 0..events.len().saturating_sub(1) {
            let limit = events[i].duration().min(events[i + 1].duration());
            events[i].overlap_time = events[i].overlap_time.min(limit).max(RenderSeconds::ZERO);
        }

        let mut cursor = RenderSeconds::ZERO;
        for event in events.iter_mut() {
            event.mix_start_time = cursor;
            cursor = cursor + event.duration() - event.overlap_time;

            log::debug!(
                "Track {} at {:.2}s: {:.2}s clip, {} over {:.2}s",
                event.track_index,
                event.mix_start_time.seconds(),
                event.duration().seconds(),
                event.technique,
                event.overlap_time.seconds()
            );
        }

        let total_duration = (cursor + SAFETY_TAIL).max(SAFETY_TAIL);
        log::info!("Timeline length: {:.1}s", total_duration.seconds());

        MixTimeline {
            events,
            total_duration,
        }
    }

    fn place(
        &self,
        index: usize,
        track: &StretchedTrack,
        technique: TransitionTechnique,
        is_last: bool,
    ) -> TimelineEvent {
        let cues = &track.analysis.cue_points;
        let buffer_end = track.buffer.duration();

        let start = cues.start.stretched(track.tempo).max(RenderSeconds::ZERO).min(buffer_end);
        let outro = if is_last {
            buffer_end
        } else {
            cues.end.stretched(track.tempo).min(buffer_end)
        };
        let end = outro.max(start);

        let overlap_time = if is_last {
            RenderSeconds::ZERO
        } else {
            self.overlap_seconds(technique)
        };

        TimelineEvent {
            track_index: index,
            mix_start_time: RenderSeconds::ZERO,
            buffer_offset_start: start,
            buffer_offset_end: end,
            buffer_loop_start: cues.loop_region.start.stretched(track.tempo),
            buffer_loop_end: cues.loop_region.end.stretched(track.tempo).min(buffer_end),
            overlap_time,
            technique,
            gain: track.analysis.gain_factor,
        }
    }
}
