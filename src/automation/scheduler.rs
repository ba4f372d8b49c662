//! Transition scheduling: automation and extra clips for every boundary

use super::recipe::{recipe_for, ControlPoint, Direction, FilterMode, Param, DEFAULT_Q, OPEN_CUTOFF_HZ};
use crate::mix::{MixTimeline, TimelineEvent};
use crate::model::RenderSeconds;

/// One playback of a stretched buffer
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledClip {
    /// Mix time at which playback starts
    pub start: RenderSeconds,
    /// Read position in the stretched buffer
    pub offset: RenderSeconds,
    pub duration: RenderSeconds,
    /// Loop bounds in buffer time; playback wraps from end back to start
    pub loop_region: Option<(RenderSeconds, RenderSeconds)>,
}

impl ScheduledClip {
    pub fn end(&self) -> RenderSeconds {
        self.start + self.duration
    }
}

/// A timeline event with its clips and automation
#[derive(Debug, Clone)]
pub struct ScheduledTrack {
    pub event: TimelineEvent,
    /// Primary clip first, then any loop tail
    pub clips: Vec<ScheduledClip>,
    pub automation: Vec<ControlPoint>,
}

/// Everything the renderer needs
#[derive(Debug, Clone)]
pub struct MixSchedule {
    pub tracks: Vec<ScheduledTrack>,
    pub total_duration: RenderSeconds,
}

/// Annotates a timeline with per-boundary automation
#[derive(Debug, Default)]
pub struct TransitionScheduler;

impl TransitionScheduler {
    pub fn new() -> Self {
        Self
    }

    pub fn schedule(&self, timeline: &MixTimeline) -> MixSchedule {
        let mut tracks: Vec<ScheduledTrack> = timeline
            .events
            .iter()
            .map(|event| ScheduledTrack {
                event: event.clone(),
                clips: vec![ScheduledClip {
                    start: event.mix_start_time,
                    offset: event.buffer_offset_start,
                    duration: event.duration(),
                    loop_region: None,
                }],
                automation: Vec::new(),
            })
            .collect();

        if let Some(first) = tracks.first_mut() {
            let at = first.event.mix_start_time.seconds();
            let gain = first.event.gain as f64;
            first.automation.push(ControlPoint::set(Param::Gain, at, gain));
        }

        for i in 0..tracks.len().saturating_sub(1) {
            let (head, tail) = tracks.split_at_mut(i + 1);
            let outgoing = &mut head[i];
            let incoming = &mut tail[0];
            schedule_boundary(outgoing, incoming);
        }

        let total_duration = tracks
            .iter()
            .flat_map(|t| t.clips.iter().map(ScheduledClip::end))
            .fold(timeline.total_duration, RenderSeconds::max);

        MixSchedule {
            tracks,
            total_duration,
        }
    }
}

fn schedule_boundary(outgoing: &mut ScheduledTrack, incoming: &mut ScheduledTrack) {
    let technique = outgoing.event.technique;
    let recipe = recipe_for(technique);
    let overlap = outgoing.event.overlap_time;
    let boundary = outgoing.event.end_time();

    log::debug!(
        "Scheduling {} from track {} to track {} ({:.2}s window)",
        technique,
        outgoing.event.track_index,
        incoming.event.track_index,
        overlap.seconds()
    );

    outgoing.automation.extend(recipe(
        Direction::Outgoing,
        boundary - overlap,
        overlap,
        outgoing.event.gain as f64,
    ));

    let entry = incoming.event.mix_start_time;
    incoming.automation.extend(reset_points(entry));
    incoming.automation.extend(recipe(
        Direction::Incoming,
        entry,
        overlap,
        incoming.event.gain as f64,
    ));

    if let Some(tail) = technique.tail_seconds() {
        if outgoing.event.has_loop() {
            let tail = RenderSeconds(tail);
            outgoing.clips.push(ScheduledClip {
                start: boundary,
                offset: outgoing.event.buffer_loop_start,
                duration: tail,
                loop_region: Some((outgoing.event.buffer_loop_start, outgoing.event.buffer_loop_end)),
            });
            // Echo decays out over the tail
            outgoing.automation.extend([
                ControlPoint::set(Param::Send, boundary.seconds(), 1.0),
                ControlPoint::linear(Param::Send, (boundary + tail).seconds(), 0.0),
            ]);
        } else {
            log::debug!(
                "Track {} has no usable loop region, skipping {} tail",
                outgoing.event.track_index,
                technique
            );
        }
    }
}

/// Strip state for a fresh entry: silent, flat EQ, open filter, dry
fn reset_points(at: RenderSeconds) -> [ControlPoint; 7] {
    let t = at.seconds();
    [
        ControlPoint::set(Param::Gain, t, 0.0),
        ControlPoint::set(Param::LowShelf, t, 0.0),
        ControlPoint::set(Param::HighShelf, t, 0.0),
        ControlPoint::set(Param::FilterMode, t, FilterMode::Lowpass.value()),
        ControlPoint::set(Param::FilterCutoff, t, OPEN_CUTOFF_HZ),
        ControlPoint::set(Param::FilterQ, t, DEFAULT_Q),
        ControlPoint::set(Param::Send, t, 0.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::recipe::CurveKind;
    use crate::mix::TransitionTechnique;
    use approx::assert_relative_eq;

    fn event(index: usize, start: f64, duration: f64, overlap: f64, technique: TransitionTechnique) -> TimelineEvent {
        TimelineEvent {
            track_index: index,
            mix_start_time: RenderSeconds(start),
            buffer_offset_start: RenderSeconds(1.0),
            buffer_offset_end: RenderSeconds(1.0 + duration),
            buffer_loop_start: RenderSeconds(duration - 7.0),
            buffer_loop_end: RenderSeconds(duration + 1.0),
            overlap_time: RenderSeconds(overlap),
            technique,
            gain: 0.9,
        }
    }

    fn timeline(technique: TransitionTechnique) -> MixTimeline {
        // 100s clip handing over 10s early
        MixTimeline {
            events: vec![
                event(0, 0.0, 100.0, 10.0, technique),
                event(1, 90.0, 80.0, 0.0, TransitionTechnique::Blend),
            ],
            total_duration: RenderSeconds(180.0),
        }
    }

    #[test]
    fn test_first_track_starts_at_gain() {
        let schedule = TransitionScheduler::new().schedule(&timeline(TransitionTechnique::LongBlend));
        let first = &schedule.tracks[0].automation[0];
        assert_eq!(first.param, Param::Gain);
        assert_eq!(first.time, RenderSeconds(0.0));
        assert_eq!(first.curve, CurveKind::Set);
        assert_relative_eq!(first.value, 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_incoming_reset_at_entry() {
        let schedule = TransitionScheduler::new().schedule(&timeline(TransitionTechnique::FilterSweep));
        let incoming = &schedule.tracks[1].automation;
        for param in Param::ALL {
            let reset = incoming
                .iter()
                .find(|p| p.param == param)
                .unwrap_or_else(|| panic!("no reset for {:?}", param));
            assert_eq!(reset.time, RenderSeconds(90.0));
        }
    }

    #[test]
    fn test_outgoing_window_ends_at_boundary() {
        let schedule = TransitionScheduler::new().schedule(&timeline(TransitionTechnique::BassSwap));
        let outgoing = &schedule.tracks[0].automation[1..];
        let min = outgoing.iter().map(|p| p.time.seconds()).fold(f64::MAX, f64::min);
        let max = outgoing.iter().map(|p| p.time.seconds()).fold(f64::MIN, f64::max);
        assert_eq!(min, 90.0);
        assert_eq!(max, 100.0);
    }

    #[test]
    fn test_loop_echo_adds_tail_clip() {
        let schedule = TransitionScheduler::new().schedule(&timeline(TransitionTechnique::LoopEcho));
        let clips = &schedule.tracks[0].clips;
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[1].start, RenderSeconds(100.0));
        assert_eq!(clips[1].duration, RenderSeconds(16.0));
        assert_eq!(
            clips[1].loop_region,
            Some((RenderSeconds(93.0), RenderSeconds(101.0)))
        );
    }

    #[test]
    fn test_drop_swap_tail_is_shorter() {
        let schedule = TransitionScheduler::new().schedule(&timeline(TransitionTechnique::DropSwap));
        assert_eq!(schedule.tracks[0].clips[1].duration, RenderSeconds(8.0));
    }

    #[test]
    fn test_degenerate_loop_skips_tail() {
        let mut timeline = timeline(TransitionTechnique::EchoOut);
        timeline.events[0].buffer_loop_end = timeline.events[0].buffer_loop_start;
        let schedule = TransitionScheduler::new().schedule(&timeline);
        assert_eq!(schedule.tracks[0].clips.len(), 1);
    }

    #[test]
    fn test_blend_has_no_tail() {
        let schedule = TransitionScheduler::new().schedule(&timeline(TransitionTechnique::Blend));
        assert!(schedule.tracks.iter().all(|t| t.clips.len() == 1));
        assert_eq!(schedule.total_duration, RenderSeconds(180.0));
    }
}
