// Offline render engine.
//
// Every scheduled track gets its own channel strip:
//   low shelf -> high shelf -> mid peak -> sweep filter -> gain / send
// Gains feed the master bus, sends feed a shared feedback delay whose wet
// output joins the master before the master gain and limiter.
//
// Processing runs in blocks of BLOCK_SIZE frames. Filter parameters are read
// once per block (control rate); gain and send are interpolated across the
// block (audio rate).

use super::param::AutomationLane;
use crate::automation::{ControlPoint, FilterMode, Param, ScheduledClip, ScheduledTrack};
use crate::dsp::{Biquad, BiquadKind, FeedbackDelay, Limiter};
use crate::model::{AudioBuffer, RenderSeconds, RENDER_CHANNELS};

pub const BLOCK_SIZE: usize = 128;

const LOW_SHELF_HZ: f64 = 250.0;
const HIGH_SHELF_HZ: f64 = 4_000.0;
const MID_HZ: f64 = 1_000.0;
const MID_Q: f64 = 1.0;

const DELAY_SECONDS: f64 = 0.36;
const DELAY_FEEDBACK: f32 = 0.5;
const DELAY_DAMPING_HZ: f64 = 1_000.0;

const MASTER_GAIN: f32 = 0.95;
const LIMITER_THRESHOLD_DB: f32 = -2.0;
const LIMITER_RATIO: f32 = 12.0;
const LIMITER_ATTACK: f32 = 0.003;
const LIMITER_RELEASE: f32 = 0.25;

/// Filter settings read at control rate
#[derive(Debug, Clone, Copy, PartialEq)]
struct FilterState {
    low_db: f64,
    high_db: f64,
    cutoff: f64,
    q: f64,
    mode: FilterMode,
}

impl FilterState {
    fn sweep_kind(&self) -> BiquadKind {
        match self.mode {
            FilterMode::Lowpass => BiquadKind::Lowpass { q: self.q },
            FilterMode::Highpass => BiquadKind::Highpass { q: self.q },
        }
    }
}

/// Per-channel filter chain
struct ChannelFilters {
    low: Biquad,
    high: Biquad,
    mid: Biquad,
    sweep: Biquad,
}

impl ChannelFilters {
    fn new(state: &FilterState, sample_rate: f64) -> Self {
        Self {
            low: Biquad::new(BiquadKind::LowShelf { gain_db: state.low_db }, LOW_SHELF_HZ, sample_rate),
            high: Biquad::new(BiquadKind::HighShelf { gain_db: state.high_db }, HIGH_SHELF_HZ, sample_rate),
            mid: Biquad::new(BiquadKind::Peaking { gain_db: 0.0, q: MID_Q }, MID_HZ, sample_rate),
            sweep: Biquad::new(state.sweep_kind(), state.cutoff, sample_rate),
        }
    }

    fn update(&mut self, old: &FilterState, new: &FilterState, sample_rate: f64) {
        if old.low_db != new.low_db {
            self.low.set(BiquadKind::LowShelf { gain_db: new.low_db }, LOW_SHELF_HZ, sample_rate);
        }
        if old.high_db != new.high_db {
            self.high.set(BiquadKind::HighShelf { gain_db: new.high_db }, HIGH_SHELF_HZ, sample_rate);
        }
        if old.cutoff != new.cutoff || old.q != new.q || old.mode != new.mode {
            self.sweep.set(new.sweep_kind(), new.cutoff, sample_rate);
        }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        let x = self.low.process_sample(x);
        let x = self.high.process_sample(x);
        let x = self.mid.process_sample(x);
        self.sweep.process_sample(x)
    }
}

/// Automation lanes for one strip
struct StripLanes {
    gain: AutomationLane,
    low: AutomationLane,
    high: AutomationLane,
    cutoff: AutomationLane,
    q: AutomationLane,
    mode: AutomationLane,
    send: AutomationLane,
}

impl StripLanes {
    fn new(points: &[ControlPoint]) -> Self {
        let lane = |param: Param| {
            AutomationLane::from_points(
                param.default_value(),
                points.iter().filter(|p| p.param == param),
            )
        };
        Self {
            gain: lane(Param::Gain),
            low: lane(Param::LowShelf),
            high: lane(Param::HighShelf),
            cutoff: lane(Param::FilterCutoff),
            q: lane(Param::FilterQ),
            mode: lane(Param::FilterMode),
            send: lane(Param::Send),
        }
    }

    fn filters_at(&self, t: f64) -> FilterState {
        FilterState {
            low_db: self.low.value_at(t),
            high_db: self.high.value_at(t),
            cutoff: self.cutoff.value_at(t),
            q: self.q.value_at(t),
            mode: FilterMode::from_value(self.mode.value_at(t)),
        }
    }
}

/// Accumulating offline renderer
pub struct RenderEngine {
    sample_rate: u32,
    master: Vec<Vec<f32>>,
    send: Vec<Vec<f32>>,
}

impl RenderEngine {
    pub fn new(sample_rate: u32, duration: RenderSeconds) -> Self {
        let frames = duration.to_samples(sample_rate);
        Self {
            sample_rate,
            master: vec![vec![0.0; frames]; RENDER_CHANNELS],
            send: vec![vec![0.0; frames]; RENDER_CHANNELS],
        }
    }

    /// Output length in frames
    pub fn frames(&self) -> usize {
        self.master.first().map_or(0, Vec::len)
    }

    /// Play every clip of `track` through a fresh strip into the buses
    pub fn add_track(&mut self, track: &ScheduledTrack, source: &AudioBuffer) {
        let frames = self.frames();
        let sr = self.sample_rate;

        let Some(first) = track.clips.iter().map(|c| c.start.to_samples(sr)).min() else {
            return;
        };
        let last = track
            .clips
            .iter()
            .map(|c| c.end().to_samples(sr))
            .max()
            .unwrap_or(first)
            .min(frames);
        if first >= last {
            return;
        }

        // Dry voice for the strip's active range
        let mut voice = vec![vec![0.0f32; last - first]; RENDER_CHANNELS];
        for clip in &track.clips {
            read_clip(clip, source, first, sr, &mut voice);
        }

        let lanes = StripLanes::new(&track.automation);
        let sr_f = sr as f64;
        let mut state = lanes.filters_at(first as f64 / sr_f);
        let mut filters: Vec<ChannelFilters> = (0..RENDER_CHANNELS)
            .map(|_| ChannelFilters::new(&state, sr_f))
            .collect();

        let mut block_start = first;
        while block_start < last {
            let block_end = (block_start + BLOCK_SIZE).min(last);
            let len = block_end - block_start;
            let t0 = block_start as f64 / sr_f;
            let t1 = block_end as f64 / sr_f;

            let next = lanes.filters_at(t0);
            if next != state {
                for f in filters.iter_mut() {
                    f.update(&state, &next, sr_f);
                }
                state = next;
            }

            let (g0, g1) = (lanes.gain.value_at(t0) as f32, lanes.gain.value_at(t1) as f32);
            let (s0, s1) = (lanes.send.value_at(t0) as f32, lanes.send.value_at(t1) as f32);

            for (ch, chain) in filters.iter_mut().enumerate() {
                let input = &voice[ch][block_start - first..block_end - first];
                let master = &mut self.master[ch][block_start..block_end];
                let send = &mut self.send[ch][block_start..block_end];

                for (i, &x) in input.iter().enumerate() {
                    let frac = i as f32 / len as f32;
                    let y = chain.process(x);
                    master[i] += y * (g0 + (g1 - g0) * frac);
                    send[i] += y * (s0 + (s1 - s0) * frac);
                }
            }

            block_start = block_end;
        }
    }

    /// Run the delay bus and master processing
    pub fn finish(self) -> AudioBuffer {
        let RenderEngine {
            sample_rate,
            mut master,
            mut send,
        } = self;

        let mut delay = FeedbackDelay::new(
            DELAY_SECONDS,
            DELAY_FEEDBACK,
            DELAY_DAMPING_HZ,
            RENDER_CHANNELS,
            sample_rate,
        );
        delay.process(&mut send);

        for (out, wet) in master.iter_mut().zip(&send) {
            for (o, &w) in out.iter_mut().zip(wet) {
                *o = (*o + w) * MASTER_GAIN;
            }
        }

        let mut limiter = Limiter::new(
            LIMITER_THRESHOLD_DB,
            LIMITER_RATIO,
            LIMITER_ATTACK,
            LIMITER_RELEASE,
            sample_rate,
        );
        limiter.process(&mut master);

        AudioBuffer::new(sample_rate, master)
    }
}

/// Mix one clip's source samples into `voice`, which starts at frame `origin`
fn read_clip(
    clip: &ScheduledClip,
    source: &AudioBuffer,
    origin: usize,
    sample_rate: u32,
    voice: &mut [Vec<f32>],
) {
    let start = clip.start.to_samples(sample_rate);
    let offset = clip.offset.to_samples(sample_rate);
    let length = clip.duration.to_samples(sample_rate);
    let source_len = source.len();
    if source.channel_count() == 0 || start < origin {
        return;
    }

    let loop_frames = clip.loop_region.map(|(ls, le)| {
        let ls = ls.to_samples(sample_rate);
        (ls, le.to_samples(sample_rate).min(source_len))
    });

    for (ch, out) in voice.iter_mut().enumerate() {
        // Mono sources feed both sides
        let input = &source.channels[ch % source.channel_count()];
        let dest = out.iter_mut().skip(start - origin).take(length);

        for (j, o) in dest.enumerate() {
            let mut pos = offset + j;
            if let Some((ls, le)) = loop_frames {
                if le > ls && pos >= le {
                    pos = ls + (pos - ls) % (le - ls);
                }
            }
            if pos >= source_len {
                break;
            }
            *o += input[pos];
        }
    }
}
