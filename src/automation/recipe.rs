//! Automation recipes
//!
//! Each transition technique owns a recipe: a pure function from
//! `(direction, start, duration, gain)` to a list of control points. The
//! renderer applies control points generically, so adding a technique means
//! adding a recipe here and nothing else.

use crate::mix::TransitionTechnique;
use crate::model::RenderSeconds;
use serde::Serialize;

/// Lowest value an exponential ramp may target
pub const EXP_FLOOR: f64 = 0.001;
/// Low-shelf cut used by the bass swap
pub const BASS_KILL_DB: f64 = -40.0;
/// Fully open sweep filter
pub const OPEN_CUTOFF_HZ: f64 = 22_000.0;
pub const DEFAULT_Q: f64 = 0.707;

/// Automatable channel-strip parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Param {
    /// Linear channel gain
    Gain,
    /// Low-shelf gain in dB
    LowShelf,
    /// High-shelf gain in dB
    HighShelf,
    FilterCutoff,
    FilterQ,
    /// [`FilterMode`] encoded with [`FilterMode::value`]
    FilterMode,
    /// Delay-send level, 0-1
    Send,
}

impl Param {
    pub const ALL: [Param; 7] = [
        Param::Gain,
        Param::LowShelf,
        Param::HighShelf,
        Param::FilterCutoff,
        Param::FilterQ,
        Param::FilterMode,
        Param::Send,
    ];

    /// Value before any automation arrives
    pub fn default_value(&self) -> f64 {
        match self {
            Param::Gain => 1.0,
            Param::LowShelf | Param::HighShelf => 0.0,
            Param::FilterCutoff => OPEN_CUTOFF_HZ,
            Param::FilterQ => DEFAULT_Q,
            Param::FilterMode => FilterMode::Lowpass.value(),
            Param::Send => 0.0,
        }
    }
}

/// Response of the sweepable filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Lowpass,
    Highpass,
}

impl FilterMode {
    pub fn value(self) -> f64 {
        match self {
            FilterMode::Lowpass => 0.0,
            FilterMode::Highpass => 1.0,
        }
    }

    pub fn from_value(value: f64) -> Self {
        if value >= 0.5 {
            FilterMode::Highpass
        } else {
            FilterMode::Lowpass
        }
    }
}

/// How a parameter reaches a control point's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CurveKind {
    /// Jump at `time`
    Set,
    /// Straight line from the previous point
    Linear,
    /// Exponential from the previous point; both ends floored at [`EXP_FLOOR`]
    Exponential,
}

/// One automation instruction, in mix time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlPoint {
    pub param: Param,
    pub time: RenderSeconds,
    pub value: f64,
    pub curve: CurveKind,
}

impl ControlPoint {
    pub fn set(param: Param, time: f64, value: f64) -> Self {
        Self {
            param,
            time: RenderSeconds(time),
            value,
            curve: CurveKind::Set,
        }
    }

    pub fn linear(param: Param, time: f64, value: f64) -> Self {
        Self {
            param,
            time: RenderSeconds(time),
            value,
            curve: CurveKind::Linear,
        }
    }

    pub fn exponential(param: Param, time: f64, value: f64) -> Self {
        Self {
            param,
            time: RenderSeconds(time),
            value: value.max(EXP_FLOOR),
            curve: CurveKind::Exponential,
        }
    }
}

/// Which side of a boundary a recipe is shaping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Pure curve generator for one technique
pub type AutomationRecipe =
    fn(direction: Direction, start: RenderSeconds, duration: RenderSeconds, gain: f64) -> Vec<ControlPoint>;

/// Recipe registry
pub fn recipe_for(technique: TransitionTechnique) -> AutomationRecipe {
    match technique {
        TransitionTechnique::BassSwap => bass_swap,
        TransitionTechnique::LongBlend | TransitionTechnique::PhraseMixing => long_blend,
        TransitionTechnique::FilterSweep => filter_sweep,
        TransitionTechnique::EchoOut | TransitionTechnique::LoopEcho => echo_out,
        TransitionTechnique::DropSwap => drop_swap,
        TransitionTechnique::SlowEqBlend => slow_eq_blend,
        TransitionTechnique::HardCut | TransitionTechnique::Blend => crossfade,
    }
}

/// Linear gain ramp across the whole window
fn crossfade(
    direction: Direction,
    start: RenderSeconds,
    duration: RenderSeconds,
    gain: f64,
) -> Vec<ControlPoint> {
    let (s, e) = (start.seconds(), (start + duration).seconds());
    match direction {
        Direction::Outgoing => vec![
            ControlPoint::set(Param::Gain, s, gain),
            ControlPoint::linear(Param::Gain, e, 0.0),
        ],
        Direction::Incoming => vec![
            ControlPoint::set(Param::Gain, s, 0.0),
            ControlPoint::linear(Param::Gain, e, gain),
        ],
    }
}

fn bass_swap(
    direction: Direction,
    start: RenderSeconds,
    duration: RenderSeconds,
    gain: f64,
) -> Vec<ControlPoint> {
    let d = duration.seconds();
    let (s, e) = (start.seconds(), start.seconds() + d);
    let swap = s + d * 0.75;

    match direction {
        Direction::Outgoing => {
            let fade = (e - 1.0).max(s);
            vec![
                ControlPoint::set(Param::Gain, s, gain),
                ControlPoint::set(Param::LowShelf, s, 0.0),
                ControlPoint::set(Param::LowShelf, swap, BASS_KILL_DB),
                ControlPoint::set(Param::Gain, fade, gain),
                ControlPoint::linear(Param::Gain, e, 0.0),
            ]
        }
        // Held silent for the first quarter, in at full gain by the midpoint
        Direction::Incoming => vec![
            ControlPoint::set(Param::LowShelf, s, BASS_KILL_DB),
            ControlPoint::set(Param::Gain, s, 0.0),
            ControlPoint::set(Param::Gain, s + d * 0.25, 0.0),
            ControlPoint::linear(Param::Gain, s + d * 0.5, gain),
            ControlPoint::set(Param::LowShelf, swap, 0.0),
        ],
    }
}

/// Symmetric cross-ramp with a light shelf trim toward the tail
fn long_blend(
    direction: Direction,
    start: RenderSeconds,
    duration: RenderSeconds,
    gain: f64,
) -> Vec<ControlPoint> {
    let d = duration.seconds();
    let (s, e) = (start.seconds(), start.seconds() + d);
    let trim = s + d * 0.75;

    let mut points = crossfade(direction, start, duration, gain);
    match direction {
        Direction::Outgoing => points.extend([
            ControlPoint::set(Param::LowShelf, trim, 0.0),
            ControlPoint::linear(Param::LowShelf, e, -6.0),
            ControlPoint::set(Param::HighShelf, trim, 0.0),
            ControlPoint::linear(Param::HighShelf, e, -3.0),
        ]),
        Direction::Incoming => points.extend([
            ControlPoint::set(Param::LowShelf, s, -6.0),
            ControlPoint::set(Param::LowShelf, trim, -6.0),
            ControlPoint::linear(Param::LowShelf, e, 0.0),
        ]),
    }
    points
}

/// Resonant highpass swept up on the way out; incoming stays unfiltered
fn filter_sweep(
    direction: Direction,
    start: RenderSeconds,
    duration: RenderSeconds,
    gain: f64,
) -> Vec<ControlPoint> {
    let (s, e) = (start.seconds(), (start + duration).seconds());
    let mut points = crossfade(direction, start, duration, gain);
    if direction == Direction::Outgoing {
        points.extend([
            ControlPoint::set(Param::FilterMode, s, FilterMode::Highpass.value()),
            ControlPoint::set(Param::FilterQ, s, 5.0),
            ControlPoint::set(Param::FilterCutoff, s, 20.0),
            ControlPoint::exponential(Param::FilterCutoff, e, 8_000.0),
        ]);
    }
    points
}

/// Send to the delay over the last two seconds, then collapse the dry signal
fn echo_out(
    direction: Direction,
    start: RenderSeconds,
    duration: RenderSeconds,
    gain: f64,
) -> Vec<ControlPoint> {
    let d = duration.seconds();
    let (s, e) = (start.seconds(), start.seconds() + d);

    match direction {
        Direction::Outgoing => {
            let tail = (e - 2.0).max(s);
            vec![
                ControlPoint::set(Param::Gain, s, gain),
                ControlPoint::set(Param::Send, s, 0.0),
                ControlPoint::set(Param::Send, tail, 0.0),
                ControlPoint::linear(Param::Send, e, 1.0),
                ControlPoint::set(Param::Gain, tail, gain),
                ControlPoint::exponential(Param::Gain, e, EXP_FLOOR),
            ]
        }
        Direction::Incoming => vec![
            ControlPoint::set(Param::Gain, s, 0.0),
            ControlPoint::linear(Param::Gain, s + d.min(2.0), gain),
        ],
    }
}

/// Hold until 90% of the window, then a 0.1 s slam
fn drop_swap(
    direction: Direction,
    start: RenderSeconds,
    duration: RenderSeconds,
    gain: f64,
) -> Vec<ControlPoint> {
    let d = duration.seconds();
    let s = start.seconds();
    let cut = s + d * 0.9;
    let done = (cut + 0.1).min(s + d);

    let (from, to) = match direction {
        Direction::Outgoing => (gain, 0.0),
        Direction::Incoming => (0.0, gain),
    };
    vec![
        ControlPoint::set(Param::Gain, s, from),
        ControlPoint::set(Param::Gain, cut, from),
        ControlPoint::linear(Param::Gain, done, to),
    ]
}

/// Shelves pulled down across the window, gain over the second half
fn slow_eq_blend(
    direction: Direction,
    start: RenderSeconds,
    duration: RenderSeconds,
    gain: f64,
) -> Vec<ControlPoint> {
    let d = duration.seconds();
    let (s, e) = (start.seconds(), start.seconds() + d);
    let mid = s + d * 0.5;

    match direction {
        Direction::Outgoing => vec![
            ControlPoint::set(Param::LowShelf, s, 0.0),
            ControlPoint::linear(Param::LowShelf, e, -30.0),
            ControlPoint::set(Param::HighShelf, s, 0.0),
            ControlPoint::linear(Param::HighShelf, e, -12.0),
            ControlPoint::set(Param::Gain, mid, gain),
            ControlPoint::linear(Param::Gain, e, 0.0),
        ],
        Direction::Incoming => vec![
            ControlPoint::set(Param::LowShelf, s, -30.0),
            ControlPoint::linear(Param::LowShelf, e, 0.0),
            ControlPoint::set(Param::HighShelf, s, -12.0),
            ControlPoint::linear(Param::HighShelf, e, 0.0),
            ControlPoint::set(Param::Gain, s, 0.0),
            ControlPoint::linear(Param::Gain, mid, gain),
        ],
    }
}
