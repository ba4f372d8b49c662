//! Automation lane with set / linear-ramp / exponential-ramp semantics
//!
//! A ramp point describes where a parameter arrives: it interpolates from the
//! previous point's time and value to its own. A set point jumps. Points at
//! the same time keep insertion order, so the last one wins.

use crate::automation::{ControlPoint, CurveKind, EXP_FLOOR};

#[derive(Debug, Clone, Copy, PartialEq)]
struct LanePoint {
    time: f64,
    value: f64,
    curve: CurveKind,
}

/// Timed values for one parameter
#[derive(Debug, Clone)]
pub struct AutomationLane {
    default: f64,
    points: Vec<LanePoint>,
}

impl AutomationLane {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            points: Vec::new(),
        }
    }

    /// Build a lane from control points in any order
    pub fn from_points<'a>(default: f64, points: impl IntoIterator<Item = &'a ControlPoint>) -> Self {
        let mut lane = Self::new(default);
        for p in points {
            lane.push(p.time.seconds(), p.value, p.curve);
        }
        lane.sort();
        lane
    }

    pub fn push(&mut self, time: f64, value: f64, curve: CurveKind) {
        self.points.push(LanePoint { time, value, curve });
    }

    /// Stable sort by time
    pub fn sort(&mut self) {
        self.points.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Value at `time` seconds
    pub fn value_at(&self, time: f64) -> f64 {
        let idx = self.points.partition_point(|p| p.time <= time);

        let (t0, v0) = match idx.checked_sub(1).map(|i| self.points[i]) {
            Some(prev) => (prev.time, prev.value),
            None => (0.0, self.default),
        };

        let Some(next) = self.points.get(idx) else {
            return v0;
        };

        let span = next.time - t0;
        if span <= 0.0 {
            return v0;
        }
        let frac = ((time - t0) / span).clamp(0.0, 1.0);

        match next.curve {
            CurveKind::Set => v0,
            CurveKind::Linear => v0 + (next.value - v0) * frac,
            CurveKind::Exponential => {
                let from = v0.max(EXP_FLOOR);
                let to = next.value.max(EXP_FLOOR);
                from * (to / from).powf(frac)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_before_any_point() {
        let mut lane = AutomationLane::new(0.5);
        lane.push(2.0, 1.0, CurveKind::Set);
        assert_eq!(lane.value_at(1.0), 0.5);
        assert_eq!(lane.value_at(2.0), 1.0);
        assert_eq!(lane.value_at(10.0), 1.0);
    }

    #[test]
    fn test_linear_ramp_from_previous_point() {
        let mut lane = AutomationLane::new(0.0);
        lane.push(1.0, 1.0, CurveKind::Set);
        lane.push(3.0, 0.0, CurveKind::Linear);
        assert_relative_eq!(lane.value_at(1.0), 1.0);
        assert_relative_eq!(lane.value_at(2.0), 0.5);
        assert_relative_eq!(lane.value_at(3.0), 0.0);
        assert_relative_eq!(lane.value_at(4.0), 0.0);
    }

    #[test]
    fn test_exponential_ramp() {
        let mut lane = AutomationLane::new(0.0);
        lane.push(0.0, 20.0, CurveKind::Set);
        lane.push(2.0, 8000.0, CurveKind::Exponential);
        assert_relative_eq!(lane.value_at(1.0), (20.0f64 * 8000.0).sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_exponential_from_zero_uses_floor() {
        let mut lane = AutomationLane::new(0.0);
        lane.push(0.0, 0.0, CurveKind::Set);
        lane.push(1.0, 1.0, CurveKind::Exponential);
        let v = lane.value_at(0.5);
        assert!(v.is_finite() && v > 0.0 && v < 1.0);
    }

    #[test]
    fn test_same_time_last_wins() {
        let mut lane = AutomationLane::new(1.0);
        lane.push(5.0, 0.0, CurveKind::Set);
        lane.push(5.0, 0.7, CurveKind::Set);
        lane.sort();
        assert_eq!(lane.value_at(5.0), 0.7);
    }

    #[test]
    fn test_ramp_without_previous_starts_at_zero_time() {
        let mut lane = AutomationLane::new(1.0);
        lane.push(4.0, 0.0, CurveKind::Linear);
        assert_relative_eq!(lane.value_at(2.0), 0.5);
    }
}
