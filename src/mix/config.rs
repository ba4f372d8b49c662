//! Mix configuration

use crate::analysis::BEATS_PER_BAR;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tempo every track is stretched to
pub const DEFAULT_TARGET_BPM: f64 = 125.0;
/// Overlap length of the default blend
pub const DEFAULT_TRANSITION_BARS: u32 = 32;

/// DJ archetype that decides which transitions get picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MixStyle {
    /// Long, hypnotic blends and bass swaps
    Carola,
    /// Minimal: loops, echoes and filter work
    Hawtin,
    /// Fast and punchy, three-deck energy
    Cox,
    /// Endless blends where tracks dissolve into each other
    Villalobos,
    /// Phrase-aligned melodic house
    Dixon,
    /// Eclectic, everything goes
    Garnier,
    /// Big-room drops and builds
    Tiesto,
}

impl MixStyle {
    pub const ALL: [MixStyle; 7] = [
        MixStyle::Carola,
        MixStyle::Hawtin,
        MixStyle::Cox,
        MixStyle::Villalobos,
        MixStyle::Dixon,
        MixStyle::Garnier,
        MixStyle::Tiesto,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MixStyle::Carola => "Carola",
            MixStyle::Hawtin => "Hawtin",
            MixStyle::Cox => "Cox",
            MixStyle::Villalobos => "Villalobos",
            MixStyle::Dixon => "Dixon",
            MixStyle::Garnier => "Garnier",
            MixStyle::Tiesto => "Tiesto",
        }
    }
}

impl fmt::Display for MixStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MixStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MixStyle::ALL
            .iter()
            .copied()
            .find(|style| style.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = MixStyle::ALL.iter().map(|s| s.name()).collect();
                format!("Unknown style '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Configuration for one mix request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixConfiguration {
    pub style: MixStyle,

    /// Tempo every track is stretched to
    pub target_bpm: f64,

    /// Overlap of the default blend, and of techniques without a fixed length
    pub transition_length_bars: u32,
}

impl MixConfiguration {
    pub fn new(style: MixStyle) -> Self {
        Self {
            style,
            target_bpm: DEFAULT_TARGET_BPM,
            transition_length_bars: DEFAULT_TRANSITION_BARS,
        }
    }

    pub fn with_target_bpm(mut self, bpm: f64) -> Self {
        self.target_bpm = bpm;
        self
    }

    pub fn with_transition_bars(mut self, bars: u32) -> Self {
        self.transition_length_bars = bars;
        self
    }

    /// Seconds per bar at the target tempo
    pub fn bar_seconds(&self) -> f64 {
        BEATS_PER_BAR as f64 * 60.0 / self.target_bpm
    }
}

impl Default for MixConfiguration {
    fn default() -> Self {
        Self::new(MixStyle::Carola)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse_case_insensitive() {
        assert_eq!("carola".parse::<MixStyle>().unwrap(), MixStyle::Carola);
        assert_eq!(" TIESTO ".parse::<MixStyle>().unwrap(), MixStyle::Tiesto);
        assert!("nobody".parse::<MixStyle>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = MixConfiguration::new(MixStyle::Hawtin);
        assert_eq!(config.target_bpm, 125.0);
        assert_eq!(config.transition_length_bars, 32);
        assert!((config.bar_seconds() - 1.92).abs() < 1e-12);
    }
}
