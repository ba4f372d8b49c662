//! Musical key representation and Camelot wheel mapping

use serde::{Deserialize, Serialize};

/// Key used when nothing better is known
pub const DEFAULT_CAMELOT: &str = "8A";

/// Pitch class names, sharps only
const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Camelot codes for major keys, indexed by pitch class (C = 0)
const MAJOR_CAMELOT: [&str; 12] = [
    "8B", "3B", "10B", "5B", "12B", "7B", "2B", "9B", "4B", "11B", "6B", "1B",
];

/// Camelot codes for minor keys, indexed by pitch class (C = 0)
const MINOR_CAMELOT: [&str; 12] = [
    "5A", "12A", "7A", "2A", "9A", "4A", "11A", "6A", "1A", "8A", "3A", "10A",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    Major,
    Minor,
}

impl Scale {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "major" | "maj" => Some(Scale::Major),
            "minor" | "min" => Some(Scale::Minor),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scale::Major => "major",
            Scale::Minor => "minor",
        }
    }
}

/// Musical key as pitch class + scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicalKey {
    /// 0 = C, 1 = C#/Db, ... 11 = B
    pub pitch_class: u8,
    pub scale: Scale,
}

impl MusicalKey {
    /// Build from a pitch class name ("C", "F#", "Bb") and a scale name
    pub fn from_parts(tonic: &str, scale: &str) -> Option<Self> {
        Some(Self {
            pitch_class: pitch_class(tonic)?,
            scale: Scale::parse(scale)?,
        })
    }

    /// Parse a combined key name such as "F# minor", "Am" or "Eb"
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        let (tonic, scale) = if let Some((tonic, scale)) = lower.split_once(' ') {
            (tonic.to_string(), Scale::parse(scale)?)
        } else if let Some(tonic) = lower.strip_suffix("min") {
            (tonic.to_string(), Scale::Minor)
        } else if let Some(tonic) = lower.strip_suffix("maj") {
            (tonic.to_string(), Scale::Major)
        } else if lower.len() > 1 && lower.ends_with('m') {
            (lower[..lower.len() - 1].to_string(), Scale::Minor)
        } else {
            (lower, Scale::Major)
        };

        Some(Self {
            pitch_class: pitch_class(&tonic)?,
            scale,
        })
    }

    /// Tonic name with sharps, e.g. "F#"
    pub fn tonic(&self) -> &'static str {
        PITCH_NAMES[(self.pitch_class % 12) as usize]
    }

    /// Camelot wheel code, e.g. "8A"
    pub fn camelot(&self) -> &'static str {
        let idx = (self.pitch_class % 12) as usize;
        match self.scale {
            Scale::Major => MAJOR_CAMELOT[idx],
            Scale::Minor => MINOR_CAMELOT[idx],
        }
    }
}

/// Map a key + scale pair to Camelot, falling back to the raw key string
pub fn to_camelot(key: &str, scale: &str) -> String {
    match MusicalKey::from_parts(key, scale) {
        Some(k) => k.camelot().to_string(),
        None => key.to_string(),
    }
}

fn pitch_class(name: &str) -> Option<u8> {
    let lower = name.trim().to_lowercase();
    let mut chars = lower.chars();
    let base = match chars.next()? {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };
    let accidental: i8 = match chars.as_str() {
        "" => 0,
        "#" | "♯" | "s" => 1,
        "b" | "♭" => -1,
        _ => return None,
    };
    Some(((base + accidental).rem_euclid(12)) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camelot_tables() {
        assert_eq!(to_camelot("C", "major"), "8B");
        assert_eq!(to_camelot("A", "minor"), "8A");
        assert_eq!(to_camelot("F#", "minor"), "11A");
        assert_eq!(to_camelot("Gb", "major"), "2B");
        assert_eq!(to_camelot("B", "major"), "1B");
        assert_eq!(to_camelot("G#", "minor"), "1A");
        assert_eq!(to_camelot("Eb", "minor"), "2A");
    }

    #[test]
    fn test_unmapped_key_passes_through() {
        assert_eq!(to_camelot("H", "major"), "H");
        assert_eq!(to_camelot("C", "dorian"), "C");
    }

    #[test]
    fn test_parse_combined_names() {
        let k = MusicalKey::parse("F# minor").unwrap();
        assert_eq!(k.camelot(), "11A");
        assert_eq!(k.tonic(), "F#");
        assert_eq!(MusicalKey::parse("Bbm").unwrap().tonic(), "A#");
        assert_eq!(MusicalKey::parse("Am").unwrap().camelot(), "8A");
        assert_eq!(MusicalKey::parse("Db").unwrap().camelot(), "3B");
        assert_eq!(MusicalKey::parse("cmaj").unwrap().camelot(), "8B");
        assert_eq!(MusicalKey::parse("B").unwrap().scale, Scale::Major);
        assert!(MusicalKey::parse("xyz").is_none());
    }

    #[test]
    fn test_every_wheel_position_once_per_scale() {
        let mut major: Vec<&str> = MAJOR_CAMELOT.to_vec();
        major.sort();
        major.dedup();
        assert_eq!(major.len(), 12);
        let mut minor: Vec<&str> = MINOR_CAMELOT.to_vec();
        minor.sort();
        minor.dedup();
        assert_eq!(minor.len(), 12);
    }
}
