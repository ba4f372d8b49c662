use super::time::{RenderSeconds, SourceSeconds};

/// Fixed output rate of the render engine
pub const RENDER_SAMPLE_RATE: u32 = 44100;
/// Fixed output channel count of the render engine
pub const RENDER_CHANNELS: usize = 2;

/// Planar f32 audio, one `Vec` per channel
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Silent buffer with `frames` samples per channel
    pub fn silent(sample_rate: u32, channel_count: usize, frames: usize) -> Self {
        Self {
            sample_rate,
            channels: vec![vec![0.0; frames]; channel_count],
        }
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Length of a buffer that is already on the mix timeline
    pub fn duration(&self) -> RenderSeconds {
        RenderSeconds(self.seconds())
    }

    /// Length of a decoded, unstretched source
    pub fn source_duration(&self) -> SourceSeconds {
        SourceSeconds(self.seconds())
    }

    /// Average all channels into one
    pub fn to_mono(&self) -> Vec<f32> {
        let count = self.channel_count();
        if count == 0 {
            return Vec::new();
        }
        if count == 1 {
            return self.channels[0].clone();
        }
        (0..self.len())
            .map(|i| self.channels.iter().map(|ch| ch[i]).sum::<f32>() / count as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_averages_channels() {
        let buf = AudioBuffer::new(44100, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(buf.to_mono(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_source_duration() {
        let buf = AudioBuffer::silent(48000, 2, 24000);
        assert!((buf.source_duration().seconds() - 0.5).abs() < 1e-12);
        assert_eq!(AudioBuffer::silent(0, 2, 10).source_duration(), SourceSeconds(0.0));
    }

    #[test]
    fn test_duration() {
        let buf = AudioBuffer::silent(44100, 2, 88200);
        assert!((buf.duration().seconds() - 2.0).abs() < 1e-12);
    }
}
