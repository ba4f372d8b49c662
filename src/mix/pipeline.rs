//! Main mix pipeline orchestration

use super::config::MixConfiguration;
use super::timeline::MixTimelineBuilder;
use crate::analysis::{AnalysisContext, AnalysisStatus, FeatureAnalyzer};
use crate::automation::TransitionScheduler;
use crate::decode::{decode_bytes, decode_file};
use crate::error::{MixError, Result};
use crate::model::AudioBuffer;
use crate::render::{RenderPipeline, Transition};
use crate::stretch::StretchedTrack;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

/// Where a track's audio comes from
#[derive(Debug, Clone)]
pub enum TrackInput {
    File(PathBuf),
    Bytes {
        name: String,
        data: Vec<u8>,
        /// Container hint such as `"mp3"`
        extension: Option<String>,
    },
}

impl TrackInput {
    pub fn name(&self) -> String {
        match self {
            TrackInput::File(path) => path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("Unknown")
                .to_string(),
            TrackInput::Bytes { name, .. } => name.clone(),
        }
    }

    fn decode(self) -> Result<AudioBuffer> {
        match self {
            TrackInput::File(path) => decode_file(&path),
            TrackInput::Bytes {
                name,
                data,
                extension,
            } => decode_bytes(&name, data, extension.as_deref()),
        }
    }
}

/// Terminal state of one input track
#[derive(Debug, Clone, Serialize)]
pub struct TrackReport {
    pub name: String,
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Result of a mix request
#[derive(Debug, Clone, Serialize)]
pub struct MixOutput {
    /// Encoded WAV file
    #[serde(skip)]
    pub wav: Vec<u8>,
    pub transitions: Vec<Transition>,
    /// One entry per input, in input order
    pub tracks: Vec<TrackReport>,
}

/// Main mix pipeline
pub struct MixPipeline<'a> {
    config: MixConfiguration,
    context: &'a AnalysisContext,
    seed: Option<u64>,
    parallelism: usize,
}

impl<'a> MixPipeline<'a> {
    /// Create a new mix pipeline
    pub fn new(config: MixConfiguration, context: &'a AnalysisContext) -> Self {
        Self {
            config,
            context,
            seed: None,
            parallelism: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }

    /// Fix the technique draws so a run can be replayed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of tracks prepared at once
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Run the complete mix process
    pub fn mix(&self, inputs: Vec<TrackInput>) -> Result<MixOutput> {
        log::info!(
            "Starting {} mix of {} tracks at {:.1} BPM",
            self.config.style,
            inputs.len(),
            self.config.target_bpm
        );
        log::info!("Analysis backend: {:?}", self.context.mode());

        // Step 1: Decode, analyze and stretch every track
        let (tracks, reports) = self.prepare_tracks(inputs)?;
        if tracks.is_empty() {
            return Err(MixError::NoValidTracks);
        }

        // Step 2: Place tracks on the timeline
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let timeline = MixTimelineBuilder::new(&self.config).build(&tracks, &mut rng);

        // Step 3: Automation for every boundary
        let schedule = TransitionScheduler::new().schedule(&timeline);

        // Step 4: Render and encode
        let buffers: Vec<&AudioBuffer> = tracks.iter().map(|t| &t.buffer).collect();
        let output = RenderPipeline::new().render(&schedule, &buffers)?;

        log::info!("Mix complete!");
        Ok(MixOutput {
            wav: output.wav,
            transitions: output.transitions,
            tracks: reports,
        })
    }

    /// Prepare tracks on a bounded pool; results keep input order
    fn prepare_tracks(
        &self,
        inputs: Vec<TrackInput>,
    ) -> Result<(Vec<StretchedTrack>, Vec<TrackReport>)> {
        let total = inputs.len();
        log::info!("Processing tracks with {} workers...", self.parallelism);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()
            .map_err(|e| MixError::ThreadPool(e.to_string()))?;

        let results: Vec<(TrackReport, Option<StretchedTrack>)> = pool.install(|| {
            inputs
                .into_par_iter()
                .enumerate()
                .map(|(index, input)| self.prepare_track(index, total, input))
                .collect()
        });

        let mut tracks = Vec::new();
        let mut reports = Vec::with_capacity(results.len());
        for (report, track) in results {
            tracks.extend(track);
            reports.push(report);
        }

        log::info!("Track processing complete: {}/{} ready", tracks.len(), total);
        Ok((tracks, reports))
    }

    fn prepare_track(
        &self,
        index: usize,
        total: usize,
        input: TrackInput,
    ) -> (TrackReport, Option<StretchedTrack>) {
        let name = input.name();
        log::info!("[{}/{}] Processing: {}", index + 1, total, name);

        let buffer = match input.decode() {
            Ok(buffer) => buffer,
            Err(e) => {
                log::warn!("{}", e);
                let report = TrackReport {
                    name,
                    status: AnalysisStatus::Error,
                    message: Some(e.to_string()),
                    bpm: None,
                    key: None,
                    confidence: None,
                };
                return (report, None);
            }
        };

        let analysis = FeatureAnalyzer::new(self.context).analyze(&buffer);
        log::info!(
            "[{}/{}] {}: {:.2} BPM, key {}, confidence {:.2}",
            index + 1,
            total,
            name,
            analysis.bpm,
            analysis.key,
            analysis.confidence
        );

        let report = TrackReport {
            name,
            status: analysis.status,
            message: None,
            bpm: Some(analysis.bpm),
            key: Some(analysis.key.clone()),
            confidence: Some(analysis.confidence),
        };
        let track = StretchedTrack::new(buffer, analysis, self.config.target_bpm);
        (report, Some(track))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_inputs_fail_is_no_valid_tracks() {
        let context = AnalysisContext::reduced();
        let pipeline = MixPipeline::new(MixConfiguration::default(), &context)
            .with_seed(1)
            .with_parallelism(2);

        let inputs = vec![
            TrackInput::Bytes {
                name: "garbage.mp3".to_string(),
                data: vec![0u8; 512],
                extension: Some("mp3".to_string()),
            },
            TrackInput::File(PathBuf::from("/nonexistent/track.flac")),
        ];

        assert!(matches!(pipeline.mix(inputs), Err(MixError::NoValidTracks)));
    }

    #[test]
    fn test_empty_request_is_no_valid_tracks() {
        let context = AnalysisContext::reduced();
        let pipeline = MixPipeline::new(MixConfiguration::default(), &context);
        assert!(matches!(pipeline.mix(Vec::new()), Err(MixError::NoValidTracks)));
    }

    #[test]
    fn test_parallelism_at_least_one() {
        let context = AnalysisContext::reduced();
        let pipeline = MixPipeline::new(MixConfiguration::default(), &context).with_parallelism(0);
        assert_eq!(pipeline.parallelism, 1);
    }

    #[test]
    fn test_input_names() {
        assert_eq!(TrackInput::File(PathBuf::from("/music/a.mp3")).name(), "a.mp3");
        let bytes = TrackInput::Bytes {
            name: "b".to_string(),
            data: vec![],
            extension: None,
        };
        assert_eq!(bytes.name(), "b");
    }
}
