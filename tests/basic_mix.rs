use beatmix::analysis::AnalysisStatus;
use beatmix::mix::TransitionTechnique;
use beatmix::{AnalysisContext, MixConfiguration, MixError, MixPipeline, MixStyle, TrackInput};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 44100;

/// Write a stereo click track: a short 1 kHz blip on every beat
fn write_click_track(path: &Path, bpm: f64, seconds: f64) {
    let spec = WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();

    let len = (seconds * SAMPLE_RATE as f64) as usize;
    let beat = (60.0 / bpm * SAMPLE_RATE as f64) as usize;
    for i in 0..len {
        let pos = i % beat;
        let sample = if pos < 400 {
            let phase = 2.0 * std::f64::consts::PI * 1000.0 * pos as f64 / SAMPLE_RATE as f64;
            0.8 * phase.sin() * (1.0 - pos as f64 / 400.0)
        } else {
            0.0
        };
        let value = (sample * 32767.0) as i16;
        writer.write_sample(value).unwrap();
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
}

fn setup_tracks(dir: &TempDir) -> Vec<PathBuf> {
    let a = dir.path().join("a_120.wav");
    let b = dir.path().join("b_130.wav");
    write_click_track(&a, 120.0, 30.0);
    write_click_track(&b, 130.0, 30.0);
    vec![a, b]
}

fn pipeline(context: &AnalysisContext, style: MixStyle) -> MixPipeline<'_> {
    MixPipeline::new(MixConfiguration::new(style), context)
        .with_seed(7)
        .with_parallelism(2)
}

#[test]
fn test_two_track_mix() {
    let dir = TempDir::new().unwrap();
    let inputs = setup_tracks(&dir).into_iter().map(TrackInput::File).collect();

    let context = AnalysisContext::reduced();
    let output = pipeline(&context, MixStyle::Carola).mix(inputs).unwrap();

    // Canonical header, whole frames of 16-bit stereo
    assert_eq!(&output.wav[0..4], b"RIFF");
    assert_eq!(&output.wav[8..12], b"WAVE");
    assert_eq!((output.wav.len() - 44) % 4, 0);
    assert!(output.wav.len() > 44 + 10 * 44100 * 4);

    assert_eq!(output.tracks.len(), 2);
    for report in &output.tracks {
        assert_eq!(report.status, AnalysisStatus::Ready, "{}", report.name);
        let bpm = report.bpm.unwrap();
        assert!((60.0..=160.0).contains(&bpm), "{} bpm {}", report.name, bpm);
    }

    assert_eq!(output.transitions.len(), 1);
    assert!(matches!(
        output.transitions[0].technique,
        TransitionTechnique::LongBlend | TransitionTechnique::BassSwap | TransitionTechnique::SlowEqBlend
    ));
    assert!(output.transitions[0].time.seconds() >= 0.0);
}

#[test]
fn test_seeded_mix_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let paths = setup_tracks(&dir);
    let context = AnalysisContext::reduced();

    let run = || {
        let inputs = paths.iter().cloned().map(TrackInput::File).collect();
        pipeline(&context, MixStyle::Hawtin).mix(inputs).unwrap()
    };
    let first = run();
    let second = run();

    assert_eq!(first.transitions, second.transitions);
    assert_eq!(first.wav, second.wav);
}

#[test]
fn test_bad_track_is_isolated() {
    let dir = TempDir::new().unwrap();
    let mut paths = setup_tracks(&dir);
    let broken = dir.path().join("broken.wav");
    fs::write(&broken, b"not really a wav file").unwrap();
    paths.insert(1, broken);

    let context = AnalysisContext::reduced();
    let inputs = paths.into_iter().map(TrackInput::File).collect();
    let output = pipeline(&context, MixStyle::Cox).mix(inputs).unwrap();

    let statuses: Vec<AnalysisStatus> = output.tracks.iter().map(|t| t.status).collect();
    assert_eq!(
        statuses,
        vec![AnalysisStatus::Ready, AnalysisStatus::Error, AnalysisStatus::Ready]
    );
    assert!(output.tracks[1].message.is_some());
    assert_eq!(output.transitions.len(), 1);
}

#[test]
fn test_all_tracks_fail() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.wav");
    let b = dir.path().join("b.mp3");
    fs::write(&a, b"garbage").unwrap();
    fs::write(&b, vec![0u8; 1024]).unwrap();

    let context = AnalysisContext::reduced();
    let inputs = vec![TrackInput::File(a), TrackInput::File(b)];
    let result = pipeline(&context, MixStyle::Tiesto).mix(inputs);

    assert!(matches!(result, Err(MixError::NoValidTracks)));
}

#[test]
fn test_mix_from_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("single.wav");
    write_click_track(&path, 125.0, 12.0);

    let context = AnalysisContext::reduced();
    let inputs = vec![TrackInput::Bytes {
        name: "single".to_string(),
        data: fs::read(&path).unwrap(),
        extension: Some("wav".to_string()),
    }];
    let output = pipeline(&context, MixStyle::Dixon).mix(inputs).unwrap();

    assert!(output.transitions.is_empty());
    assert_eq!(output.tracks[0].status, AnalysisStatus::Ready);
    // Single track plays out in full plus the safety tail
    let frames = (output.wav.len() - 44) / 4;
    assert!(frames as f64 / 44100.0 >= 20.0);
}

#[test]
fn test_report_serializes() {
    let dir = TempDir::new().unwrap();
    let inputs = setup_tracks(&dir).into_iter().map(TrackInput::File).collect();
    let context = AnalysisContext::reduced();
    let output = pipeline(&context, MixStyle::Garnier).mix(inputs).unwrap();

    let json = serde_json::to_value(&output).unwrap();
    assert!(json.get("wav").is_none());
    assert_eq!(json["tracks"].as_array().unwrap().len(), 2);
    assert_eq!(json["transitions"].as_array().unwrap().len(), 1);
}
