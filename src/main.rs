use anyhow::{bail, Context, Result};
use beatmix::{AnalysisContext, MixConfiguration, MixPipeline, MixStyle, TrackInput};
use clap::Parser;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Extensions picked up when an input is a directory
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac"];

#[derive(Parser, Debug)]
#[command(name = "beatmix")]
#[command(about = "Render a tempo-locked DJ mix from a list of tracks", long_about = None)]
struct Args {
    /// Audio files or directories, mixed in the order given
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output WAV file
    #[arg(short = 'o', long, default_value = "mix.wav")]
    output: PathBuf,

    /// DJ style (Carola, Hawtin, Cox, Villalobos, Dixon, Garnier, Tiesto)
    #[arg(short = 's', long, default_value = "Carola")]
    style: MixStyle,

    /// Target tempo every track is stretched to
    #[arg(long, default_value = "125")]
    bpm: f64,

    /// Transition length in bars for the default blend
    #[arg(long, default_value = "32")]
    bars: u32,

    /// Seed for transition selection (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of tracks analyzed in parallel (default: all cores)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Write a JSON report of tracks and transitions
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::info!("Beatmix - {} style", args.style);
    log::info!("===========================================");

    if !(args.bpm.is_finite() && args.bpm > 0.0) {
        bail!("Target BPM must be positive, got {}", args.bpm);
    }

    let inputs = collect_inputs(&args.inputs)?;
    if inputs.is_empty() {
        bail!("No audio files found in the given inputs");
    }
    log::info!("Found {} tracks", inputs.len());

    let config = MixConfiguration::new(args.style)
        .with_target_bpm(args.bpm)
        .with_transition_bars(args.bars);

    let context = AnalysisContext::new();
    let mut pipeline = MixPipeline::new(config, &context);
    if let Some(seed) = args.seed {
        pipeline = pipeline.with_seed(seed);
    }
    if let Some(jobs) = args.jobs {
        pipeline = pipeline.with_parallelism(jobs);
    }

    let output = pipeline.mix(inputs).context("Mix failed")?;

    std::fs::write(&args.output, &output.wav)
        .with_context(|| format!("Failed to write mix: {:?}", args.output))?;

    for transition in &output.transitions {
        log::info!(
            "{:>8.1}s  {}",
            transition.time.seconds(),
            transition.technique
        );
    }

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize report")?;
        std::fs::write(report_path, json)
            .with_context(|| format!("Failed to write report: {:?}", report_path))?;
        log::info!("Report written to: {:?}", report_path);
    }

    log::info!("Mix written to: {:?} ({} bytes)", args.output, output.wav.len());
    Ok(())
}

/// Expand `~`, walk directories, keep input order
fn collect_inputs(raw: &[String]) -> Result<Vec<TrackInput>> {
    let mut inputs = Vec::new();

    for entry in raw {
        let path = PathBuf::from(shellexpand::tilde(entry).as_ref());

        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(&path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_audio(p))
                .collect();
            found.sort();
            log::debug!("{:?}: {} audio files", path, found.len());
            inputs.extend(found.into_iter().map(TrackInput::File));
        } else if path.is_file() {
            inputs.push(TrackInput::File(path));
        } else {
            bail!("Input not found: {:?}", path);
        }
    }

    Ok(inputs)
}

fn is_audio(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
