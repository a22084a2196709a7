use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use claxon::FlacReader;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tilawa_align::{
    summarize_alignment, AlignerConfig, AlignmentResult, AudioAlignment, AudioInput,
    MatcherBackend, RecitationAligner, RecitationAlignerBuilder, Summary,
};
use tracing_subscriber::EnvFilter;

#[path = "recitation_report/json_report_formatter.rs"]
mod json_report_formatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MatcherChoice {
    /// Best-window partial ratio (default)
    #[value(name = "partial_ratio")]
    PartialRatio,
    /// Whole-string sequence ratio
    #[value(name = "sequence_ratio")]
    SequenceRatio,
}

impl From<MatcherChoice> for MatcherBackend {
    fn from(choice: MatcherChoice) -> Self {
        match choice {
            MatcherChoice::PartialRatio => MatcherBackend::PartialRatio,
            MatcherChoice::SequenceRatio => MatcherBackend::SequenceRatio,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "recitation_report")]
#[command(about = "Align Qur'an recitation transcripts against the verse corpus")]
struct Args {
    /// JSON aligner config; flags below override its fields.
    #[arg(long, env = "TILAWA_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Verse corpus (JSON records, or `.txt` mushaf lines).
    #[arg(long, env = "TILAWA_CORPUS", global = true)]
    corpus: Option<PathBuf>,
    #[arg(long, env = "TILAWA_MATCHER", value_enum, global = true)]
    matcher: Option<MatcherChoice>,
    #[arg(long, env = "TILAWA_TOP_K", global = true, allow_negative_numbers = true)]
    top_k: Option<i64>,
    #[arg(long, env = "TILAWA_MAX_SPAN", global = true, allow_negative_numbers = true)]
    max_span: Option<i64>,
    #[arg(long, env = "TILAWA_SEQUENCE_ACCURACY_THRESHOLD", global = true)]
    sequence_accuracy_threshold: Option<f64>,
    #[arg(long, env = "TILAWA_SUMMARY_ACCURACY_THRESHOLD", global = true)]
    summary_accuracy_threshold: Option<f64>,
    #[arg(long, env = "TILAWA_SUMMARY_CONFIDENCE_THRESHOLD", global = true)]
    summary_confidence_threshold: Option<f64>,
    #[arg(long, env = "TILAWA_TIMELINE_MARGIN_S", global = true)]
    timeline_margin_s: Option<f64>,
    /// Report path; single-input commands print to stdout when unset.
    #[arg(long, env = "TILAWA_OUT", global = true)]
    out: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Align a transcript and summarize it
    Text {
        #[arg(long, conflicts_with = "transcript_file")]
        transcript: Option<String>,
        #[arg(long)]
        transcript_file: Option<PathBuf>,
    },
    /// Summarize an alignment JSON written by an earlier run
    Classify {
        alignment: PathBuf,
    },
    /// Align a FLAC recording given its upstream transcript
    Audio {
        audio: PathBuf,
        #[arg(long, conflicts_with = "transcript_file")]
        transcript: Option<String>,
        #[arg(long)]
        transcript_file: Option<PathBuf>,
    },
    /// Run every case of a JSONL case file
    Batch {
        cases: PathBuf,
        /// Base directory for relative `audio_path` entries.
        #[arg(long, env = "TILAWA_DATASET_ROOT", default_value = ".")]
        dataset_root: PathBuf,
        #[arg(long, env = "TILAWA_LIMIT")]
        limit: Option<usize>,
        #[arg(long, env = "TILAWA_OFFSET", default_value_t = 0)]
        offset: usize,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Case {
    id: String,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    audio_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct Meta {
    generated_at: String,
    version: &'static str,
    corpus_path: String,
    verse_count: usize,
    matcher: &'static str,
}

#[derive(Debug, Serialize)]
struct TextReport {
    meta: Meta,
    summary: Summary,
    alignment: AlignmentResult,
}

#[derive(Debug, Serialize)]
struct ClassifyReport {
    summary: Summary,
}

#[derive(Debug, Serialize)]
struct AudioReport {
    meta: Meta,
    audio_path: String,
    duration_s: f64,
    summary: Summary,
    alignment: AudioAlignment,
}

#[derive(Debug, Serialize)]
struct CaseReport {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    integrity_score: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    flags: Vec<String>,
    summary: Summary,
    alignment: AlignmentResult,
}

#[derive(Debug, Default, Serialize)]
struct BatchCounts {
    cases: usize,
    quran: usize,
    by_label: BTreeMap<&'static str, usize>,
    mean_recitation_accuracy: Option<f64>,
}

#[derive(Debug, Serialize)]
struct BatchReport {
    meta: Meta,
    counts: BatchCounts,
    cases: Vec<CaseReport>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    match &args.command {
        Command::Text {
            transcript,
            transcript_file,
        } => {
            let transcript = read_transcript(transcript.as_deref(), transcript_file.as_deref())?
                .ok_or_else(|| "text requires --transcript or --transcript-file.".to_string())?;
            let aligner = build_aligner(config)?;
            let alignment = aligner.align_text(&transcript);
            let report = TextReport {
                meta: build_meta(&aligner),
                summary: aligner.classify(&alignment),
                alignment,
            };
            emit(args.out.as_deref(), &report)
        }
        Command::Classify { alignment } => {
            let data = fs::read_to_string(alignment).map_err(|err| {
                format!("Failed to read alignment file '{}': {err}", alignment.display())
            })?;
            let parsed: AlignmentResult = serde_json::from_str(&data).map_err(|err| {
                format!("Failed to parse alignment JSON '{}': {err}", alignment.display())
            })?;
            let report = ClassifyReport {
                summary: summarize_alignment(&parsed, config.summary),
            };
            emit(args.out.as_deref(), &report)
        }
        Command::Audio {
            audio,
            transcript,
            transcript_file,
        } => {
            let transcript = read_transcript(transcript.as_deref(), transcript_file.as_deref())?;
            let aligner = build_aligner(config)?;
            let input = load_audio_input(audio, transcript)?;
            let duration_s = input.duration_sec();
            let alignment = aligner.align_audio(&input);
            let report = AudioReport {
                meta: build_meta(&aligner),
                audio_path: audio.display().to_string(),
                duration_s,
                summary: aligner.classify(&alignment.alignment),
                alignment,
            };
            emit(args.out.as_deref(), &report)
        }
        Command::Batch {
            cases,
            dataset_root,
            limit,
            offset,
        } => {
            let mut cases = load_cases(cases)?;
            if *offset > 0 {
                cases = cases.into_iter().skip(*offset).collect();
            }
            if let Some(limit) = limit {
                cases.truncate(*limit);
            }
            if cases.is_empty() {
                return Err("No cases selected after applying offset/limit.".to_string());
            }
            let aligner = build_aligner(config)?;
            let out_path = args.out.clone().unwrap_or_else(default_out_path);
            run_batch(&aligner, &cases, dataset_root, &out_path)
        }
    }
}

fn run_batch(
    aligner: &RecitationAligner,
    cases: &[Case],
    dataset_root: &Path,
    out_path: &Path,
) -> Result<(), String> {
    let progress = ProgressBar::new(cases.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    progress.set_message("starting...");

    let mut reports = Vec::with_capacity(cases.len());
    let mut lib_work_elapsed = Duration::ZERO;
    for case in cases {
        progress.set_message(case.id.clone());
        let report = match &case.audio_path {
            Some(audio_path) => {
                let input = load_audio_input(
                    &dataset_root.join(audio_path),
                    case.transcript.clone(),
                )?;
                let started = Instant::now();
                let out = aligner.align_audio(&input);
                lib_work_elapsed += started.elapsed();
                CaseReport {
                    id: case.id.clone(),
                    audio_path: Some(audio_path.clone()),
                    integrity_score: Some(out.integrity_score),
                    flags: out.flags,
                    summary: aligner.classify(&out.alignment),
                    alignment: out.alignment,
                }
            }
            None => {
                let transcript = case.transcript.as_deref().ok_or_else(|| {
                    format!("Case '{}' has neither transcript nor audio_path.", case.id)
                })?;
                let started = Instant::now();
                let alignment = aligner.align_text(transcript);
                lib_work_elapsed += started.elapsed();
                CaseReport {
                    id: case.id.clone(),
                    audio_path: None,
                    integrity_score: None,
                    flags: Vec::new(),
                    summary: aligner.classify(&alignment),
                    alignment,
                }
            }
        };
        reports.push(report);
        progress.inc(1);
    }
    progress.finish_with_message("alignment pass complete");

    let avg_case_ms = lib_work_elapsed.as_secs_f64() * 1000.0 / cases.len() as f64;
    println!(
        "lib_work_elapsed: {:.2}s ({}) avg_per_case: {:.2}ms",
        lib_work_elapsed.as_secs_f64(),
        format_duration_hms(lib_work_elapsed),
        avg_case_ms
    );

    let report = BatchReport {
        meta: build_meta(aligner),
        counts: count_cases(&reports),
        cases: reports,
    };
    json_report_formatter::write_report(out_path, &report)?;
    println!("report written to {}", out_path.display());
    Ok(())
}

fn count_cases(reports: &[CaseReport]) -> BatchCounts {
    let mut counts = BatchCounts {
        cases: reports.len(),
        ..BatchCounts::default()
    };
    let mut accuracies = Vec::new();
    for report in reports {
        if report.summary.is_quran {
            counts.quran += 1;
        }
        *counts.by_label.entry(report.summary.label.as_str()).or_default() += 1;
        if let Some(accuracy) = report.summary.recitation_accuracy {
            accuracies.push(accuracy);
        }
    }
    if !accuracies.is_empty() {
        counts.mean_recitation_accuracy =
            Some(accuracies.iter().sum::<f64>() / accuracies.len() as f64);
    }
    counts
}

fn resolve_config(args: &Args) -> Result<AlignerConfig, String> {
    let mut config = match &args.config {
        Some(path) => AlignerConfig::load(path).map_err(|err| err.to_string())?,
        None => AlignerConfig::default(),
    };
    if let Some(corpus) = &args.corpus {
        config.corpus_path = corpus.display().to_string();
    }
    if let Some(matcher) = args.matcher {
        config.matcher_backend = matcher.into();
    }
    if let Some(top_k) = args.top_k {
        config.match_top_k = top_k;
    }
    if let Some(max_span) = args.max_span {
        config.max_span = max_span;
    }
    if let Some(value) = args.sequence_accuracy_threshold {
        config.sequence_accuracy_threshold = value;
    }
    if let Some(value) = args.summary_accuracy_threshold {
        config.summary.accuracy_threshold = value;
    }
    if let Some(value) = args.summary_confidence_threshold {
        config.summary.confidence_threshold = value;
    }
    if let Some(value) = args.timeline_margin_s {
        config.timeline_margin_s = value;
    }
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}

fn build_aligner(config: AlignerConfig) -> Result<RecitationAligner, String> {
    RecitationAlignerBuilder::new(config)
        .build()
        .map_err(|err| format!("Failed to build recitation aligner: {err}"))
}

fn build_meta(aligner: &RecitationAligner) -> Meta {
    Meta {
        generated_at: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        corpus_path: aligner.config().corpus_path.clone(),
        verse_count: aligner.corpus().len(),
        matcher: aligner.scorer_name(),
    }
}

fn emit<T: Serialize>(out: Option<&Path>, report: &T) -> Result<(), String> {
    match out {
        Some(path) => json_report_formatter::write_report(path, report),
        None => json_report_formatter::print_report(report),
    }
}

fn default_out_path() -> PathBuf {
    let run_id = Utc::now().format("%Y%m%dT%H%M%SZ");
    PathBuf::from("target")
        .join("recitation_reports")
        .join(format!("recitation-report-{run_id}.json"))
}

fn read_transcript(inline: Option<&str>, file: Option<&Path>) -> Result<Option<String>, String> {
    if let Some(text) = inline {
        return Ok(Some(text.to_string()));
    }
    match file {
        Some(path) => fs::read_to_string(path)
            .map(Some)
            .map_err(|err| format!("Failed to read transcript '{}': {err}", path.display())),
        None => Ok(None),
    }
}

fn load_cases(path: &Path) -> Result<Vec<Case>, String> {
    let data = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read cases file '{}': {err}", path.display()))?;
    let mut cases = Vec::new();
    for (line_no, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let case: Case = serde_json::from_str(line).map_err(|err| {
            format!("Invalid case at {}:{}: {err}", path.display(), line_no + 1)
        })?;
        cases.push(case);
    }
    Ok(cases)
}

fn load_audio_input(path: &Path, transcript: Option<String>) -> Result<AudioInput, String> {
    require_path_exists(path, "Missing audio file.")?;
    let (sample_rate_hz, samples) = read_flac_mono(path)?;
    Ok(AudioInput {
        sample_rate_hz,
        samples,
        transcript,
    })
}

fn read_flac_mono(path: &Path) -> Result<(u32, Vec<f32>), String> {
    let mut reader = FlacReader::open(path)
        .map_err(|err| format!("Failed to decode FLAC '{}': {err}", path.display()))?;
    let streaminfo = reader.streaminfo();
    let channels = streaminfo.channels as usize;
    let bits_per_sample = streaminfo.bits_per_sample as i32;
    let scale = if bits_per_sample > 1 {
        ((1_i64 << (bits_per_sample - 1)) - 1) as f32
    } else {
        1.0
    };
    let sample_rate_hz = streaminfo.sample_rate;

    if channels == 0 {
        return Err(format!("FLAC has zero channels: {}", path.display()));
    }

    // Interleaved frames are downmixed by averaging.
    let mut mono = Vec::new();
    let mut frame_sum = 0.0f32;
    let mut frame_fill = 0usize;
    for sample in reader.samples() {
        let sample = sample
            .map_err(|err| format!("Failed reading sample from '{}': {err}", path.display()))?;
        frame_sum += sample as f32 / scale;
        frame_fill += 1;
        if frame_fill == channels {
            mono.push(frame_sum / channels as f32);
            frame_sum = 0.0;
            frame_fill = 0;
        }
    }
    Ok((sample_rate_hz, mono))
}

fn format_duration_hms(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

fn require_path_exists(path: &Path, message: &str) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    Err(format!("{message} Missing path: {}", path.display()))
}
