use serde::{Deserialize, Serialize};

/// One verse of the corpus. Identity is `(surah, ayah)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verse {
    pub surah: u32,
    pub ayah: u32,
    pub text_raw: String,
    /// Normalized once at load time and never recomputed per query.
    pub text_norm: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub surah: u32,
    pub ayah: u32,
    /// Similarity against the transcript in [0, 1].
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceItem {
    pub surah: u32,
    pub ayah: u32,
    pub confidence: f64,
    /// Fraction of verse words present in the transcript.
    pub accuracy: f64,
    pub error_flag: bool,
    pub missing_words: Vec<String>,
    pub extra_words: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingWords,
    LowAccuracy,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingWords => "missing_words",
            Self::LowAccuracy => "low_accuracy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorItem {
    pub surah: u32,
    pub ayah: u32,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub surah: u32,
    pub ayah: u32,
    /// Seconds from the start of the audio.
    pub start: f64,
    pub end: f64,
}

/// Interval of vocal activity, in seconds. `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechSegment {
    pub start: f64,
    pub end: f64,
}

impl SpeechSegment {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Output of the sequence analyzer, before matches and verdicts are attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceAnalysis {
    pub surah: Option<u32>,
    pub sequence: Vec<SequenceItem>,
    pub global_accuracy: Option<f64>,
    pub errors: Vec<ErrorItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub transcript: String,
    pub matches: Vec<Match>,
    pub sequence: Vec<SequenceItem>,
    pub global_accuracy: Option<f64>,
    pub errors: Vec<ErrorItem>,
    /// `None` when no alignment was attempted.
    pub is_quran_like: Option<bool>,
    #[serde(default)]
    pub timeline: Vec<TimelineItem>,
}

impl AlignmentResult {
    pub fn empty(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            ..Self::default()
        }
    }
}

/// Audio alignment as handed to players and moderation clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioAlignment {
    /// Best match only, or empty.
    pub verses: Vec<Match>,
    /// Best confidence clamped to [0, 1], as a truncated percentage.
    pub integrity_score: u32,
    pub flags: Vec<String>,
    #[serde(flatten)]
    pub alignment: AlignmentResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    NotQuran,
    QuranGood,
    QuranWithErrors,
    QuranUncertain,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotQuran => "not_quran",
            Self::QuranGood => "quran_good",
            Self::QuranWithErrors => "quran_with_errors",
            Self::QuranUncertain => "quran_uncertain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub is_quran: bool,
    pub label: Label,
    pub quran_confidence: f64,
    pub main_surah: Option<u32>,
    pub ayah_start: Option<u32>,
    pub ayah_end: Option<u32>,
    pub recitation_accuracy: Option<f64>,
    pub issues_count: usize,
    pub issues: Vec<ErrorItem>,
}

/// Mono PCM handed over by the audio collaborator.
#[derive(Debug, Clone, Default)]
pub struct AudioInput {
    pub sample_rate_hz: u32,
    pub samples: Vec<f32>,
    /// Transcript produced upstream; skips the transcriber when present.
    pub transcript: Option<String>,
}

impl AudioInput {
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }
}
