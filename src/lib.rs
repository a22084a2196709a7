pub mod alignment;
pub mod config;
pub mod corpus;
pub mod error;
pub mod pipeline;
pub mod types;

pub use alignment::audio_boundaries::detect_speech_segments;
pub use alignment::classify::{is_quran_like, summarize_alignment};
pub use alignment::matcher::match_transcript;
pub use alignment::normalize::normalize_arabic;
pub use alignment::sequence::{analyze_recitation, SequenceParams};
pub use alignment::timeline::build_ayah_timeline;
pub use config::{AlignerConfig, MatcherBackend, QuranLikePolicy, SummaryPolicy};
pub use corpus::{CorpusCache, VerseCorpus, VerseRecord};
pub use error::AlignmentError;
pub use pipeline::builder::RecitationAlignerBuilder;
pub use pipeline::runtime::RecitationAligner;
pub use pipeline::traits::{SimilarityScorer, SpeechDetector, Transcriber};
pub use types::{
    AlignmentResult, AudioAlignment, AudioInput, ErrorItem, ErrorKind, Label, Match,
    SequenceAnalysis, SequenceItem, SpeechSegment, Summary, TimelineItem, Verse,
};
