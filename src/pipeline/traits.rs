use crate::error::AlignmentError;
use crate::types::{AudioInput, SpeechSegment};

/// Similarity between a normalized transcript and a normalized verse, in [0, 1].
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, transcript_norm: &str, verse_norm: &str) -> f64;

    fn name(&self) -> &'static str;
}

/// Speech-to-text collaborator. An empty string means nothing was recognized.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &AudioInput) -> Result<String, AlignmentError>;
}

/// Voice-activity collaborator. May return no segments.
pub trait SpeechDetector: Send + Sync {
    fn detect(&self, audio: &AudioInput) -> Vec<SpeechSegment>;
}
