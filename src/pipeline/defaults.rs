use crate::alignment::audio_boundaries::{detect_speech_segments, DEFAULT_FRAME_MS, DEFAULT_TOP_DB};
use crate::alignment::similarity::{partial_ratio, sequence_ratio};
use crate::config::MatcherBackend;
use crate::error::AlignmentError;
use crate::pipeline::traits::{SimilarityScorer, SpeechDetector, Transcriber};
use crate::types::{AudioInput, SpeechSegment};

pub struct PartialRatioScorer;

impl SimilarityScorer for PartialRatioScorer {
    fn score(&self, transcript_norm: &str, verse_norm: &str) -> f64 {
        partial_ratio(transcript_norm, verse_norm)
    }

    fn name(&self) -> &'static str {
        "partial_ratio"
    }
}

pub struct SequenceRatioScorer;

impl SimilarityScorer for SequenceRatioScorer {
    fn score(&self, transcript_norm: &str, verse_norm: &str) -> f64 {
        sequence_ratio(transcript_norm, verse_norm)
    }

    fn name(&self) -> &'static str {
        "sequence_ratio"
    }
}

pub fn scorer_for(backend: MatcherBackend) -> Box<dyn SimilarityScorer> {
    match backend {
        MatcherBackend::PartialRatio => Box::new(PartialRatioScorer),
        MatcherBackend::SequenceRatio => Box::new(SequenceRatioScorer),
    }
}

pub struct EnergySpeechDetector {
    pub frame_ms: f64,
    pub top_db: f32,
}

impl Default for EnergySpeechDetector {
    fn default() -> Self {
        Self {
            frame_ms: DEFAULT_FRAME_MS,
            top_db: DEFAULT_TOP_DB,
        }
    }
}

impl SpeechDetector for EnergySpeechDetector {
    fn detect(&self, audio: &AudioInput) -> Vec<SpeechSegment> {
        detect_speech_segments(&audio.samples, audio.sample_rate_hz, self.frame_ms, self.top_db)
    }
}

/// Used when no speech-to-text engine is wired in. Audio without an upstream
/// transcript then aligns to nothing.
pub struct NoTranscriber;

impl Transcriber for NoTranscriber {
    fn transcribe(&self, _audio: &AudioInput) -> Result<String, AlignmentError> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scorer_for_resolves_backend() {
        assert_eq!(scorer_for(MatcherBackend::PartialRatio).name(), "partial_ratio");
        assert_eq!(scorer_for(MatcherBackend::SequenceRatio).name(), "sequence_ratio");
    }

    #[test]
    fn scorers_delegate_to_similarity() {
        let a = "الله الصمد";
        let b = "قل هو الله احد الله الصمد";
        assert_eq!(PartialRatioScorer.score(a, b), partial_ratio(a, b));
        assert_eq!(SequenceRatioScorer.score(a, b), sequence_ratio(a, b));
    }

    #[test]
    fn backends_agree_on_identical_text() {
        let text = "الحمد لله رب العالمين";
        assert_eq!(PartialRatioScorer.score(text, text), 1.0);
        assert_eq!(SequenceRatioScorer.score(text, text), 1.0);
    }

    #[test]
    fn energy_detector_uses_audio_input() {
        let audio = AudioInput {
            sample_rate_hz: 1_000,
            samples: vec![0.5; 400],
            transcript: None,
        };
        let segments = EnergySpeechDetector::default().detect(&audio);
        assert_eq!(segments.len(), 1);
        assert!((segments[0].end - 0.4).abs() < 1e-9);
    }

    #[test]
    fn no_transcriber_returns_empty_text() {
        let text = NoTranscriber.transcribe(&AudioInput::default()).unwrap();
        assert!(text.is_empty());
    }
}
