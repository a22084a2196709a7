use std::sync::Arc;

use crate::alignment::classify::{is_quran_like, summarize_alignment};
use crate::alignment::matcher::match_normalized;
use crate::alignment::normalize::normalize_arabic;
use crate::alignment::sequence::{analyze_with_matches, SequenceParams, ANCHOR_CANDIDATES};
use crate::alignment::timeline::build_ayah_timeline;
use crate::config::{AlignerConfig, SummaryPolicy};
use crate::corpus::VerseCorpus;
use crate::pipeline::traits::{SimilarityScorer, SpeechDetector, Transcriber};
use crate::types::{AlignmentResult, AudioAlignment, AudioInput, Summary};

pub const NON_QURAN_LIKE_FLAG: &str = "non_quran_like";

pub struct RecitationAligner {
    corpus: Arc<VerseCorpus>,
    config: AlignerConfig,
    scorer: Box<dyn SimilarityScorer>,
    transcriber: Box<dyn Transcriber>,
    speech_detector: Box<dyn SpeechDetector>,
}

pub(crate) struct RecitationAlignerParts {
    pub corpus: Arc<VerseCorpus>,
    pub config: AlignerConfig,
    pub scorer: Box<dyn SimilarityScorer>,
    pub transcriber: Box<dyn Transcriber>,
    pub speech_detector: Box<dyn SpeechDetector>,
}

impl RecitationAligner {
    pub(crate) fn from_parts(parts: RecitationAlignerParts) -> Self {
        Self {
            corpus: parts.corpus,
            config: parts.config,
            scorer: parts.scorer,
            transcriber: parts.transcriber,
            speech_detector: parts.speech_detector,
        }
    }

    pub fn corpus(&self) -> &VerseCorpus {
        &self.corpus
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Matches, sequence analysis and the Qur'an-like flag for a transcript.
    /// Unusable input yields an empty result, never an error.
    pub fn align_text(&self, transcript: &str) -> AlignmentResult {
        let transcript_norm = normalize_arabic(transcript);
        if transcript_norm.is_empty() {
            return AlignmentResult::empty(transcript);
        }

        // The sequence analyzer anchors on its own top candidates; reuse them
        // when the reported list is at least as long.
        let report_k = self.config.match_top_k;
        let anchor_k = if report_k <= 0 || report_k >= ANCHOR_CANDIDATES {
            report_k
        } else {
            ANCHOR_CANDIDATES
        };
        let ranked = match_normalized(&transcript_norm, &self.corpus, self.scorer.as_ref(), anchor_k);
        let anchor_candidates = &ranked[..ranked.len().min(ANCHOR_CANDIDATES as usize)];

        let analysis = analyze_with_matches(
            &transcript_norm,
            anchor_candidates,
            &self.corpus,
            SequenceParams {
                max_span: self.config.max_span,
                accuracy_threshold: self.config.sequence_accuracy_threshold,
            },
        );

        let mut matches = ranked;
        if report_k > 0 {
            matches.truncate(report_k as usize);
        }
        let quran_like = is_quran_like(&matches, analysis.global_accuracy, self.config.quran_like);

        AlignmentResult {
            transcript: transcript.to_string(),
            matches,
            sequence: analysis.sequence,
            global_accuracy: analysis.global_accuracy,
            errors: analysis.errors,
            is_quran_like: Some(quran_like),
            timeline: Vec::new(),
        }
    }

    /// Transcription, text alignment and the ayah timeline for a recording.
    pub fn align_audio(&self, audio: &AudioInput) -> AudioAlignment {
        let transcript = match &audio.transcript {
            Some(text) => text.clone(),
            None => match self.transcriber.transcribe(audio) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(error = %err, "transcription failed; aligning empty transcript");
                    String::new()
                }
            },
        };
        let transcript = transcript.trim().to_string();
        if transcript.is_empty() {
            tracing::warn!(
                duration_s = audio.duration_sec(),
                "no transcript for recording; returning empty alignment"
            );
        }

        let mut alignment = self.align_text(&transcript);
        if !alignment.sequence.is_empty() {
            let segments = self.speech_detector.detect(audio);
            alignment.timeline = build_ayah_timeline(
                &segments,
                &alignment.sequence,
                audio.duration_sec(),
                self.config.timeline_margin_s,
            );
        }

        let (verses, integrity_score) = match alignment.matches.first() {
            Some(best) => {
                let clamped = if best.confidence.is_finite() {
                    best.confidence.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (vec![*best], (clamped * 100.0) as u32)
            }
            None => (Vec::new(), 0),
        };
        let mut flags = Vec::new();
        if alignment.is_quran_like != Some(true) {
            flags.push(NON_QURAN_LIKE_FLAG.to_string());
        }

        AudioAlignment {
            verses,
            integrity_score,
            flags,
            alignment,
        }
    }

    pub fn classify(&self, alignment: &AlignmentResult) -> Summary {
        summarize_alignment(alignment, self.config.summary)
    }

    pub fn classify_with(&self, alignment: &AlignmentResult, policy: SummaryPolicy) -> Summary {
        summarize_alignment(alignment, policy)
    }
}
