//! Verse-sequence reconstruction.
//!
//! The matcher's top candidates pick one surah; from its strongest ayah we walk
//! forward through consecutive ayahs and score each one by word overlap with
//! the transcript. Ayahs with almost no overlap are treated as noise past the
//! recited range and skipped, but the walk continues.

use std::collections::HashSet;

use crate::alignment::matcher::match_normalized;
use crate::alignment::normalize::{normalize_arabic, tokenize};
use crate::corpus::VerseCorpus;
use crate::pipeline::traits::SimilarityScorer;
use crate::types::{ErrorItem, ErrorKind, Match, SequenceAnalysis, SequenceItem};

/// Candidates considered for anchor selection.
pub const ANCHOR_CANDIDATES: i64 = 5;
/// Below this confidence the anchor is too weak to commit to a sequence.
pub const MIN_ANCHOR_CONFIDENCE: f64 = 0.3;
/// Ayahs with less overlap than this are skipped.
pub const MIN_AYAH_OVERLAP: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceParams {
    pub max_span: i64,
    pub accuracy_threshold: f64,
}

impl Default for SequenceParams {
    fn default() -> Self {
        Self {
            max_span: 10,
            accuracy_threshold: 0.9,
        }
    }
}

pub fn analyze_recitation(
    transcript: &str,
    corpus: &VerseCorpus,
    scorer: &dyn SimilarityScorer,
    params: SequenceParams,
) -> SequenceAnalysis {
    let transcript_norm = normalize_arabic(transcript);
    if transcript_norm.is_empty() {
        return SequenceAnalysis::default();
    }
    let matches = match_normalized(&transcript_norm, corpus, scorer, ANCHOR_CANDIDATES);
    analyze_with_matches(&transcript_norm, &matches, corpus, params)
}

/// Sequence analysis over precomputed candidates (sorted by descending confidence).
pub(crate) fn analyze_with_matches(
    transcript_norm: &str,
    matches: &[Match],
    corpus: &VerseCorpus,
    params: SequenceParams,
) -> SequenceAnalysis {
    let Some(anchor) = select_anchor(matches) else {
        return SequenceAnalysis::default();
    };
    if anchor.confidence < MIN_ANCHOR_CONFIDENCE {
        tracing::debug!(
            surah = anchor.surah,
            ayah = anchor.ayah,
            confidence = anchor.confidence,
            "sequence: anchor too weak, skipping reconstruction"
        );
        return SequenceAnalysis::default();
    }

    let Some(last_ayah) = corpus.last_ayah(anchor.surah) else {
        return SequenceAnalysis::default();
    };
    if params.max_span <= 0 {
        return SequenceAnalysis::default();
    }
    let span = u32::try_from(params.max_span).unwrap_or(u32::MAX);
    let end_ayah = anchor.ayah.saturating_add(span - 1).min(last_ayah);
    tracing::debug!(
        surah = anchor.surah,
        start_ayah = anchor.ayah,
        end_ayah,
        anchor_confidence = anchor.confidence,
        "sequence: anchored span"
    );

    let transcript_tokens = tokenize(transcript_norm);
    let transcript_set: HashSet<&str> = transcript_tokens.iter().copied().collect();

    let mut analysis = SequenceAnalysis::default();
    let mut accuracy_sum = 0.0f64;
    for verse in corpus
        .surah_verses(anchor.surah)
        .iter()
        .filter(|v| (anchor.ayah..=end_ayah).contains(&v.ayah))
    {
        let ayah_tokens = tokenize(&verse.text_norm);
        if ayah_tokens.is_empty() {
            continue;
        }
        let ayah_set: HashSet<&str> = ayah_tokens.iter().copied().collect();

        let missing_words: Vec<String> = ayah_tokens
            .iter()
            .filter(|w| !transcript_set.contains(*w))
            .map(|w| w.to_string())
            .collect();
        let covered = ayah_tokens.len() - missing_words.len();
        let accuracy = covered as f64 / ayah_tokens.len() as f64;
        if accuracy < MIN_AYAH_OVERLAP {
            continue;
        }

        let extra_words: Vec<String> = transcript_tokens
            .iter()
            .filter(|w| !ayah_set.contains(*w))
            .map(|w| w.to_string())
            .collect();

        let error_flag = accuracy < params.accuracy_threshold;
        if error_flag {
            if !missing_words.is_empty() {
                analysis.errors.push(ErrorItem {
                    surah: anchor.surah,
                    ayah: verse.ayah,
                    kind: ErrorKind::MissingWords,
                    details: format!("Missing words: {}", missing_words.join(", ")),
                });
            }
            analysis.errors.push(ErrorItem {
                surah: anchor.surah,
                ayah: verse.ayah,
                kind: ErrorKind::LowAccuracy,
                details: format!(
                    "Accuracy {accuracy:.2} below threshold {:.2}",
                    params.accuracy_threshold
                ),
            });
        }

        accuracy_sum += accuracy;
        analysis.sequence.push(SequenceItem {
            surah: anchor.surah,
            ayah: verse.ayah,
            confidence: accuracy,
            accuracy,
            error_flag,
            missing_words,
            extra_words,
        });
    }

    if analysis.sequence.is_empty() {
        return SequenceAnalysis::default();
    }
    analysis.surah = Some(anchor.surah);
    analysis.global_accuracy = Some(accuracy_sum / analysis.sequence.len() as f64);
    analysis
}

/// Picks the surah with the highest summed confidence, then its best ayah.
///
/// Summing per surah keeps a short shared opening (e.g. the basmalah) from
/// out-voting a long recitation of another surah. Ties go to the surah that
/// appears first in the ranked candidates.
fn select_anchor(matches: &[Match]) -> Option<Match> {
    // (surah, summed confidence, best match) in first-seen order.
    let mut per_surah: Vec<(u32, f64, Match)> = Vec::new();
    for m in matches {
        let confidence = if m.confidence.is_finite() { m.confidence } else { 0.0 };
        match per_surah.iter_mut().find(|(surah, _, _)| *surah == m.surah) {
            Some((_, sum, best)) => {
                *sum += confidence;
                if confidence > best.confidence {
                    *best = Match { confidence, ..*m };
                }
            }
            None => per_surah.push((m.surah, confidence, Match { confidence, ..*m })),
        }
    }

    let mut chosen: Option<&(u32, f64, Match)> = None;
    for entry in &per_surah {
        if chosen.map_or(true, |c| entry.1 > c.1) {
            chosen = Some(entry);
        }
    }
    chosen.map(|&(_, _, best)| best)
}
