use crate::config::{QuranLikePolicy, SummaryPolicy};
use crate::types::{AlignmentResult, Label, Match, Summary};

/// Accuracy at or above which an error-free recitation is labelled good.
pub const GOOD_RECITATION_ACCURACY: f64 = 0.9;

fn finite_or_none(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn best_confidence(matches: &[Match]) -> f64 {
    matches
        .first()
        .map(|m| m.confidence)
        .filter(|c| c.is_finite())
        .unwrap_or(0.0)
}

/// Reduces an alignment result to a Qur'an / not-Qur'an verdict and quality label.
pub fn summarize_alignment(alignment: &AlignmentResult, policy: SummaryPolicy) -> Summary {
    let global_accuracy = finite_or_none(alignment.global_accuracy);

    let (main_surah, ayah_start, ayah_end) = match alignment.sequence.first() {
        Some(first) => {
            let ayahs = alignment.sequence.iter().map(|item| item.ayah);
            (Some(first.surah), ayahs.clone().min(), ayahs.max())
        }
        None => match alignment.matches.first() {
            Some(best) => (Some(best.surah), Some(best.ayah), Some(best.ayah)),
            None => (None, None, None),
        },
    };

    let quran_confidence = best_confidence(&alignment.matches);
    let is_quran = global_accuracy.is_some_and(|acc| acc >= policy.accuracy_threshold)
        && !alignment.sequence.is_empty()
        && quran_confidence >= policy.confidence_threshold;

    let label = if !is_quran {
        Label::NotQuran
    } else if global_accuracy.unwrap_or(0.0) >= GOOD_RECITATION_ACCURACY
        && alignment.errors.is_empty()
    {
        Label::QuranGood
    } else if !alignment.errors.is_empty() {
        Label::QuranWithErrors
    } else {
        Label::QuranUncertain
    };

    Summary {
        is_quran,
        label,
        quran_confidence,
        main_surah,
        ayah_start,
        ayah_end,
        recitation_accuracy: global_accuracy,
        issues_count: alignment.errors.len(),
        issues: alignment.errors.clone(),
    }
}

/// Coarse "looks like recitation" flag attached to every alignment result.
pub fn is_quran_like(matches: &[Match], global_accuracy: Option<f64>, policy: QuranLikePolicy) -> bool {
    if matches.is_empty() {
        return false;
    }
    let accuracy = finite_or_none(global_accuracy).unwrap_or(0.0);
    best_confidence(matches) >= policy.min_confidence && accuracy >= policy.min_accuracy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorItem, ErrorKind, SequenceItem};

    fn item(ayah: u32, accuracy: f64) -> SequenceItem {
        SequenceItem {
            surah: 112,
            ayah,
            confidence: accuracy,
            accuracy,
            error_flag: accuracy < 0.9,
            missing_words: Vec::new(),
            extra_words: Vec::new(),
        }
    }

    fn good_alignment() -> AlignmentResult {
        AlignmentResult {
            transcript: "قل هو الله احد الله الصمد".to_string(),
            matches: vec![Match {
                surah: 112,
                ayah: 1,
                confidence: 1.0,
            }],
            sequence: vec![item(1, 1.0), item(2, 1.0)],
            global_accuracy: Some(1.0),
            errors: Vec::new(),
            is_quran_like: Some(true),
            timeline: Vec::new(),
        }
    }

    fn low_accuracy_error(ayah: u32) -> ErrorItem {
        ErrorItem {
            surah: 112,
            ayah,
            kind: ErrorKind::LowAccuracy,
            details: "Accuracy 0.60 below threshold 0.90".to_string(),
        }
    }

    #[test]
    fn clean_recitation_is_good() {
        let summary = summarize_alignment(&good_alignment(), SummaryPolicy::default());
        assert!(summary.is_quran);
        assert_eq!(summary.label, Label::QuranGood);
        assert_eq!(summary.main_surah, Some(112));
        assert_eq!((summary.ayah_start, summary.ayah_end), (Some(1), Some(2)));
        assert_eq!(summary.quran_confidence, 1.0);
        assert_eq!(summary.issues_count, 0);
    }

    #[test]
    fn errors_downgrade_label() {
        let mut alignment = good_alignment();
        alignment.global_accuracy = Some(0.8);
        alignment.errors.push(low_accuracy_error(2));
        let summary = summarize_alignment(&alignment, SummaryPolicy::default());
        assert!(summary.is_quran);
        assert_eq!(summary.label, Label::QuranWithErrors);
        assert_eq!(summary.issues_count, 1);
        assert_eq!(summary.issues, alignment.errors);
    }

    #[test]
    fn errors_with_high_accuracy_are_still_with_errors() {
        let mut alignment = good_alignment();
        alignment.errors.push(low_accuracy_error(2));
        let summary = summarize_alignment(&alignment, SummaryPolicy::default());
        assert_eq!(summary.label, Label::QuranWithErrors);
    }

    #[test]
    fn mid_accuracy_without_errors_is_uncertain() {
        let mut alignment = good_alignment();
        alignment.global_accuracy = Some(0.7);
        let summary = summarize_alignment(&alignment, SummaryPolicy::default());
        assert_eq!(summary.label, Label::QuranUncertain);
    }

    #[test]
    fn each_gate_is_required() {
        let policy = SummaryPolicy::default();

        let mut low_accuracy = good_alignment();
        low_accuracy.global_accuracy = Some(0.49);
        assert!(!summarize_alignment(&low_accuracy, policy).is_quran);

        let mut no_accuracy = good_alignment();
        no_accuracy.global_accuracy = None;
        assert!(!summarize_alignment(&no_accuracy, policy).is_quran);

        let mut no_sequence = good_alignment();
        no_sequence.sequence.clear();
        let summary = summarize_alignment(&no_sequence, policy);
        assert!(!summary.is_quran);
        assert_eq!(summary.label, Label::NotQuran);
        // Span falls back to the best match.
        assert_eq!((summary.ayah_start, summary.ayah_end), (Some(1), Some(1)));

        let mut weak_match = good_alignment();
        weak_match.matches[0].confidence = 0.59;
        assert!(!summarize_alignment(&weak_match, policy).is_quran);
    }

    #[test]
    fn malformed_numbers_degrade_locally() {
        let mut alignment = good_alignment();
        alignment.global_accuracy = Some(f64::NAN);
        alignment.matches[0].confidence = f64::INFINITY;
        let summary = summarize_alignment(&alignment, SummaryPolicy::default());
        assert!(!summary.is_quran);
        assert_eq!(summary.recitation_accuracy, None);
        assert_eq!(summary.quran_confidence, 0.0);
    }

    #[test]
    fn empty_alignment_is_not_quran() {
        let summary = summarize_alignment(&AlignmentResult::empty(""), SummaryPolicy::default());
        assert!(!summary.is_quran);
        assert_eq!(summary.label, Label::NotQuran);
        assert_eq!(summary.main_surah, None);
        assert_eq!(summary.quran_confidence, 0.0);
    }

    #[test]
    fn quran_like_uses_its_own_cutoffs() {
        let policy = QuranLikePolicy::default();
        let matches = [Match {
            surah: 1,
            ayah: 2,
            confidence: 0.65,
        }];
        // Passes the summary's 0.6 confidence cutoff but not the 0.7 one here.
        assert!(!is_quran_like(&matches, Some(1.0), policy));
        let strong = [Match {
            confidence: 0.7,
            ..matches[0]
        }];
        assert!(is_quran_like(&strong, Some(0.5), policy));
        assert!(!is_quran_like(&strong, None, policy));
        assert!(!is_quran_like(&[], Some(1.0), policy));
    }
}
