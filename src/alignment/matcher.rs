use rayon::prelude::*;

use crate::alignment::normalize::normalize_arabic;
use crate::corpus::VerseCorpus;
use crate::pipeline::traits::SimilarityScorer;
use crate::types::Match;

/// Ranks every verse of the corpus against `transcript`.
///
/// Sorted by descending confidence; equal scores keep corpus order.
/// `top_k <= 0` returns the full ranking.
pub fn match_transcript(
    transcript: &str,
    corpus: &VerseCorpus,
    scorer: &dyn SimilarityScorer,
    top_k: i64,
) -> Vec<Match> {
    let transcript_norm = normalize_arabic(transcript);
    match_normalized(&transcript_norm, corpus, scorer, top_k)
}

pub(crate) fn match_normalized(
    transcript_norm: &str,
    corpus: &VerseCorpus,
    scorer: &dyn SimilarityScorer,
    top_k: i64,
) -> Vec<Match> {
    if transcript_norm.is_empty() || corpus.is_empty() {
        return Vec::new();
    }

    // Indexed parallel collect preserves corpus order ahead of the stable sort.
    let mut matches: Vec<Match> = corpus
        .verses()
        .par_iter()
        .filter_map(|verse| {
            let confidence = scorer.score(transcript_norm, &verse.text_norm);
            (confidence > 0.0).then_some(Match {
                surah: verse.surah,
                ayah: verse.ayah,
                confidence: confidence.clamp(0.0, 1.0),
            })
        })
        .collect();

    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    if top_k > 0 {
        matches.truncate(top_k as usize);
    }

    tracing::debug!(
        scorer = scorer.name(),
        candidates = matches.len(),
        best = ?matches.first().map(|m| format!("{}:{} ({:.3})", m.surah, m.ayah, m.confidence)),
        "matcher: ranked verses"
    );
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::VerseRecord;
    use crate::pipeline::defaults::{PartialRatioScorer, SequenceRatioScorer};

    fn corpus() -> VerseCorpus {
        let rows = [
            (1, 1, "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ"),
            (1, 2, "الْحَمْدُ لِلَّهِ رَبِّ الْعَالَمِينَ"),
            (1, 3, "الرَّحْمَٰنِ الرَّحِيمِ"),
            (112, 1, "قُلْ هُوَ اللَّهُ أَحَدٌ"),
            (112, 2, "اللَّهُ الصَّمَدُ"),
        ];
        VerseCorpus::from_records(
            rows.iter()
                .map(|&(surah, ayah, text)| VerseRecord {
                    surah,
                    ayah,
                    text: text.to_string(),
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn fatiha_transcript_matches_surah_one() {
        let matches = match_transcript("الحمد لله رب العالمين", &corpus(), &PartialRatioScorer, 3);
        assert!(!matches.is_empty());
        assert_eq!(matches[0].surah, 1);
        assert_eq!(matches[0].ayah, 2);
        assert!(matches[0].confidence > 0.7);
        assert!(matches.len() <= 3);
    }

    #[test]
    fn ranking_is_descending_for_both_backends() {
        let corpus = corpus();
        let scorers: [&dyn SimilarityScorer; 2] = [&PartialRatioScorer, &SequenceRatioScorer];
        for scorer in scorers {
            let matches = match_transcript("قل هو الله احد الله الصمد", &corpus, scorer, 0);
            assert!(!matches.is_empty());
            for pair in matches.windows(2) {
                assert!(pair[0].confidence >= pair[1].confidence, "{}", scorer.name());
            }
            assert!(matches.iter().all(|m| m.confidence > 0.0 && m.confidence <= 1.0));
        }
    }

    #[test]
    fn ties_keep_corpus_order() {
        // Both 1:1 and 1:3 contain the transcript fully.
        let matches = match_transcript("الرحمن الرحيم", &corpus(), &PartialRatioScorer, 0);
        let perfect: Vec<(u32, u32)> = matches
            .iter()
            .filter(|m| m.confidence == 1.0)
            .map(|m| (m.surah, m.ayah))
            .collect();
        assert_eq!(perfect, [(1, 1), (1, 3)]);
    }

    #[test]
    fn exact_long_verse_outranks_earlier_near_duplicate() {
        let verse = "الحمد لله رب العالمين الرحمن الرحيم مالك يوم الدين اياك نعبد واياك نستعين \
                     اهدنا الصراط المستقيم صراط الذين انعمت عليهم غير المغضوب عليهم ولا الضالين \
                     قل هو الله احد الله الصمد لم يلد ولم يولد ولم يكن له كفوا احد";
        let near = verse.replacen("الحمد", "الحمظ", 1);
        let corpus = VerseCorpus::from_records(vec![
            VerseRecord {
                surah: 2,
                ayah: 1,
                text: near,
            },
            VerseRecord {
                surah: 3,
                ayah: 1,
                text: verse.to_string(),
            },
        ])
        .unwrap();

        let transcript = format!("بسم الله الرحمن الرحيم {verse}");
        let matches = match_transcript(&transcript, &corpus, &PartialRatioScorer, 0);
        assert_eq!(matches.len(), 2);
        assert_eq!((matches[0].surah, matches[0].ayah), (3, 1));
        assert_eq!(matches[0].confidence, 1.0);
        assert_eq!((matches[1].surah, matches[1].ayah), (2, 1));
        assert!(matches[1].confidence < matches[0].confidence);
    }

    #[test]
    fn empty_or_non_arabic_transcript_yields_nothing() {
        assert!(match_transcript("", &corpus(), &PartialRatioScorer, 5).is_empty());
        assert!(match_transcript("hello 123", &corpus(), &PartialRatioScorer, 5).is_empty());
    }

    #[test]
    fn empty_corpus_yields_nothing() {
        let empty = VerseCorpus::default();
        assert!(match_transcript("الحمد لله", &empty, &PartialRatioScorer, 5).is_empty());
    }

    #[test]
    fn non_positive_top_k_returns_full_ranking() {
        let corpus = corpus();
        let full = match_transcript("الله", &corpus, &PartialRatioScorer, 0);
        let negative = match_transcript("الله", &corpus, &PartialRatioScorer, -1);
        assert_eq!(full, negative);
        assert!(full.len() > 1);
    }
}
