use std::path::Path;
use std::sync::Arc;

use crate::config::AlignerConfig;
use crate::corpus::{CorpusCache, VerseCorpus};
use crate::error::AlignmentError;
use crate::pipeline::defaults::{scorer_for, EnergySpeechDetector, NoTranscriber};
use crate::pipeline::runtime::{RecitationAligner, RecitationAlignerParts};
use crate::pipeline::traits::{SimilarityScorer, SpeechDetector, Transcriber};

pub struct RecitationAlignerBuilder {
    config: AlignerConfig,
    corpus: Option<Arc<VerseCorpus>>,
    scorer: Option<Box<dyn SimilarityScorer>>,
    transcriber: Option<Box<dyn Transcriber>>,
    speech_detector: Option<Box<dyn SpeechDetector>>,
}

impl RecitationAlignerBuilder {
    pub fn new(config: AlignerConfig) -> Self {
        Self {
            config,
            corpus: None,
            scorer: None,
            transcriber: None,
            speech_detector: None,
        }
    }

    /// Shares an already-loaded corpus instead of reading `config.corpus_path`.
    pub fn with_corpus(mut self, corpus: Arc<VerseCorpus>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    pub fn with_corpus_cache(self, cache: &CorpusCache) -> Result<Self, AlignmentError> {
        let corpus = cache.get_or_load()?;
        Ok(self.with_corpus(corpus))
    }

    /// Overrides the scorer selected by `config.matcher_backend`.
    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Box<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_speech_detector(mut self, speech_detector: Box<dyn SpeechDetector>) -> Self {
        self.speech_detector = Some(speech_detector);
        self
    }

    pub fn build(self) -> Result<RecitationAligner, AlignmentError> {
        self.config.validate()?;

        let corpus = match self.corpus {
            Some(corpus) => corpus,
            None => {
                if self.config.corpus_path.is_empty() {
                    return Err(AlignmentError::config(
                        "no verse corpus: set corpus_path or provide a corpus",
                    ));
                }
                Arc::new(VerseCorpus::load(Path::new(&self.config.corpus_path))?)
            }
        };

        let scorer = self
            .scorer
            .unwrap_or_else(|| scorer_for(self.config.matcher_backend));
        tracing::debug!(
            scorer = scorer.name(),
            verses = corpus.len(),
            "recitation aligner ready"
        );

        let speech_detector = self.speech_detector.unwrap_or_else(|| {
            Box::new(EnergySpeechDetector {
                top_db: self.config.speech_top_db,
                ..EnergySpeechDetector::default()
            })
        });

        Ok(RecitationAligner::from_parts(RecitationAlignerParts {
            corpus,
            config: self.config,
            scorer,
            transcriber: self
                .transcriber
                .unwrap_or_else(|| Box::new(NoTranscriber)),
            speech_detector,
        }))
    }
}
