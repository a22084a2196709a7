use std::path::Path;

use serde::Deserialize;

use crate::error::AlignmentError;

/// Similarity backend used by the matcher. Resolved once when the aligner is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherBackend {
    /// Best-aligning-substring ratio; a verse inside a longer transcript scores high.
    #[default]
    PartialRatio,
    /// Whole-string matching-block ratio.
    SequenceRatio,
}

/// Thresholds for the `is_quran_like` flag on alignment results.
///
/// Kept apart from [`SummaryPolicy`]: the two verdicts use different cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuranLikePolicy {
    pub min_confidence: f64,
    pub min_accuracy: f64,
}

impl Default for QuranLikePolicy {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            min_accuracy: 0.5,
        }
    }
}

/// Thresholds for the classifier summary.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SummaryPolicy {
    pub accuracy_threshold: f64,
    pub confidence_threshold: f64,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            accuracy_threshold: 0.5,
            confidence_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    pub corpus_path: String,
    pub matcher_backend: MatcherBackend,
    pub match_top_k: i64,
    pub max_span: i64,
    pub sequence_accuracy_threshold: f64,
    pub summary: SummaryPolicy,
    pub quran_like: QuranLikePolicy,
    pub timeline_margin_s: f64,
    pub speech_top_db: f32,
}

impl AlignerConfig {
    pub const DEFAULT_MATCH_TOP_K: i64 = 5;
    pub const DEFAULT_MAX_SPAN: i64 = 10;
    pub const DEFAULT_SEQUENCE_ACCURACY_THRESHOLD: f64 = 0.9;
    pub const DEFAULT_TIMELINE_MARGIN_S: f64 = 0.15;
    pub const DEFAULT_SPEECH_TOP_DB: f32 = 30.0;

    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io("read aligner config", e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| AlignmentError::json("parse aligner config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AlignmentError> {
        let unit_interval = [
            ("sequence_accuracy_threshold", self.sequence_accuracy_threshold),
            ("summary.accuracy_threshold", self.summary.accuracy_threshold),
            ("summary.confidence_threshold", self.summary.confidence_threshold),
            ("quran_like.min_confidence", self.quran_like.min_confidence),
            ("quran_like.min_accuracy", self.quran_like.min_accuracy),
        ];
        for (name, value) in unit_interval {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(AlignmentError::config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !self.timeline_margin_s.is_finite() || self.timeline_margin_s < 0.0 {
            return Err(AlignmentError::config(format!(
                "timeline_margin_s must be a non-negative number, got {}",
                self.timeline_margin_s
            )));
        }
        if !self.speech_top_db.is_finite() || self.speech_top_db <= 0.0 {
            return Err(AlignmentError::config(format!(
                "speech_top_db must be positive, got {}",
                self.speech_top_db
            )));
        }
        Ok(())
    }
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            corpus_path: String::new(),
            matcher_backend: MatcherBackend::default(),
            match_top_k: Self::DEFAULT_MATCH_TOP_K,
            max_span: Self::DEFAULT_MAX_SPAN,
            sequence_accuracy_threshold: Self::DEFAULT_SEQUENCE_ACCURACY_THRESHOLD,
            summary: SummaryPolicy::default(),
            quran_like: QuranLikePolicy::default(),
            timeline_margin_s: Self::DEFAULT_TIMELINE_MARGIN_S,
            speech_top_db: Self::DEFAULT_SPEECH_TOP_DB,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligner_config_default() {
        let config = AlignerConfig::default();
        assert!(config.corpus_path.is_empty());
        assert_eq!(config.matcher_backend, MatcherBackend::PartialRatio);
        assert_eq!(config.match_top_k, 5);
        assert_eq!(config.max_span, 10);
        assert_eq!(config.sequence_accuracy_threshold, 0.9);
        assert_eq!(config.summary.accuracy_threshold, 0.5);
        assert_eq!(config.summary.confidence_threshold, 0.6);
        assert_eq!(config.quran_like.min_confidence, 0.7);
        assert_eq!(config.quran_like.min_accuracy, 0.5);
        assert_eq!(config.timeline_margin_s, 0.15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_documented_defaults() {
        let json = r#"{
            "corpus_path": "data/quran.json",
            "matcher_backend": "sequence_ratio",
            "max_span": 4,
            "summary": { "confidence_threshold": 0.8 }
        }"#;
        let config: AlignerConfig = serde_json::from_str(json).expect("valid config json");
        assert_eq!(config.corpus_path, "data/quran.json");
        assert_eq!(config.matcher_backend, MatcherBackend::SequenceRatio);
        assert_eq!(config.max_span, 4);
        assert_eq!(config.summary.confidence_threshold, 0.8);
        assert_eq!(config.summary.accuracy_threshold, 0.5);
        assert_eq!(config.sequence_accuracy_threshold, 0.9);
        assert_eq!(config.timeline_margin_s, 0.15);
    }

    #[test]
    fn validate_rejects_out_of_range_thresholds() {
        let config = AlignerConfig {
            sequence_accuracy_threshold: 1.5,
            ..AlignerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AlignmentError::Config { .. })
        ));

        let config = AlignerConfig {
            timeline_margin_s: f64::NAN,
            ..AlignerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_fails_on_missing_file() {
        let result = AlignerConfig::load(Path::new("/nonexistent/tilawa_config.json"));
        assert!(matches!(result, Err(AlignmentError::Io { .. })));
    }

    #[test]
    fn load_reads_temp_file() {
        let path = std::env::temp_dir().join("tilawa_align_config_load.json");
        std::fs::write(&path, r#"{ "timeline_margin_s": 0.25 }"#).expect("write config");
        let config = AlignerConfig::load(&path).expect("load config");
        assert_eq!(config.timeline_margin_s, 0.25);
        let _ = std::fs::remove_file(&path);
    }
}
