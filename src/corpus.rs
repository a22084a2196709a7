use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use serde::Deserialize;

use crate::alignment::normalize::normalize_arabic;
use crate::error::AlignmentError;
use crate::types::Verse;

pub const SURAH_COUNT: u32 = 114;

/// Verse record as stored in the JSON source file.
#[derive(Debug, Clone, Deserialize)]
pub struct VerseRecord {
    pub surah: u32,
    pub ayah: u32,
    pub text: String,
}

/// Immutable verse collection in (surah, ayah) order. Per-surah ranges are
/// indexed once so sequence reconstruction never rescans the corpus.
#[derive(Debug, Default)]
pub struct VerseCorpus {
    verses: Vec<Verse>,
    surah_ranges: BTreeMap<u32, Range<usize>>,
}

impl VerseCorpus {
    pub fn from_records(records: Vec<VerseRecord>) -> Result<Self, AlignmentError> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut verses = Vec::with_capacity(records.len());
        for (idx, record) in records.into_iter().enumerate() {
            if !(1..=SURAH_COUNT).contains(&record.surah) {
                return Err(AlignmentError::corpus_format(
                    "verse record",
                    format!("record {idx}: surah {} outside 1..={SURAH_COUNT}", record.surah),
                ));
            }
            if record.ayah == 0 {
                return Err(AlignmentError::corpus_format(
                    "verse record",
                    format!("record {idx}: ayah numbers start at 1 (surah {})", record.surah),
                ));
            }
            if !seen.insert((record.surah, record.ayah)) {
                return Err(AlignmentError::corpus_format(
                    "verse record",
                    format!("record {idx}: duplicate verse {}:{}", record.surah, record.ayah),
                ));
            }
            verses.push(Verse {
                surah: record.surah,
                ayah: record.ayah,
                text_norm: normalize_arabic(&record.text),
                text_raw: record.text,
            });
        }

        // Sources are normally in mushaf order already.
        verses.sort_by_key(|v| (v.surah, v.ayah));

        let mut surah_ranges: BTreeMap<u32, Range<usize>> = BTreeMap::new();
        for (idx, verse) in verses.iter().enumerate() {
            surah_ranges
                .entry(verse.surah)
                .and_modify(|range| range.end = idx + 1)
                .or_insert(idx..idx + 1);
        }

        Ok(Self {
            verses,
            surah_ranges,
        })
    }

    /// JSON array of `{"surah", "ayah", "text"}` records.
    pub fn from_json_str(data: &str) -> Result<Self, AlignmentError> {
        let records: Vec<VerseRecord> =
            serde_json::from_str(data).map_err(|e| AlignmentError::json("parse verse json", e))?;
        Self::from_records(records)
    }

    /// Pipe-delimited mushaf text: one `surah|ayah|text` per line, `#` comments allowed.
    pub fn from_mushaf_text(data: &str) -> Result<Self, AlignmentError> {
        let mut records = Vec::new();
        for (line_no, raw) in data.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            records.push(parse_mushaf_line(line).map_err(|message| {
                AlignmentError::corpus_format("mushaf text", format!("line {}: {message}", line_no + 1))
            })?);
        }
        Self::from_records(records)
    }

    /// Loads by extension: `.txt` is mushaf text, anything else is JSON.
    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io("read verse corpus", e))?;
        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        let corpus = if is_text {
            Self::from_mushaf_text(&data)?
        } else {
            Self::from_json_str(&data)?
        };
        tracing::info!(
            path = %path.display(),
            verses = corpus.len(),
            surahs = corpus.surah_ranges.len(),
            "verse corpus loaded"
        );
        Ok(corpus)
    }

    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    /// Verses of one surah, ordered by ayah. Empty for unknown surahs.
    pub fn surah_verses(&self, surah: u32) -> &[Verse] {
        self.surah_ranges
            .get(&surah)
            .map(|range| &self.verses[range.clone()])
            .unwrap_or(&[])
    }

    pub fn last_ayah(&self, surah: u32) -> Option<u32> {
        self.surah_verses(surah).last().map(|v| v.ayah)
    }

    pub fn verse(&self, surah: u32, ayah: u32) -> Option<&Verse> {
        let verses = self.surah_verses(surah);
        verses
            .binary_search_by_key(&ayah, |v| v.ayah)
            .ok()
            .map(|idx| &verses[idx])
    }
}

fn parse_mushaf_line(line: &str) -> Result<VerseRecord, String> {
    let mut parts = line.splitn(3, '|');
    let (Some(surah), Some(ayah), Some(text)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected 'surah|ayah|text', got {line:?}"));
    };
    let surah = surah
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid surah {surah:?}: {err}"))?;
    let ayah = ayah
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid ayah {ayah:?}: {err}"))?;
    Ok(VerseRecord {
        surah,
        ayah,
        text: text.trim().to_string(),
    })
}

/// Loads a corpus file once and hands out shared handles to it.
///
/// Concurrent first callers serialize on the load lock; later callers read the
/// initialized cell without locking. A failed load caches nothing.
#[derive(Debug)]
pub struct CorpusCache {
    path: PathBuf,
    cell: OnceLock<Arc<VerseCorpus>>,
    load_lock: Mutex<()>,
}

impl CorpusCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get_or_load(&self) -> Result<Arc<VerseCorpus>, AlignmentError> {
        if let Some(corpus) = self.cell.get() {
            return Ok(Arc::clone(corpus));
        }
        // Loading can fail and `OnceLock::get_or_try_init` is unstable, so the
        // mutex serializes loads and a failed load leaves the cell empty.
        let _guard = self
            .load_lock
            .lock()
            .map_err(|e| AlignmentError::runtime("corpus load lock", e))?;
        if let Some(corpus) = self.cell.get() {
            return Ok(Arc::clone(corpus));
        }
        let corpus = Arc::new(VerseCorpus::load(&self.path)?);
        // Only this thread can set the cell while holding the lock.
        let _ = self.cell.set(Arc::clone(&corpus));
        Ok(corpus)
    }
}
