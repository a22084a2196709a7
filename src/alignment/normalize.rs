//! Arabic text normalization used by every matching stage.
//!
//! Steps run in order on the output of the previous one:
//! - strip diacritics and Qur'anic annotation marks
//! - strip tatweel
//! - unify alif variants to plain alif and alif maqsura to yaa
//! - replace anything that is neither an Arabic-block char nor whitespace with a space
//! - collapse whitespace

const TATWEEL: char = '\u{0640}';
const ALIF: char = '\u{0627}';
const YAA: char = '\u{064A}';
const ALIF_MAQSURA: char = '\u{0649}';

/// Alif with hamza above, hamza below, madda, and alif wasla.
const ALIF_VARIANTS: [char; 4] = ['\u{0623}', '\u{0625}', '\u{0622}', '\u{0671}'];

#[inline]
fn is_diacritic(c: char) -> bool {
    matches!(
        c,
        '\u{0610}'..='\u{061A}' | '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}'
    )
}

#[inline]
fn is_arabic_block(c: char) -> bool {
    ('\u{0600}'..='\u{06FF}').contains(&c)
}

pub fn normalize_arabic(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(text.len());
    // Leading separators are dropped by starting in the "just saw a space" state.
    let mut pending_space = false;
    for c in text.chars() {
        if is_diacritic(c) || c == TATWEEL {
            continue;
        }
        let c = if ALIF_VARIANTS.contains(&c) {
            ALIF
        } else if c == ALIF_MAQSURA {
            YAA
        } else {
            c
        };

        if c.is_whitespace() || !is_arabic_block(c) {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}

/// Whitespace tokens of already-normalized text.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}
