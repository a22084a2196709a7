//! Character-level string similarity over normalized text.
//!
//! `sequence_ratio` follows the matching-block ratio `2 * M / T` of a
//! longest-common-block decomposition. `partial_ratio` scores the shorter
//! string against windows of the longer one placed at its matching blocks, so a
//! short verse embedded in a long recitation scores 1.0. Windows are scored by
//! indel similarity `2 * LCS / T`, computed bit-parallel.

use std::collections::HashMap;

/// `(a_start, b_start, len)` of a maximal common block.
type Block = (usize, usize, usize);

pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let matched: usize = matching_blocks(&a, &b).iter().map(|&(_, _, n)| n).sum();
    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

pub fn partial_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let ((shorter_str, shorter), (longer_str, longer)) = if a_chars.len() <= b_chars.len() {
        ((a, a_chars), (b, b_chars))
    } else {
        ((b, b_chars), (a, a_chars))
    };

    let pattern = PatternMasks::new(&shorter);
    if shorter.len() == longer.len() {
        return pattern.indel_ratio(&longer);
    }
    if longer_str.contains(shorter_str) {
        return 1.0;
    }

    let mut blocks = matching_blocks(&shorter, &longer);
    // Trailing sentinel window: the tail of the longer string.
    blocks.push((shorter.len(), longer.len(), 0));

    let mut best = 0.0f64;
    for (i, j, _) in blocks {
        let long_start = j.saturating_sub(i);
        let long_end = (long_start + shorter.len()).min(longer.len());
        let r = pattern.indel_ratio(&longer[long_start..long_end]);
        if r >= 1.0 {
            return 1.0;
        }
        best = best.max(r);
    }
    best
}

/// Per-character occurrence bitmasks of a fixed pattern, for bit-parallel LCS.
struct PatternMasks {
    len: usize,
    masks: HashMap<char, Vec<u64>>,
}

impl PatternMasks {
    fn new(pattern: &[char]) -> Self {
        let words = pattern.len().div_ceil(64);
        let mut masks: HashMap<char, Vec<u64>> = HashMap::new();
        for (idx, &c) in pattern.iter().enumerate() {
            masks.entry(c).or_insert_with(|| vec![0; words])[idx / 64] |= 1u64 << (idx % 64);
        }
        Self {
            len: pattern.len(),
            masks,
        }
    }

    fn indel_ratio(&self, text: &[char]) -> f64 {
        let total = self.len + text.len();
        if total == 0 {
            return 0.0;
        }
        2.0 * self.lcs_len(text) as f64 / total as f64
    }

    /// Length of the longest common subsequence with `text` (Hyyrö's
    /// bit-vector recurrence; zero bits of `v` mark matched pattern positions).
    fn lcs_len(&self, text: &[char]) -> usize {
        let words = self.len.div_ceil(64);
        let mut v = vec![u64::MAX; words];
        for c in text {
            let Some(mask) = self.masks.get(c) else {
                continue;
            };
            let mut carry = false;
            for (word, &m) in v.iter_mut().zip(mask) {
                let u = *word & m;
                let (sum, c1) = word.overflowing_add(u);
                let (sum, c2) = sum.overflowing_add(carry as u64);
                *word = sum | (*word - u);
                carry = c1 || c2;
            }
        }
        let tail_bits = self.len % 64;
        v.iter()
            .enumerate()
            .map(|(idx, &word)| {
                let zeros = !word;
                if idx + 1 == words && tail_bits != 0 {
                    (zeros & ((1u64 << tail_bits) - 1)).count_ones() as usize
                } else {
                    zeros.count_ones() as usize
                }
            })
            .sum()
    }
}

/// Non-overlapping common blocks in increasing order of both indices.
fn matching_blocks(a: &[char], b: &[char]) -> Vec<Block> {
    let mut finder = BlockFinder::new(a, b);
    let mut blocks = Vec::new();
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let Some((i, j, size)) = finder.longest_match(a_lo, a_hi, b_lo, b_hi) else {
            continue;
        };
        blocks.push((i, j, size));
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }
    blocks.sort_unstable();
    blocks
}

struct BlockFinder<'a> {
    a: &'a [char],
    b_positions: HashMap<char, Vec<usize>>,
    /// `(row, len)`: common run ending at `b[j]` as of row `row`.
    runs: Vec<(usize, usize)>,
    row: usize,
}

impl<'a> BlockFinder<'a> {
    fn new(a: &'a [char], b: &[char]) -> Self {
        let mut b_positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b_positions.entry(c).or_default().push(j);
        }
        Self {
            a,
            b_positions,
            runs: vec![(0, 0); b.len()],
            row: 0,
        }
    }

    /// Longest common block within `a[a_lo..a_hi]` and `b[b_lo..b_hi]`,
    /// earliest in `a` then in `b` on ties.
    fn longest_match(
        &mut self,
        a_lo: usize,
        a_hi: usize,
        b_lo: usize,
        b_hi: usize,
    ) -> Option<Block> {
        // Skip a row id so runs left by an earlier call never chain into this one.
        self.row += 1;
        // (a_end, b_end, len) of the best block, ends inclusive.
        let mut best: Option<Block> = None;
        for i in a_lo..a_hi {
            self.row += 1;
            let row = self.row;
            let Some(positions) = self.b_positions.get(&self.a[i]) else {
                continue;
            };
            let first = positions.partition_point(|&j| j < b_lo);
            let last = positions.partition_point(|&j| j < b_hi);
            // Right to left, so `runs[j - 1]` still holds the previous row.
            for &j in positions[first..last].iter().rev() {
                let len = match j.checked_sub(1).filter(|&prev| prev >= b_lo) {
                    Some(prev) if self.runs[prev].0 == row - 1 => self.runs[prev].1 + 1,
                    _ => 1,
                };
                self.runs[j] = (row, len);
                let better = match best {
                    None => true,
                    Some((best_i, best_j, best_len)) => {
                        len > best_len || (len == best_len && i == best_i && j < best_j)
                    }
                };
                if better {
                    best = Some((i, j, len));
                }
            }
        }
        best.map(|(i, j, len)| (i + 1 - len, j + 1 - len, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_ratio_identical_is_one() {
        let text = "بسم الله الرحمن الرحيم";
        assert!((sequence_ratio(text, text) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(sequence_ratio("", ""), 0.0);
        assert_eq!(sequence_ratio("abc", ""), 0.0);
        assert_eq!(partial_ratio("", "abc"), 0.0);
    }

    #[test]
    fn sequence_ratio_matches_known_value() {
        // "abcd" vs "bcde": common block "bcd" -> 2 * 3 / 8
        assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn sequence_ratio_disjoint_is_zero() {
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn partial_ratio_contained_substring_is_one() {
        let verse = "قل هو الله احد";
        let recitation = "بسم الله الرحمن الرحيم قل هو الله احد الله الصمد";
        assert_eq!(partial_ratio(verse, recitation), 1.0);
        assert_eq!(partial_ratio(recitation, verse), 1.0);
    }

    #[test]
    fn partial_ratio_dominates_plain_ratio_for_containment() {
        let verse = "الله الصمد";
        let recitation = "قل هو الله احد الله الصمد لم يلد ولم يولد";
        assert!(partial_ratio(verse, recitation) > sequence_ratio(verse, recitation));
    }

    #[test]
    fn partial_ratio_is_bounded() {
        let pairs = [
            ("abc", "xabcyabz"),
            ("مرحبا كيف حالك", "الحمد لله رب العالمين"),
            ("a", "bbbb"),
        ];
        for (a, b) in pairs {
            let r = partial_ratio(a, b);
            assert!((0.0..=1.0).contains(&r), "{a:?} vs {b:?} -> {r}");
        }
    }

    #[test]
    fn partial_ratio_one_letter_off_stays_below_one() {
        let verse = "الحمد لله رب العالمين الرحمن الرحيم مالك يوم الدين اياك نعبد واياك نستعين \
                     اهدنا الصراط المستقيم صراط الذين انعمت عليهم غير المغضوب عليهم ولا الضالين \
                     قل هو الله احد الله الصمد لم يلد ولم يولد ولم يكن له كفوا احد";
        let variant = verse.replacen("الحمد", "الحمظ", 1);
        let recitation = format!("بسم الله الرحمن الرحيم {verse}");
        assert_eq!(partial_ratio(verse, &recitation), 1.0);
        let r = partial_ratio(&variant, &recitation);
        assert!(r < 1.0 && r > 0.99, "{r}");
    }

    #[test]
    fn indel_ratio_counts_common_subsequence() {
        let pattern: Vec<char> = "abcd".chars().collect();
        let text: Vec<char> = "acbd".chars().collect();
        // LCS "abd" (or "acd") -> 2 * 3 / 8
        assert!((PatternMasks::new(&pattern).indel_ratio(&text) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn lcs_spans_multiple_mask_words() {
        let pattern: Vec<char> = "ab".repeat(50).chars().collect();
        let text: Vec<char> = "b".repeat(30).chars().chain("a".repeat(80).chars()).collect();
        // Best is every 'a' of the pattern.
        let masks = PatternMasks::new(&pattern);
        assert_eq!(masks.lcs_len(&text), 50);
        assert_eq!(masks.lcs_len(&pattern), 100);
        assert_eq!(masks.lcs_len(&[]), 0);
    }

    #[test]
    fn matching_blocks_are_ordered_and_disjoint() {
        let a: Vec<char> = "abxcdyef".chars().collect();
        let b: Vec<char> = "abcdef".chars().collect();
        let blocks = matching_blocks(&a, &b);
        assert_eq!(blocks, vec![(0, 0, 2), (3, 2, 2), (6, 4, 2)]);
    }

    #[test]
    fn long_repetitive_run_is_one_block() {
        let a: Vec<char> = "ab".repeat(300).chars().collect();
        let b: Vec<char> = format!("x{}", "ab".repeat(300)).chars().collect();
        assert_eq!(matching_blocks(&a, &b), vec![(0, 1, 600)]);
        assert!((sequence_ratio(&"ab".repeat(300), &"ab".repeat(300)) - 1.0).abs() < 1e-12);
    }
}
