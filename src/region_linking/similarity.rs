//! String similarity for the fuzzy matching stage
//!
//! The default metric is a sequence-similarity ratio in the Ratcliff/Obershelp
//! style: find the longest common block, recurse on both sides, and score
//! `2 * matched / (len(a) + len(b))`. `strsim` metrics are available as
//! alternatives; all of them return a value in `[0, 1]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Similarity metric used by the fuzzy stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Longest-matching-blocks ratio
    #[default]
    SequenceRatio,
    /// `1 - levenshtein / max_len`
    NormalizedLevenshtein,
    /// Jaro-Winkler (favours shared prefixes)
    JaroWinkler,
}

impl SimilarityMetric {
    /// Score two strings, `1.0` meaning identical.
    ///
    /// `SequenceRatio` is not symmetric; the fuzzy stage passes the master
    /// key as `a` and the candidate as `b`.
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Self::SequenceRatio => sequence_ratio(a, b),
            Self::NormalizedLevenshtein => strsim::normalized_levenshtein(a, b),
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
        }
    }
}

/// Sequence-similarity ratio over Unicode scalar values
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Total size of the matching blocks between `a` and `b`
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        positions.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &positions, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run length of the block ending at b[j], for the previous a position
    let mut run_at: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_run: HashMap<usize, usize> = HashMap::new();
        if let Some(js) = positions.get(c) {
            for &j in js {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let previous = j
                    .checked_sub(1)
                    .and_then(|p| run_at.get(&p))
                    .copied()
                    .unwrap_or(0);
                let size = previous + 1;
                next_run.insert(j, size);
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            }
        }
        run_at = next_run;
    }

    (best_i, best_j, best_size)
}
