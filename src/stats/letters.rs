//! Significance letters for grouped comparisons.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::PostHocTest;

/// How letters are derived from the pairwise results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterScheme {
    /// Compact letter display (insert-and-absorb): groups sharing a letter
    /// are not significantly different.
    #[default]
    Compact,
    /// Running counter over the groups in level order. Each significant
    /// comparison a group is part of advances the counter by one. After
    /// Tukey a group takes the counter on entry; after Dunn it keeps `a`
    /// unless it differs from something, then takes its last increment.
    Sequential,
}

impl std::str::FromStr for LetterScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!("unknown letter scheme '{other}'")),
        }
    }
}

/// Letter number `idx`: `a..z`, then `A..Z`, then `l53`, `l54`, ...
pub fn letter_name(idx: usize) -> String {
    match idx {
        0..=25 => char::from(b'a' + idx as u8).to_string(),
        26..=51 => char::from(b'A' + (idx - 26) as u8).to_string(),
        _ => format!("l{}", idx + 1),
    }
}

/// Letters for `means.len()` groups. `differs(i, j)` reports whether
/// groups `i` and `j` are significantly different.
pub fn assign_letters(
    scheme: LetterScheme,
    test: PostHocTest,
    means: &[f64],
    differs: impl Fn(usize, usize) -> bool,
) -> Vec<String> {
    match (scheme, test) {
        (LetterScheme::Compact, _) => compact_letters(means, differs),
        (LetterScheme::Sequential, PostHocTest::TukeyHsd) => {
            sequential_letters(means.len(), differs)
        }
        (LetterScheme::Sequential, PostHocTest::Dunn(_)) => {
            sequential_dunn_letters(means.len(), differs)
        }
    }
}

/// Insert-and-absorb compact letter display (Piepho, 2004). Letters are
/// ordered so that the group with the highest mean carries `a`.
pub fn compact_letters(means: &[f64], differs: impl Fn(usize, usize) -> bool) -> Vec<String> {
    let k = means.len();
    if k == 0 {
        return Vec::new();
    }

    let mut columns: Vec<BTreeSet<usize>> = vec![(0..k).collect()];
    for i in 0..k {
        for j in (i + 1)..k {
            if !differs(i, j) {
                continue;
            }
            // insert: split every column that still holds both
            let mut next = Vec::with_capacity(columns.len() + 1);
            for col in columns {
                if col.contains(&i) && col.contains(&j) {
                    let mut without_i = col.clone();
                    without_i.remove(&i);
                    let mut without_j = col;
                    without_j.remove(&j);
                    next.push(without_i);
                    next.push(without_j);
                } else {
                    next.push(col);
                }
            }
            columns = absorb(next);
        }
    }

    // highest mean first
    let mut by_mean: Vec<usize> = (0..k).collect();
    by_mean.sort_by(|&a, &b| means[b].total_cmp(&means[a]).then(a.cmp(&b)));
    let rank_of = |g: usize| by_mean.iter().position(|&x| x == g).unwrap_or(k);

    columns.sort_by_key(|col| {
        let mut ranks: Vec<usize> = col.iter().map(|&g| rank_of(g)).collect();
        ranks.sort_unstable();
        ranks
    });

    (0..k)
        .map(|g| {
            columns
                .iter()
                .enumerate()
                .filter(|(_, col)| col.contains(&g))
                .map(|(idx, _)| letter_name(idx))
                .collect::<String>()
        })
        .collect()
}

/// Drop columns that are contained in another column (and duplicates).
fn absorb(columns: Vec<BTreeSet<usize>>) -> Vec<BTreeSet<usize>> {
    let mut kept: Vec<BTreeSet<usize>> = Vec::with_capacity(columns.len());
    for (idx, col) in columns.iter().enumerate() {
        let swallowed = columns.iter().enumerate().any(|(other_idx, other)| {
            other_idx != idx
                && col.is_subset(other)
                && (col.len() < other.len() || other_idx < idx)
        });
        if !swallowed && !col.is_empty() {
            kept.push(col.clone());
        }
    }
    kept
}

/// One letter per group from a running counter over level order.
pub fn sequential_letters(k: usize, differs: impl Fn(usize, usize) -> bool) -> Vec<String> {
    let mut counter = 0;
    let mut letters = Vec::with_capacity(k);
    for g in 0..k {
        letters.push(letter_name(counter));
        for (a, b) in (0..k).flat_map(|a| ((a + 1)..k).map(move |b| (a, b))) {
            if (a == g || b == g) && differs(a, b) {
                counter += 1;
            }
        }
    }
    letters
}

/// Running counter over every ordered pair `(g, other)`; a group that
/// differs from nothing stays `a`, otherwise it keeps the counter value
/// from its last significant comparison.
pub fn sequential_dunn_letters(k: usize, differs: impl Fn(usize, usize) -> bool) -> Vec<String> {
    let mut counter = 0;
    let mut letters = vec![letter_name(0); k];
    for (g, letter) in letters.iter_mut().enumerate() {
        for other in 0..k {
            if other != g && differs(g, other) {
                counter += 1;
                *letter = letter_name(counter);
            }
        }
    }
    letters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::dunn::PAdjust;

    fn pairs(sig: &'static [(usize, usize)]) -> impl Fn(usize, usize) -> bool {
        move |i, j| sig.contains(&(i, j)) || sig.contains(&(j, i))
    }

    #[test]
    fn no_differences_share_one_letter() {
        let letters = compact_letters(&[1.0, 2.0, 3.0], |_, _| false);
        assert_eq!(letters, vec!["a", "a", "a"]);
        let letters = sequential_letters(3, |_, _| false);
        assert_eq!(letters, vec!["a", "a", "a"]);
    }

    #[test]
    fn compact_overlapping_groups() {
        // means A=2, B=5, C=8; only A and C differ
        let letters = compact_letters(&[2.0, 5.0, 8.0], pairs(&[(0, 2)]));
        assert_eq!(letters, vec!["b", "ab", "a"]);
    }

    #[test]
    fn compact_all_different() {
        let letters = compact_letters(&[1.0, 3.0, 2.0], pairs(&[(0, 1), (0, 2), (1, 2)]));
        assert_eq!(letters, vec!["c", "a", "b"]);
    }

    #[test]
    fn compact_chain_of_four() {
        // adjacent groups overlap, the ends differ from everything two away
        let letters = compact_letters(
            &[4.0, 3.0, 2.0, 1.0],
            pairs(&[(0, 2), (0, 3), (1, 3)]),
        );
        assert_eq!(letters, vec!["a", "ab", "bc", "c"]);
    }

    #[test]
    fn compact_letters_respect_differences() {
        let sig: &[(usize, usize)] = &[(0, 1), (1, 3), (2, 4), (0, 4)];
        let means = [5.0, 1.0, 4.0, 3.5, 2.0];
        let letters = compact_letters(&means, pairs(&[(0, 1), (1, 3), (2, 4), (0, 4)]));
        for i in 0..means.len() {
            for j in (i + 1)..means.len() {
                let share = letters[i].chars().any(|c| letters[j].contains(c));
                let different = sig.contains(&(i, j));
                assert_eq!(share, !different, "groups {i} and {j}: {letters:?}");
            }
        }
    }

    #[test]
    fn sequential_counter() {
        let letters = sequential_letters(3, pairs(&[(0, 2)]));
        assert_eq!(letters, vec!["a", "b", "b"]);
    }

    #[test]
    fn sequential_dunn_counter() {
        let letters = sequential_dunn_letters(3, pairs(&[(0, 2)]));
        assert_eq!(letters, vec!["b", "a", "c"]);
        // each pair is seen from both ends
        let letters = sequential_dunn_letters(3, pairs(&[(0, 1), (0, 2)]));
        assert_eq!(letters, vec!["c", "d", "e"]);
        let letters = sequential_dunn_letters(2, |_, _| false);
        assert_eq!(letters, vec!["a", "a"]);
    }

    #[test]
    fn sequential_scheme_follows_the_test() {
        let means = [1.0, 2.0, 3.0];
        let letters = |scheme, test| assign_letters(scheme, test, &means, pairs(&[(0, 2)]));
        let dunn = PostHocTest::Dunn(PAdjust::Bonferroni);

        assert_eq!(
            letters(LetterScheme::Sequential, PostHocTest::TukeyHsd),
            vec!["a", "b", "b"]
        );
        assert_eq!(letters(LetterScheme::Sequential, dunn), vec!["b", "a", "c"]);
        assert_eq!(
            letters(LetterScheme::Compact, PostHocTest::TukeyHsd),
            vec!["b", "ab", "a"]
        );
    }

    #[test]
    fn letter_names_extend_past_z() {
        assert_eq!(letter_name(0), "a");
        assert_eq!(letter_name(25), "z");
        assert_eq!(letter_name(26), "A");
        assert_eq!(letter_name(52), "l53");
    }

    #[test]
    fn parses_scheme() {
        assert_eq!("Compact".parse::<LetterScheme>(), Ok(LetterScheme::Compact));
        assert!("greedy".parse::<LetterScheme>().is_err());
    }
}
