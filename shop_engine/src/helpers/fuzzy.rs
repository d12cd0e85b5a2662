//! Approximate string matching for product search.
//!
//! Scores run from 0 (nothing in common) to 100 (identical). Comparisons are case-insensitive and work on `char`s,
//! so Cyrillic names score the same way Latin ones do.

fn chars_lower(s: &str) -> Vec<char> {
    s.chars().flat_map(char::to_lowercase).collect()
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { prev[j + 1].max(curr[j]) };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn score(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let matched = 2 * lcs_len(a, b);
    #[allow(clippy::cast_possible_truncation)]
    let pct = ((matched * 100 + total / 2) / total) as u8;
    pct
}

/// Similarity of two whole strings.
pub fn ratio(a: &str, b: &str) -> u8 {
    score(&chars_lower(a), &chars_lower(b))
}

/// The best [`ratio`] between the shorter string and any same-length window of the longer one. A query that appears
/// verbatim inside a product name scores 100.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let (a, b) = (chars_lower(a), chars_lower(b));
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }
    let mut best = 0;
    for window in long.windows(short.len()) {
        best = best.max(score(&short, window));
        if best == 100 {
            break;
        }
    }
    best
}
