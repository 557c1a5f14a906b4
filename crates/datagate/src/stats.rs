//! Small numeric and string helpers shared by the checks.

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Calculate Levenshtein edit distance between two strings.
pub fn levenshtein(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let len1 = s1_chars.len();
    let len2 = s2_chars.len();

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut matrix: Vec<Vec<usize>> = vec![vec![0; len2 + 1]; len1 + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    for i in 1..=len1 {
        for j in 1..=len2 {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };

            matrix[i][j] = (matrix[i - 1][j] + 1) // deletion
                .min(matrix[i][j - 1] + 1) // insertion
                .min(matrix[i - 1][j - 1] + cost); // substitution
        }
    }

    matrix[len1][len2]
}

/// Normalized edit similarity in `[0, 1]`, case-insensitive.
///
/// `1 - distance / max(len)`; two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

/// Best match for `value` among `candidates`, with its similarity.
///
/// Ties go to the earliest candidate.
pub fn closest_match<'a>(value: &str, candidates: &'a [String]) -> Option<(&'a str, f64)> {
    let mut best: Option<(&str, f64)> = None;
    for candidate in candidates {
        let score = similarity(value, candidate);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best
}

/// Quantile of sorted data with linear interpolation between closest ranks.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// First and third quartiles. `None` for an empty slice.
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Some((quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75)))
}

/// Positions of values beyond `Q1 - k*IQR` or `Q3 + k*IQR`.
pub fn iqr_outliers(values: &[f64], k: f64) -> BTreeSet<usize> {
    let Some((q1, q3)) = quartiles(values) else {
        return BTreeSet::new();
    };
    let iqr = q3 - q1;
    let lower = q1 - k * iqr;
    let upper = q3 + k * iqr;

    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v < lower || **v > upper)
        .map(|(i, _)| i)
        .collect()
}

/// Collapse sorted row numbers into ranges: `1-3, 7, 9-10`.
pub fn compress_ranges(rows: &BTreeSet<usize>) -> String {
    let mut parts = Vec::new();
    let mut iter = rows.iter().copied();
    let Some(mut start) = iter.next() else {
        return String::new();
    };
    let mut end = start;

    for row in iter {
        if row == end + 1 {
            end = row;
        } else {
            parts.push(format_range(start, end));
            start = row;
            end = row;
        }
    }
    parts.push(format_range(start, end));
    parts.join(", ")
}

/// [`compress_ranges`] over the first `limit` rows, with a count of the rest.
pub fn compress_ranges_limited(rows: &BTreeSet<usize>, limit: usize) -> String {
    if rows.len() <= limit {
        return compress_ranges(rows);
    }
    let head: BTreeSet<usize> = rows.iter().take(limit).copied().collect();
    format!("{}, ... ({} more)", compress_ranges(&head), rows.len() - limit)
}

fn format_range(start: usize, end: usize) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}

/// Percentage of `part` in `whole`, zero when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("São", "Sao"), 1);
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("SP", "sp"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert!((similarity("Norte", "Nort") - 0.8).abs() < 1e-12);
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_closest_match_tie_goes_first() {
        let vocab = vec!["AB".to_string(), "AC".to_string()];
        let (best, score) = closest_match("AX", &vocab).unwrap();
        assert_eq!(best, "AB");
        assert!((score - 0.5).abs() < 1e-12);
        assert!(closest_match("x", &[]).is_none());
    }

    #[test]
    fn test_quartiles_linear() {
        let (q1, q3) = quartiles(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((q1 - 1.75).abs() < 1e-12);
        assert!((q3 - 3.25).abs() < 1e-12);
        assert!(quartiles(&[]).is_none());
    }

    #[test]
    fn test_iqr_outliers() {
        let values = [10.0, 11.0, 12.0, 11.5, 10.5, 12.5, 11.0, 10.8, 11.2, 95.0];
        let outliers = iqr_outliers(&values, 1.5);
        assert_eq!(outliers, BTreeSet::from([9]));

        let constant = [5.0; 12];
        assert!(iqr_outliers(&constant, 1.5).is_empty());
    }

    #[test]
    fn test_compress_ranges() {
        let rows = BTreeSet::from([1, 2, 3, 7, 9, 10]);
        assert_eq!(compress_ranges(&rows), "1-3, 7, 9-10");
        assert_eq!(compress_ranges(&BTreeSet::new()), "");
        assert_eq!(compress_ranges(&BTreeSet::from([4])), "4");
    }

    #[test]
    fn test_compress_ranges_limited() {
        let rows: BTreeSet<usize> = (1..=30).filter(|r| r % 2 == 0).collect();
        assert_eq!(compress_ranges_limited(&rows, 3), "2, 4, 6, ... (12 more)");
        assert_eq!(compress_ranges_limited(&BTreeSet::from([1, 2]), 3), "1-2");
    }
}
