//! Fuzzy string matching with Levenshtein distance, used by entity resolution.

/// Normalize a string for comparison: trim surrounding whitespace, lowercase.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Compute Levenshtein edit distance between two strings.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Normalized similarity (0.0 to 1.0) between two strings.
/// Inputs are trimmed and lowercased before the distance is computed, so
/// "Alice Smith" vs " alice smith " scores 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let dist = levenshtein(&a, &b);
    1.0 - (dist as f64 / max_len as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "hello"), 5);
        assert_eq!(levenshtein("hello", ""), 5);
    }

    #[test]
    fn test_levenshtein_substitution() {
        assert_eq!(levenshtein("smith", "smyth"), 1);
    }

    #[test]
    fn test_levenshtein_insertion_deletion() {
        assert_eq!(levenshtein("cat", "cart"), 1);
        assert_eq!(levenshtein("cart", "cat"), 1);
    }

    #[test]
    fn test_similarity_exact_after_normalization() {
        assert_eq!(similarity("Alice Smith", "  alice smith "), 1.0);
    }

    #[test]
    fn test_similarity_empty_both() {
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_similarity_one_edit() {
        // "alice smith" vs "alice smyth": 1 edit over 11 chars
        let sim = similarity("Alice Smith", "Alice Smyth");
        assert!((sim - (1.0 - 1.0 / 11.0)).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_disjoint() {
        assert!(similarity("abc", "xyz") < 0.01);
    }
}
