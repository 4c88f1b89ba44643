//! Placeholder values that normalize to numeric zero.

/// Text values treated as "no data", compared after trimming and lower-casing.
pub const SENTINEL_VALUES: &[&str] = &["n/a", "no data", "undefined", "-", ""];

/// Whether a text cell value is a placeholder for a missing number.
pub fn is_sentinel(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    SENTINEL_VALUES.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(is_sentinel("N/A"));
        assert!(is_sentinel("  no data "));
        assert!(is_sentinel("Undefined"));
        assert!(is_sentinel("-"));
        assert!(is_sentinel(""));
        assert!(is_sentinel("   "));
    }

    #[test]
    fn test_regular_text_is_kept() {
        assert!(!is_sentinel("NA"));
        assert!(!is_sentinel("--"));
        assert!(!is_sentinel("0"));
        assert!(!is_sentinel("no data yet"));
        assert!(!is_sentinel("#N/A"));
    }
}
