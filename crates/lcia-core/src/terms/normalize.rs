/// Normalize a synonym into the key used by the term dictionaries.
///
/// Steps:
/// 1. Trim and lowercase
/// 2. Collapse runs of whitespace into a single space
/// 3. Rewrite CAS-number-looking terms into canonical `NNNNNNN-NN-N` form
pub fn normalize_term(raw: &str) -> String {
    if let Some(cas) = cas_number(raw) {
        return cas;
    }

    let lower = raw.trim().to_lowercase();
    let mut result = String::with_capacity(lower.len());
    let mut prev_space = false;
    for c in lower.chars() {
        if c.is_whitespace() {
            if !prev_space {
                result.push(' ');
            }
            prev_space = true;
        } else {
            result.push(c);
            prev_space = false;
        }
    }
    result
}

/// Interpret a term as a CAS registry number.
///
/// Accepts digits with or without hyphens ("7732-18-5", "7732185",
/// "007732-18-5"). Leading zeros are dropped. The check digit is not
/// validated; upstream data carries too many bad check digits for that.
pub fn cas_number(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || c == '-') {
        return None;
    }

    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.trim_start_matches('0');
    if digits.len() < 5 || digits.len() > 10 {
        return None;
    }

    // Hyphenated input must already follow the N-NN-N layout
    if s.contains('-') {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 3 || parts[1].len() != 2 || parts[2].len() != 1 || parts[0].is_empty()
        {
            return None;
        }
    }

    let n = digits.len();
    Some(format!(
        "{}-{}-{}",
        &digits[..n - 3],
        &digits[n - 3..n - 1],
        &digits[n - 1..]
    ))
}

/// True for terms meaning "no context".
pub fn is_null_term(raw: &str) -> bool {
    matches!(
        normalize_term(raw).as_str(),
        "" | "none" | "null" | "n/a" | "unspecified context"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_term() {
        assert_eq!(normalize_term("Water"), "water");
    }

    #[test]
    fn test_whitespace_handling() {
        assert_eq!(normalize_term("  Carbon   dioxide\t fossil "), "carbon dioxide fossil");
    }

    #[test]
    fn test_cas_unhyphenated() {
        assert_eq!(cas_number("1234567"), Some("1234-56-7".to_string()));
        assert_eq!(normalize_term("1234567"), "1234-56-7");
    }

    #[test]
    fn test_cas_leading_zeros() {
        assert_eq!(cas_number("007732-18-5"), Some("7732-18-5".to_string()));
        assert_eq!(cas_number("0000124389"), Some("124-38-9".to_string()));
    }

    #[test]
    fn test_not_cas() {
        assert_eq!(cas_number("1234"), None);
        assert_eq!(cas_number("12-345-67"), None);
        assert_eq!(cas_number("water"), None);
        assert_eq!(cas_number(""), None);
    }

    #[test]
    fn test_null_terms() {
        assert!(is_null_term("None"));
        assert!(is_null_term("  "));
        assert!(!is_null_term("air"));
    }
}
