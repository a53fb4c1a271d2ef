use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("username cannot be empty")]
    Empty,

    #[error("username '{0}' can only contain letters, digits and underscores")]
    InvalidCharacters(String),
}

fn is_canonical_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'
}

/// Canonicalize an account identifier: trim, uppercase, then require `[A-Z0-9_]+`.
/// Only ASCII letters are case-mapped, so non-ASCII input never folds into a valid name.
pub fn normalize(raw: &str) -> Result<String, UsernameError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UsernameError::Empty);
    }

    let username = trimmed.to_ascii_uppercase();
    if !username.chars().all(is_canonical_char) {
        return Err(UsernameError::InvalidCharacters(trimmed.to_string()));
    }

    Ok(username)
}

/// Read-path variant of [`normalize`]: uppercases and drops every disallowed
/// character instead of failing. Returns an empty string when nothing valid remains.
pub fn loose_normalize(raw: &str) -> String {
    raw.to_ascii_uppercase()
        .chars()
        .filter(|c| is_canonical_char(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("JUAN", "JUAN")]
    #[case("juan", "JUAN")]
    #[case(" juan ", "JUAN")]
    #[case("\tj_u_a_n\n", "J_U_A_N")]
    #[case("__j__123", "__J__123")]
    #[case("J123", "J123")]
    fn test_normalize_accepts(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_normalize_rejects_empty(#[case] raw: &str) {
        assert_eq!(normalize(raw), Err(UsernameError::Empty));
    }

    #[rstest]
    #[case("j@uan")]
    #[case("J@123")]
    #[case("ju an")]
    #[case("juan-1")]
    #[case("jüan")]
    #[case("straße")]
    #[case("ﬁnance")]
    fn test_normalize_rejects_invalid_characters(#[case] raw: &str) {
        assert!(matches!(
            normalize(raw),
            Err(UsernameError::InvalidCharacters(_))
        ));
    }

    #[rstest]
    #[case("j@uan", "JUAN")]
    #[case(" mary ", "MARY")]
    #[case("a-b_c", "AB_C")]
    #[case("@@@", "")]
    #[case("", "")]
    #[case("straße", "STRAE")]
    #[case("ﬁnance", "NANCE")]
    fn test_loose_normalize(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(loose_normalize(raw), expected);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(" Mary_01 ").unwrap();
        assert_eq!(normalize(&once).unwrap(), once);
    }
}
