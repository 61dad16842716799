//! Maven-style version ordering.
//!
//! Maven versions are not semver (`18.0`, `1.0-alpha-2`, `2.0.Final`,
//! `31.1-jre` are all real), so ordering is token-based: versions split on
//! separators and digit/letter boundaries, numeric tokens compare
//! numerically, and known qualifiers rank below the unqualified release.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(u64),
    Qualifier(String),
}

/// Rank of a qualifier token. Higher ranks order later. Rank 6 is the
/// release itself; `sp` patches sort above it, unknown qualifiers above
/// that (tie-broken lexically).
fn qualifier_rank(qualifier: &str) -> u8 {
    match qualifier {
        "alpha" | "a" => 1,
        "beta" | "b" => 2,
        "milestone" | "m" => 3,
        "rc" | "cr" => 4,
        "snapshot" => 5,
        "" | "ga" | "final" | "release" => 6,
        "sp" => 7,
        _ => 8,
    }
}

fn tokenize(version: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut numeric = false;
    for ch in version.chars() {
        if ch == '.' || ch == '-' || ch == '_' || ch == '+' {
            flush(&mut tokens, &mut current, numeric);
        } else if ch.is_ascii_digit() {
            if !current.is_empty() && !numeric {
                flush(&mut tokens, &mut current, numeric);
            }
            numeric = true;
            current.push(ch);
        } else {
            if !current.is_empty() && numeric {
                flush(&mut tokens, &mut current, numeric);
            }
            numeric = false;
            current.push(ch.to_ascii_lowercase());
        }
    }
    flush(&mut tokens, &mut current, numeric);
    tokens
}

fn flush(tokens: &mut Vec<Token>, current: &mut String, numeric: bool) {
    if current.is_empty() {
        return;
    }
    if numeric {
        tokens.push(Token::Number(current.parse().unwrap_or(u64::MAX)));
    } else {
        tokens.push(Token::Qualifier(current.clone()));
    }
    current.clear();
}

fn compare_tokens(a: &Token, b: &Token) -> Ordering {
    match (a, b) {
        (Token::Number(x), Token::Number(y)) => x.cmp(y),
        (Token::Qualifier(x), Token::Qualifier(y)) => {
            let (rank_x, rank_y) = (qualifier_rank(x), qualifier_rank(y));
            if rank_x != rank_y {
                rank_x.cmp(&rank_y)
            } else if rank_x == 8 {
                x.cmp(y)
            } else {
                Ordering::Equal
            }
        }
        // A trailing zero pads against the bare release: 1.0 == 1.0.0.
        (Token::Number(0), Token::Qualifier(q)) if qualifier_rank(q) == 6 => Ordering::Equal,
        (Token::Qualifier(q), Token::Number(0)) if qualifier_rank(q) == 6 => Ordering::Equal,
        // Any other number outranks any qualifier: 1.0.1 > 1.0-sp.
        (Token::Number(_), Token::Qualifier(_)) => Ordering::Greater,
        (Token::Qualifier(_), Token::Number(_)) => Ordering::Less,
    }
}

/// Compare two version strings.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    let padding = Token::Qualifier(String::new());
    let len = tokens_a.len().max(tokens_b.len());
    for i in 0..len {
        let token_a = tokens_a.get(i).unwrap_or(&padding);
        let token_b = tokens_b.get(i).unwrap_or(&padding);
        match compare_tokens(token_a, token_b) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_less(a: &str, b: &str) {
        assert_eq!(compare(a, b), Ordering::Less, "{a} < {b}");
        assert_eq!(compare(b, a), Ordering::Greater, "{b} > {a}");
    }

    fn assert_same(a: &str, b: &str) {
        assert_eq!(compare(a, b), Ordering::Equal, "{a} == {b}");
    }

    #[test]
    fn test_numeric_ordering() {
        assert_less("1.0", "1.1");
        assert_less("1.9", "1.10");
        assert_less("2", "10");
        assert_less("1.0", "1.0.1");
    }

    #[test]
    fn test_qualifiers_rank_below_release() {
        assert_less("1.0-alpha", "1.0-beta");
        assert_less("1.0-beta", "1.0-milestone");
        assert_less("1.0-milestone", "1.0-rc");
        assert_less("1.0-rc", "1.0-SNAPSHOT");
        assert_less("1.0-SNAPSHOT", "1.0");
        assert_less("1.0", "1.0-sp");
    }

    #[test]
    fn test_cr_aliases_rc() {
        assert_same("1.0-rc", "1.0-cr");
    }

    #[test]
    fn test_qualifiers_are_case_insensitive() {
        assert_same("1.0-ALPHA", "1.0-alpha");
        assert_less("1.0-Beta", "1.0");
    }

    #[test]
    fn test_unknown_qualifiers_sort_lexically_above_sp() {
        assert_less("1.0-sp", "1.0-android");
        assert_less("1.0-android", "1.0-jre");
    }

    #[test]
    fn test_release_markers_equal_bare_version() {
        assert_same("2.0", "2.0.Final");
        assert_same("2.0", "2.0-ga");
        assert_same("2.0", "2.0.RELEASE");
    }

    #[test]
    fn test_trailing_zero_padding() {
        assert_same("1.0", "1.0.0");
        assert_less("1.0", "1.0.0.1");
    }

    #[test]
    fn test_digit_letter_boundary_splits() {
        assert_less("1.0a1", "1.0b1");
        assert_less("9.4.21.v20190926", "9.4.22.v20191022");
    }

    #[test]
    fn test_real_world_versions() {
        assert_less("30.1.1-android", "31.1-jre");
        assert_less("1.0-alpha-2", "1.0-alpha-10");
        assert_less("2.17.1", "2.17.2");
    }

    #[test]
    fn test_sorting_a_sequence() {
        let mut versions = vec!["1.0", "1.0-rc1", "1.1", "1.0-SNAPSHOT", "1.0-alpha"];
        versions.sort_by(|a, b| compare(a, b));
        assert_eq!(versions, vec!["1.0-alpha", "1.0-rc1", "1.0-SNAPSHOT", "1.0", "1.1"]);
    }
}
