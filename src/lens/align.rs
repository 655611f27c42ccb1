//! Alignment of step comments with spec text.
//!
//! A step comment is graded against the spec step it claims to
//! implement. Comments quoting the spec verbatim (modulo markup and
//! punctuation) are Exact; truncations and near-misses are Fuzzy;
//! diverging text is Drifted; a step number with no spec counterpart is
//! Missing — the grade a checker assigns to "Step 99. Nonexistent step".

use regex::Regex;
use std::sync::OnceLock;
use strsim::jaro_winkler;

use super::outline::strip_markdown;

/// How well a step comment lines up with the spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchGrade {
    /// Comment text equals the spec step text after normalization.
    Exact,
    /// Prefix, substring, or high-similarity match.
    Fuzzy,
    /// The step exists but the comment says something else.
    Drifted,
    /// The referenced step number does not exist in the algorithm.
    Missing,
}

impl MatchGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchGrade::Exact => "exact",
            MatchGrade::Fuzzy => "fuzzy",
            MatchGrade::Drifted => "drifted",
            MatchGrade::Missing => "missing",
        }
    }

    /// Whether this grade should surface as a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, MatchGrade::Drifted | MatchGrade::Missing)
    }
}

/// Normalize text for comparison: strip markdown, collapse whitespace,
/// lowercase, drop trailing punctuation.
pub fn normalize(text: &str) -> String {
    static WS_RE: OnceLock<Regex> = OnceLock::new();
    static TRAILING_RE: OnceLock<Regex> = OnceLock::new();

    let ws = WS_RE.get_or_init(|| Regex::new(r"\s+").unwrap());
    let trailing = TRAILING_RE.get_or_init(|| Regex::new(r"[.,:;!?]+$").unwrap());

    let text = strip_markdown(text);
    let text = ws.replace_all(&text, " ");
    let text = text.trim().to_lowercase();
    trailing.replace(&text, "").to_string()
}

/// Grade a step comment against the spec step's text.
///
/// Number-only comments (no prose) always count as Exact: the author is
/// tagging the step, not quoting it.
pub fn grade(comment_text: &str, spec_text: &str, threshold: f64) -> MatchGrade {
    let comment = normalize(comment_text);
    if comment.is_empty() {
        return MatchGrade::Exact;
    }

    let spec = normalize(spec_text);
    if spec.is_empty() {
        return MatchGrade::Drifted;
    }

    if comment == spec {
        return MatchGrade::Exact;
    }

    if spec.starts_with(&comment)
        || comment.starts_with(&spec)
        || spec.contains(&comment)
        || comment.contains(&spec)
    {
        return MatchGrade::Fuzzy;
    }

    if jaro_winkler(&comment, &spec) >= threshold {
        return MatchGrade::Fuzzy;
    }

    MatchGrade::Drifted
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- normalize --

    #[test]
    fn test_normalize_strips_markup() {
        assert_eq!(normalize("Let *x* be **y**"), "let x be y");
        assert_eq!(
            normalize("the \"`form-submission`\" type"),
            "the \"form-submission\" type"
        );
        assert_eq!(normalize("[Assert](https://example.com): foo"), "assert: foo");
    }

    #[test]
    fn test_normalize_whitespace_and_case() {
        assert_eq!(normalize("foo   bar\tbaz"), "foo bar baz");
        assert_eq!(normalize("Assert: userInvolvement"), "assert: userinvolvement");
    }

    #[test]
    fn test_normalize_trailing_punctuation() {
        assert_eq!(normalize("some text."), "some text");
        assert_eq!(normalize("some text..."), "some text");
        assert_eq!(normalize("some text;"), "some text");
        assert_eq!(normalize(""), "");
    }

    // -- grade --

    #[test]
    fn test_exact_modulo_markup() {
        let g = grade(
            "Let cspNavigationType be form-submission",
            "Let *cspNavigationType* be `form-submission`",
            0.85,
        );
        assert_eq!(g, MatchGrade::Exact);
    }

    #[test]
    fn test_number_only_is_exact() {
        assert_eq!(grade("", "Some spec text", 0.85), MatchGrade::Exact);
        assert_eq!(grade("   ", "Some spec text", 0.85), MatchGrade::Exact);
        assert_eq!(grade("", "", 0.85), MatchGrade::Exact);
    }

    #[test]
    fn test_truncated_comment_is_fuzzy() {
        let g = grade(
            "Let cspNavigationType be",
            "Let *cspNavigationType* be \"`form-submission`\" if *formDataEntryList* is non-null",
            0.85,
        );
        assert_eq!(g, MatchGrade::Fuzzy);
    }

    #[test]
    fn test_near_miss_is_fuzzy() {
        let g = grade(
            "Let sourceSnapshotParams be the result of snapshoting",
            "Let sourceSnapshotParams be the result of snapshotting",
            0.85,
        );
        assert_eq!(g, MatchGrade::Fuzzy);
    }

    #[test]
    fn test_divergent_text_is_drifted() {
        let g = grade(
            "Do something completely different",
            "Let x be the result of running foo",
            0.85,
        );
        assert_eq!(g, MatchGrade::Drifted);
    }

    #[test]
    fn test_empty_spec_text_is_drifted() {
        assert_eq!(grade("some comment", "", 0.85), MatchGrade::Drifted);
    }

    #[test]
    fn test_warning_grades() {
        assert!(!MatchGrade::Exact.is_warning());
        assert!(!MatchGrade::Fuzzy.is_warning());
        assert!(MatchGrade::Drifted.is_warning());
        assert!(MatchGrade::Missing.is_warning());
    }
}
