//! Coverage: how much of a spec algorithm a source file implements.

use std::collections::{HashMap, HashSet};

use super::align::MatchGrade;
use super::outline::{flatten, OutlineStep};
use super::scan::StepNote;

/// A graded step note.
#[derive(Debug, Clone)]
pub struct GradedStep {
    pub note: StepNote,
    pub grade: MatchGrade,
}

/// Coverage of one algorithm scope.
#[derive(Debug, Clone)]
pub struct CoverageSummary {
    pub anchor: String,
    pub total_steps: usize,
    pub implemented: Vec<Vec<u32>>,
    pub missing: Vec<Vec<u32>>,
    pub warnings: usize,
    /// Steps implemented out of spec order.
    pub reordered: usize,
}

impl CoverageSummary {
    pub fn implemented_count(&self) -> usize {
        self.implemented.len()
    }

    /// One-line summary for code lens display.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "{}: {}/{} steps",
            self.anchor,
            self.implemented_count(),
            self.total_steps
        )];
        if self.warnings > 0 {
            let s = if self.warnings != 1 { "s" } else { "" };
            parts.push(format!("{} warning{s}", self.warnings));
        }
        if self.reordered > 0 {
            parts.push(format!("{} reordered", self.reordered));
        }
        parts.join(" | ")
    }
}

/// Longest strictly increasing subsequence length (patience sorting).
fn lis_length(seq: &[usize]) -> usize {
    let mut tails: Vec<usize> = Vec::new();
    for &value in seq {
        match tails.binary_search(&value) {
            Ok(_) => {} // duplicate, cannot extend a strict chain
            Err(pos) => {
                if pos == tails.len() {
                    tails.push(value);
                } else {
                    tails[pos] = value;
                }
            }
        }
    }
    tails.len()
}

/// Compute coverage of an algorithm from its graded step notes.
///
/// Exact/Fuzzy/Drifted notes mark their step implemented (Drifted also
/// warns); Missing notes only warn. Duplicate notes count once. Ordering
/// is judged by comparing the comment sequence against spec order.
pub fn compute_coverage(
    graded: &[GradedStep],
    steps: &[OutlineStep],
    anchor: &str,
) -> CoverageSummary {
    let flat = flatten(steps);

    let step_index: HashMap<&[u32], usize> = flat
        .iter()
        .enumerate()
        .map(|(i, s)| (s.number.as_slice(), i))
        .collect();

    let mut implemented: Vec<Vec<u32>> = Vec::new();
    let mut implemented_set: HashSet<Vec<u32>> = HashSet::new();
    let mut order_indices: Vec<usize> = Vec::new();
    let mut warnings = 0;

    for g in graded {
        match g.grade {
            MatchGrade::Exact | MatchGrade::Fuzzy | MatchGrade::Drifted => {
                if implemented_set.insert(g.note.number.clone()) {
                    implemented.push(g.note.number.clone());
                    if let Some(&idx) = step_index.get(g.note.number.as_slice()) {
                        order_indices.push(idx);
                    }
                }
                if g.grade == MatchGrade::Drifted {
                    warnings += 1;
                }
            }
            MatchGrade::Missing => {
                warnings += 1;
            }
        }
    }

    let missing: Vec<Vec<u32>> = flat
        .iter()
        .filter(|s| !implemented_set.contains(&s.number))
        .map(|s| s.number.clone())
        .collect();

    let reordered = order_indices.len().saturating_sub(lis_length(&order_indices));

    CoverageSummary {
        anchor: anchor.to_string(),
        total_steps: flat.len(),
        implemented,
        missing,
        warnings,
        reordered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::outline::parse_outline;

    const SIMPLE: &str = "1. First.\n2. Second.\n3. Third.";
    const NESTED: &str = "1. Parent.\n\n    1. Child one.\n    2. Child two.\n2. Other.\n";

    fn graded(number: Vec<u32>, grade: MatchGrade) -> GradedStep {
        GradedStep {
            note: StepNote {
                line: 0,
                col_start: 0,
                col_end: 10,
                number,
                text: String::new(),
                end_line: None,
            },
            grade,
        }
    }

    // -- lis_length --

    #[test]
    fn test_lis() {
        assert_eq!(lis_length(&[]), 0);
        assert_eq!(lis_length(&[5]), 1);
        assert_eq!(lis_length(&[1, 2, 3, 4, 5]), 5);
        assert_eq!(lis_length(&[5, 4, 3, 2, 1]), 1);
        assert_eq!(lis_length(&[1, 3, 2, 5]), 3);
        assert_eq!(lis_length(&[1, 1, 1]), 1);
        assert_eq!(lis_length(&[3, 1, 4, 1, 5, 9, 2, 6]), 4);
    }

    // -- compute_coverage --

    #[test]
    fn test_full_coverage() {
        let steps = parse_outline(SIMPLE);
        let vals = vec![
            graded(vec![1], MatchGrade::Exact),
            graded(vec![2], MatchGrade::Exact),
            graded(vec![3], MatchGrade::Exact),
        ];
        let cov = compute_coverage(&vals, &steps, "test");
        assert_eq!(cov.total_steps, 3);
        assert_eq!(cov.implemented_count(), 3);
        assert!(cov.missing.is_empty());
        assert_eq!(cov.warnings, 0);
        assert_eq!(cov.reordered, 0);
    }

    #[test]
    fn test_partial_coverage() {
        let steps = parse_outline(SIMPLE);
        let vals = vec![
            graded(vec![1], MatchGrade::Exact),
            graded(vec![3], MatchGrade::Fuzzy),
        ];
        let cov = compute_coverage(&vals, &steps, "test");
        assert_eq!(cov.implemented_count(), 2);
        assert_eq!(cov.missing, vec![vec![2u32]]);
        assert_eq!(cov.warnings, 0);
    }

    #[test]
    fn test_drifted_counts_with_warning() {
        let steps = parse_outline(SIMPLE);
        let vals = vec![
            graded(vec![1], MatchGrade::Exact),
            graded(vec![2], MatchGrade::Drifted),
        ];
        let cov = compute_coverage(&vals, &steps, "test");
        assert_eq!(cov.implemented_count(), 2);
        assert_eq!(cov.warnings, 1);
        assert_eq!(cov.missing, vec![vec![3u32]]);
    }

    #[test]
    fn test_missing_step_only_warns() {
        let steps = parse_outline(SIMPLE);
        let vals = vec![
            graded(vec![1], MatchGrade::Exact),
            graded(vec![99], MatchGrade::Missing),
        ];
        let cov = compute_coverage(&vals, &steps, "test");
        assert_eq!(cov.implemented_count(), 1);
        assert_eq!(cov.warnings, 1);
        assert_eq!(cov.missing.len(), 2);
    }

    #[test]
    fn test_reordered_steps_detected() {
        let steps = parse_outline(SIMPLE);
        let vals = vec![
            graded(vec![3], MatchGrade::Exact),
            graded(vec![1], MatchGrade::Exact),
            graded(vec![2], MatchGrade::Exact),
        ];
        let cov = compute_coverage(&vals, &steps, "test");
        assert_eq!(cov.implemented_count(), 3);
        assert_eq!(cov.reordered, 1);
    }

    #[test]
    fn test_duplicates_count_once() {
        let steps = parse_outline(SIMPLE);
        let vals = vec![
            graded(vec![1], MatchGrade::Exact),
            graded(vec![1], MatchGrade::Exact),
            graded(vec![2], MatchGrade::Exact),
        ];
        let cov = compute_coverage(&vals, &steps, "test");
        assert_eq!(cov.implemented_count(), 2);
        assert_eq!(cov.missing, vec![vec![3u32]]);
    }

    #[test]
    fn test_nested_coverage() {
        let steps = parse_outline(NESTED);
        let vals = vec![
            graded(vec![1], MatchGrade::Exact),
            graded(vec![1, 2], MatchGrade::Fuzzy),
        ];
        let cov = compute_coverage(&vals, &steps, "test");
        assert_eq!(cov.total_steps, 4);
        assert_eq!(cov.implemented_count(), 2);
        assert!(cov.missing.contains(&vec![1, 1]));
        assert!(cov.missing.contains(&vec![2]));
    }

    #[test]
    fn test_no_notes() {
        let steps = parse_outline(SIMPLE);
        let cov = compute_coverage(&[], &steps, "test");
        assert_eq!(cov.implemented_count(), 0);
        assert_eq!(cov.missing.len(), 3);
    }

    // -- summary --

    #[test]
    fn test_summary_lines() {
        let cov = CoverageSummary {
            anchor: "navigate".into(),
            total_steps: 23,
            implemented: (1..=23).map(|i| vec![i]).collect(),
            missing: vec![],
            warnings: 0,
            reordered: 0,
        };
        assert_eq!(cov.summary(), "navigate: 23/23 steps");

        let cov = CoverageSummary {
            anchor: "navigate".into(),
            total_steps: 23,
            implemented: vec![vec![1], vec![2], vec![3]],
            missing: (4..=23).map(|i| vec![i]).collect(),
            warnings: 2,
            reordered: 1,
        };
        assert_eq!(cov.summary(), "navigate: 3/23 steps | 2 warnings | 1 reordered");

        let cov = CoverageSummary {
            anchor: "t".into(),
            total_steps: 5,
            implemented: vec![vec![1]],
            missing: vec![],
            warnings: 1,
            reordered: 0,
        };
        let s = cov.summary();
        assert!(s.contains("1 warning"));
        assert!(!s.contains("warnings"));
    }
}
