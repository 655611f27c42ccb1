//! The lens: validate spec-step comments in source code.
//!
//! Scanning finds spec URLs and step comments, the outline recovers the
//! algorithm's step tree from the index, alignment grades each comment,
//! and coverage aggregates the result. The language server and the
//! `check` command are both thin drivers over this pipeline.

pub mod align;
pub mod coverage;
pub mod hover;
pub mod scan;
pub mod server;

pub mod outline;

use self::align::{grade, MatchGrade};
use self::outline::{find_step, OutlineStep};
use self::scan::StepNote;

/// A graded step note with its context.
#[derive(Debug, Clone)]
pub struct StepFinding {
    pub note: StepNote,
    pub grade: MatchGrade,
    /// The spec step's text, empty when the step is missing.
    pub spec_text: String,
    /// Anchor of the algorithm the note was graded against.
    pub algorithm: String,
}

/// Grade every step note in one scope against an algorithm outline.
pub fn grade_notes(
    notes: &[StepNote],
    steps: &[OutlineStep],
    algorithm: &str,
    threshold: f64,
) -> Vec<StepFinding> {
    notes
        .iter()
        .map(|note| match find_step(steps, &note.number) {
            Some(step) => StepFinding {
                note: note.clone(),
                grade: grade(&note.text, &step.text, threshold),
                spec_text: step.text.clone(),
                algorithm: algorithm.to_string(),
            },
            None => StepFinding {
                note: note.clone(),
                grade: MatchGrade::Missing,
                spec_text: String::new(),
                algorithm: algorithm.to_string(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::outline::parse_outline;

    const ALGO: &str = "To **navigate**:\n\n1. Let *cspNavigationType* be `form-submission`.\n2. Let *sourceSnapshotParams* be the result of snapshotting.\n3. If *url* is about:blank, then return.";

    fn note(number: Vec<u32>, text: &str) -> StepNote {
        StepNote {
            line: 0,
            col_start: 0,
            col_end: 20,
            number,
            text: text.to_string(),
            end_line: None,
        }
    }

    #[test]
    fn test_grades_against_outline() {
        let steps = parse_outline(ALGO);
        let notes = vec![
            note(vec![1], "Let cspNavigationType be form-submission"),
            note(vec![2], "Let sourceSnapshotParams be the result of snapshotting"),
            note(vec![3], "Something else entirely happens here"),
            note(vec![99], "Nonexistent step"),
        ];

        let findings = grade_notes(&notes, &steps, "navigate", 0.85);
        assert_eq!(findings.len(), 4);
        assert_eq!(findings[0].grade, MatchGrade::Exact);
        assert_eq!(findings[1].grade, MatchGrade::Exact);
        assert_eq!(findings[2].grade, MatchGrade::Drifted);
        assert_eq!(findings[3].grade, MatchGrade::Missing);
        assert!(findings[3].spec_text.is_empty());
        assert!(!findings[0].spec_text.is_empty());
        assert_eq!(findings[0].algorithm, "navigate");
    }
}
