//! Markdown rendering for hovers and tooltips.

use super::align::MatchGrade;
use super::StepFinding;
use crate::types::SectionReport;

/// Render a section report as hover markdown.
pub fn section_markdown(report: &SectionReport) -> String {
    let mut parts = Vec::new();

    let heading = report
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(&report.anchor);
    parts.push(format!("## {heading}"));

    if !report.kind.is_empty() {
        parts.push(format!(
            "*{}* | {}#{}",
            report.kind, report.spec, report.anchor
        ));
    }

    if let Some(body) = report.body.as_deref() {
        if !body.is_empty() {
            parts.push(body.to_string());
        }
    }

    parts.join("\n\n")
}

/// Render a graded step as hover markdown.
pub fn step_markdown(finding: &StepFinding) -> String {
    let label = step_label(&finding.note.number);
    match finding.grade {
        MatchGrade::Exact => format!("**Step {label}** \u{2014} exact match"),
        MatchGrade::Fuzzy => {
            let mut md = format!("**Step {label}** \u{2014} fuzzy match");
            if !finding.spec_text.is_empty() {
                md.push_str(&format!("\n\n**Spec:** {}", finding.spec_text));
            }
            md
        }
        MatchGrade::Drifted => {
            let mut md = format!("**Step {label}** \u{2014} text differs from spec");
            if !finding.spec_text.is_empty() {
                md.push_str(&format!("\n\n**Expected:** {}", finding.spec_text));
            }
            md
        }
        MatchGrade::Missing => {
            format!(
                "**Step {label}** \u{2014} not found in `{}`",
                finding.algorithm
            )
        }
    }
}

/// Dotted form of a hierarchical step number: `[5, 1]` → "5.1".
pub fn step_label(number: &[u32]) -> String {
    number
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::scan::StepNote;
    use crate::types::NavSummary;

    fn report(title: Option<&str>, kind: &str, body: Option<&str>) -> SectionReport {
        SectionReport {
            spec: "HTML".to_string(),
            sha: "abc".to_string(),
            anchor: "navigate".to_string(),
            title: title.map(str::to_string),
            kind: kind.to_string(),
            body: body.map(str::to_string),
            nav: NavSummary {
                parent: None,
                prev: None,
                next: None,
                children: vec![],
            },
            outgoing_refs: vec![],
            incoming_refs: vec![],
        }
    }

    fn finding(grade: MatchGrade, spec_text: &str) -> StepFinding {
        StepFinding {
            note: StepNote {
                line: 0,
                col_start: 0,
                col_end: 10,
                number: vec![5, 1],
                text: "whatever".into(),
                end_line: None,
            },
            grade,
            spec_text: spec_text.to_string(),
            algorithm: "navigate".to_string(),
        }
    }

    #[test]
    fn test_section_full() {
        let md = section_markdown(&report(
            Some("navigate"),
            "algorithm",
            Some("To **navigate** a navigable..."),
        ));
        assert!(md.contains("## navigate"));
        assert!(md.contains("*algorithm*"));
        assert!(md.contains("HTML#navigate"));
        assert!(md.contains("To **navigate**"));
    }

    #[test]
    fn test_section_title_falls_back_to_anchor() {
        let md = section_markdown(&report(Some(""), "", None));
        assert!(md.contains("## navigate"));
    }

    #[test]
    fn test_step_grades() {
        assert!(step_markdown(&finding(MatchGrade::Exact, "")).contains("exact match"));

        let fuzzy = step_markdown(&finding(MatchGrade::Fuzzy, "Let x be y."));
        assert!(fuzzy.contains("fuzzy match"));
        assert!(fuzzy.contains("**Spec:** Let x be y."));

        let drifted = step_markdown(&finding(MatchGrade::Drifted, "Let x be y."));
        assert!(drifted.contains("differs from spec"));
        assert!(drifted.contains("**Expected:**"));

        let missing = step_markdown(&finding(MatchGrade::Missing, ""));
        assert!(missing.contains("not found in `navigate`"));
        assert!(missing.contains("Step 5.1"));
    }

    #[test]
    fn test_step_label() {
        assert_eq!(step_label(&[5, 1, 2]), "5.1.2");
        assert_eq!(step_label(&[99]), "99");
    }
}
