//! End-to-end lens pipeline over a navigate-style fixture.
//!
//! The fixture carries a spec URL comment and step comments 1, 2, 3, and
//! a deliberately nonexistent 99. With the navigate algorithm indexed,
//! the lens must grade 1-3 as matching and flag 99 as missing.

use std::sync::Arc;

use chrono::Utc;
use speclens::catalog::SpecCatalog;
use speclens::config::AppConfig;
use speclens::indexer::Indexer;
use speclens::lens::align::MatchGrade;
use speclens::lens::coverage::{compute_coverage, GradedStep};
use speclens::lens::outline::parse_outline;
use speclens::lens::scan::{
    build_base_lookup, build_link_pattern, find_spec_links, find_step_notes, group_scopes,
};
use speclens::lens::{grade_notes, StepFinding};
use speclens::store::SpecStore;
use speclens::types::{Section, SectionKind, SpecRef};

const FIXTURE: &str = include_str!("fixtures/do_navigate.cpp");

const NAVIGATE_BODY: &str = "To **navigate** a navigable:\n\n\
    1. Let *cspNavigationType* be \"`form-submission`\".\n\
    2. Let *sourceSnapshotParams* be the result of snapshotting.\n\
    3. If *url* is about:blank, then return.";

/// An indexer whose store already holds HTML#navigate at a known SHA,
/// with the head cache warm so nothing touches the network.
async fn seeded_indexer() -> Indexer {
    let store = SpecStore::open_in_memory().await.unwrap();
    let spec_id = store
        .upsert_spec("HTML", "https://html.spec.whatwg.org", "whatwg")
        .await
        .unwrap();
    let snapshot_id = store
        .insert_snapshot(spec_id, "abc123", "2026-01-01T00:00:00Z")
        .await
        .unwrap();
    store
        .insert_sections(
            snapshot_id,
            &[Section {
                anchor: "navigate".into(),
                title: Some("navigate".into()),
                body_md: Some(NAVIGATE_BODY.into()),
                kind: SectionKind::Algorithm,
                parent_anchor: None,
                prev_anchor: None,
                next_anchor: None,
                level: None,
            }],
        )
        .await
        .unwrap();
    store
        .record_head("whatwg/html", "abc123", &Utc::now())
        .await
        .unwrap();

    let catalog = Arc::new(SpecCatalog::new(&AppConfig::default()).unwrap());
    Indexer::new(store, catalog, 24)
}

async fn fixture_findings() -> Vec<StepFinding> {
    let indexer = seeded_indexer().await;
    let spec_urls = indexer.catalog().spec_urls();
    let pattern = build_link_pattern(&spec_urls);
    let lookup = build_base_lookup(&spec_urls);

    let links = find_spec_links(FIXTURE, &pattern, &lookup);
    let notes = find_step_notes(FIXTURE);
    let scopes = group_scopes(&links, &notes);
    assert_eq!(scopes.len(), 1);

    let (link, scoped_notes) = &scopes[0];
    let report = indexer
        .section_report(
            &SpecRef {
                spec: link.spec.clone(),
                anchor: link.anchor.clone(),
            },
            None,
        )
        .await
        .unwrap();

    let steps = parse_outline(report.body.as_deref().unwrap());
    grade_notes(scoped_notes, &steps, &link.anchor, 0.85)
}

#[tokio::test]
async fn fixture_scan_finds_url_and_steps() {
    let indexer = seeded_indexer().await;
    let spec_urls = indexer.catalog().spec_urls();
    let pattern = build_link_pattern(&spec_urls);
    let lookup = build_base_lookup(&spec_urls);

    let links = find_spec_links(FIXTURE, &pattern, &lookup);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].spec, "HTML");
    assert_eq!(links[0].anchor, "navigate");
    assert_eq!(links[0].line, 0);

    // The fixture's step markers are exactly {1, 2, 3, 99}.
    let notes = find_step_notes(FIXTURE);
    let numbers: Vec<&[u32]> = notes.iter().map(|n| n.number.as_slice()).collect();
    assert_eq!(
        numbers,
        vec![&[1u32][..], &[2u32][..], &[3u32][..], &[99u32][..]]
    );
}

#[tokio::test]
async fn fixture_step_99_flagged_missing() {
    let findings = fixture_findings().await;
    assert_eq!(findings.len(), 4);

    // Steps 1-3 align with the indexed algorithm. The comment for step 1
    // drops the quote marks the spec puts around "form-submission", so it
    // grades fuzzy rather than exact.
    assert_eq!(findings[0].grade, MatchGrade::Fuzzy);
    assert_eq!(findings[1].grade, MatchGrade::Exact);
    assert_eq!(findings[2].grade, MatchGrade::Exact);

    // Step 99 has no corresponding entry in the cited algorithm.
    assert_eq!(findings[3].note.number, vec![99]);
    assert_eq!(findings[3].grade, MatchGrade::Missing);
    assert!(findings[3].grade.is_warning());
    assert!(findings[3].spec_text.is_empty());
}

#[tokio::test]
async fn fixture_coverage_counts_missing_as_warning() {
    let findings = fixture_findings().await;

    let steps = parse_outline(NAVIGATE_BODY);
    let graded: Vec<GradedStep> = findings
        .iter()
        .map(|f| GradedStep {
            note: f.note.clone(),
            grade: f.grade,
        })
        .collect();

    let coverage = compute_coverage(&graded, &steps, "navigate");
    assert_eq!(coverage.total_steps, 3);
    assert_eq!(coverage.implemented_count(), 3);
    assert!(coverage.missing.is_empty());
    assert_eq!(coverage.warnings, 1);
    assert_eq!(coverage.reordered, 0);
    assert_eq!(coverage.summary(), "navigate: 3/3 steps | 1 warning");
}
