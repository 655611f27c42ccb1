//! Markdown rendering for CLI reports.
//!
//! JSON is the default output format; these renderers back `--format
//! markdown` for human consumption.

use crate::types::{
    AnchorsReport, ExistsReport, HeadingEntry, NavLink, RefsReport, SearchReport, SectionReport,
    SpecUrlEntry,
};

fn nav_line(label: &str, link: &NavLink) -> String {
    match link.title.as_deref() {
        Some(title) => format!("- {}: `{}` — {}\n", label, link.anchor, title),
        None => format!("- {}: `{}`\n", label, link.anchor),
    }
}

/// Render a section report.
pub fn section(report: &SectionReport) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}#{}\n\n", report.spec, report.anchor));
    match &report.title {
        Some(title) => md.push_str(&format!("**{}** ({})\n\n", title, report.kind)),
        None => md.push_str(&format!("**Type**: {}\n\n", report.kind)),
    }
    md.push_str(&format!("**Revision**: {}\n\n", report.sha));

    if let Some(body) = &report.body {
        md.push_str("## Content\n\n");
        md.push_str(body);
        md.push_str("\n\n");
    }

    md.push_str("## Navigation\n\n");
    if let Some(parent) = &report.nav.parent {
        md.push_str(&nav_line("Parent", parent));
    }
    if let Some(prev) = &report.nav.prev {
        md.push_str(&nav_line("Prev", prev));
    }
    if let Some(next) = &report.nav.next {
        md.push_str(&nav_line("Next", next));
    }
    if !report.nav.children.is_empty() {
        md.push_str(&format!("- Children: {}\n", report.nav.children.len()));
        for child in &report.nav.children {
            md.push_str(&format!("  {}", nav_line("", child).trim_start_matches("- ")));
        }
    }

    if !report.outgoing_refs.is_empty() {
        md.push_str(&format!(
            "\n## Outgoing refs ({})\n\n",
            report.outgoing_refs.len()
        ));
        for r in &report.outgoing_refs {
            md.push_str(&format!("- {}#{}\n", r.spec, r.anchor));
        }
    }
    if !report.incoming_refs.is_empty() {
        md.push_str(&format!(
            "\n## Incoming refs ({})\n\n",
            report.incoming_refs.len()
        ));
        for r in &report.incoming_refs {
            md.push_str(&format!("- {}#{}\n", r.spec, r.anchor));
        }
    }

    md
}

/// Render an existence check.
pub fn exists(report: &ExistsReport) -> String {
    if report.exists {
        format!(
            "{}#{} exists ({})",
            report.spec,
            report.anchor,
            report.kind.as_deref().unwrap_or("unknown")
        )
    } else {
        format!("{}#{} not found", report.spec, report.anchor)
    }
}

/// Render anchor pattern matches.
pub fn anchors(report: &AnchorsReport) -> String {
    let mut md = format!(
        "# Anchors matching `{}` ({})\n\n",
        report.pattern,
        report.results.len()
    );
    for hit in &report.results {
        let title = hit.title.as_deref().unwrap_or("");
        md.push_str(&format!(
            "- **{}#{}** ({}) {}\n",
            hit.spec, hit.anchor, hit.kind, title
        ));
    }
    md
}

/// Render full-text search results.
pub fn search(report: &SearchReport) -> String {
    let mut md = format!(
        "# Search `{}` ({})\n\n",
        report.query,
        report.results.len()
    );
    for hit in &report.results {
        md.push_str(&format!("## {}#{} ({})\n\n", hit.spec, hit.anchor, hit.kind));
        if !hit.snippet.is_empty() {
            md.push_str(&format!("{}\n\n", hit.snippet));
        }
    }
    md
}

/// Render a spec's heading outline.
pub fn headings(entries: &[HeadingEntry]) -> String {
    let mut md = String::new();
    for entry in entries {
        let indent = "  ".repeat((entry.level.saturating_sub(2)) as usize);
        let title = entry.title.as_deref().unwrap_or(&entry.anchor);
        md.push_str(&format!("{}- {} (`{}`)\n", indent, title, entry.anchor));
    }
    md
}

/// Render a references report.
pub fn refs(report: &RefsReport) -> String {
    let mut md = format!("# References for `{}`\n\n", report.anchor);
    if let Some(outgoing) = &report.outgoing {
        md.push_str(&format!("## Outgoing ({})\n\n", outgoing.len()));
        for r in outgoing {
            md.push_str(&format!("- {}#{}\n", r.spec, r.anchor));
        }
        md.push('\n');
    }
    if let Some(incoming) = &report.incoming {
        md.push_str(&format!("## Incoming ({})\n\n", incoming.len()));
        for r in incoming {
            md.push_str(&format!("- {}#{}\n", r.spec, r.anchor));
        }
    }
    md
}

/// Render the spec catalog.
pub fn specs(entries: &[SpecUrlEntry]) -> String {
    let mut md = String::from("| Spec | Publisher | URL |\n|------|-----------|-----|\n");
    for entry in entries {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            entry.spec, entry.publisher, entry.base_url
        ));
    }
    md
}
