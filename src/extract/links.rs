//! Cross-reference extraction.
//!
//! Walks the document once in order, tracking the current scope section
//! (headings and algorithms only — definitions are sub-sections and do
//! not open a new scope), and attributes every `<a href>` to it.

use scraper::{ElementRef, Html};
use std::collections::HashSet;

use crate::catalog::SpecCatalog;
use crate::types::{CrossRef, Section, SectionKind};

/// Placeholder target spec for intra-document references, resolved to the
/// actual spec name before returning.
const SELF_SPEC: &str = "self";

/// Extract deduplicated cross-references from a spec document.
pub fn collect_cross_refs(
    html: &str,
    spec_name: &str,
    sections: &[Section],
    catalog: &SpecCatalog,
) -> Vec<CrossRef> {
    let document = Html::parse_document(html);

    let scope_anchors: HashSet<&str> = sections
        .iter()
        .filter(|s| matches!(s.kind, SectionKind::Heading | SectionKind::Algorithm))
        .map(|s| s.anchor.as_str())
        .collect();

    let mut seen = HashSet::new();
    let mut refs = Vec::new();
    let mut scope: Option<String> = None;

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        if let Some(id) = element.value().attr("id") {
            if scope_anchors.contains(id) {
                scope = Some(id.to_string());
            }
        }

        if element.value().name() != "a" {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if is_self_link(&element) || is_biblio_link(&element) {
            continue;
        }
        let Some(from_anchor) = scope.as_deref() else {
            continue;
        };

        if let Some(mut xref) = target_of(href, from_anchor, catalog) {
            if xref.to_spec == SELF_SPEC {
                xref.to_spec = spec_name.to_string();
            }
            let key = (
                xref.from_anchor.clone(),
                xref.to_spec.clone(),
                xref.to_anchor.clone(),
            );
            if seen.insert(key) {
                refs.push(xref);
            }
        }
    }

    refs
}

fn is_self_link(link: &ElementRef) -> bool {
    link.value().classes().any(|c| c == "self-link")
}

fn is_biblio_link(link: &ElementRef) -> bool {
    link.value().attr("data-link-type") == Some("biblio")
}

/// Resolve an href to a reference target: `#foo` stays in-document,
/// absolute URLs go through the catalog, anything else is dropped.
fn target_of(href: &str, from_anchor: &str, catalog: &SpecCatalog) -> Option<CrossRef> {
    if let Some(anchor) = href.strip_prefix('#') {
        return Some(CrossRef {
            from_anchor: from_anchor.to_string(),
            to_spec: SELF_SPEC.to_string(),
            to_anchor: anchor.to_string(),
        });
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        let (spec, anchor) = catalog.resolve_url(href)?;
        return Some(CrossRef {
            from_anchor: from_anchor.to_string(),
            to_spec: spec,
            to_anchor: anchor,
        });
    }

    None
}
