//! Spec document extraction.
//!
//! Turns a fetched spec HTML document into the structured form the store
//! indexes: anchored sections with markdown bodies, a parent/sibling
//! tree, and cross-references.

pub mod content;
pub mod links;
pub mod prose;

use anyhow::Result;
use scraper::{Html, Selector};

use crate::catalog::SpecCatalog;
use crate::types::ParsedDocument;

/// Parse a complete spec document.
///
/// Sections come from one document-order pass over anchored headings and
/// `dfn`s, so tree relationships reflect the document layout.
pub fn extract_document(
    html: &str,
    spec_name: &str,
    base_url: &str,
    catalog: &SpecCatalog,
) -> Result<ParsedDocument> {
    let document = Html::parse_document(html);
    let converter = prose::build_prose_converter(base_url);

    let selector = Selector::parse("h2[id], h3[id], h4[id], h5[id], h6[id], dfn[id]")
        .map_err(|e| anyhow::anyhow!("Invalid section selector: {e:?}"))?;

    let mut sections = Vec::new();
    for element in document.select(&selector) {
        let section = match element.value().name() {
            "dfn" => content::dfn_section(&element, &converter),
            _ => content::heading_section(&element, &converter),
        };
        if let Some(section) = section {
            sections.push(section);
        }
    }

    let sections = content::link_tree(sections);
    let cross_refs = links::collect_cross_refs(html, spec_name, &sections, catalog);

    Ok(ParsedDocument {
        sections,
        cross_refs,
    })
}
