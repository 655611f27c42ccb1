//! Shared types for speclens.
//!
//! These types form the data model used across all modules: the static
//! spec catalog, parsed spec sections, and the report shapes serialized
//! by the CLI and HTTP API. They are designed to be stable so that
//! source, store, and lens modules can depend on them without circular
//! references.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Static metadata for one specification in the catalog.
#[derive(Debug, Clone)]
pub struct SpecDescriptor {
    /// Short uppercase name used in `SPEC#anchor` references: "HTML", "DOM".
    pub name: &'static str,
    /// Canonical base URL without trailing slash.
    pub base_url: &'static str,
    /// Publisher identifier: "whatwg" | "w3c" | "tc39".
    pub publisher: &'static str,
    /// GitHub repository holding the spec source, "org/repo".
    pub repo: &'static str,
}

/// A `(spec name, base URL)` pair handed to the source scanner.
#[derive(Debug, Clone)]
pub struct SpecUrl {
    pub spec: String,
    pub base_url: String,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// What kind of section an anchor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Heading,
    Algorithm,
    Definition,
    Idl,
    Prose,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Heading => "heading",
            SectionKind::Algorithm => "algorithm",
            SectionKind::Definition => "definition",
            SectionKind::Idl => "idl",
            SectionKind::Prose => "prose",
        }
    }
}

impl std::str::FromStr for SectionKind {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heading" => Ok(SectionKind::Heading),
            "algorithm" => Ok(SectionKind::Algorithm),
            "definition" => Ok(SectionKind::Definition),
            "idl" => Ok(SectionKind::Idl),
            "prose" => Ok(SectionKind::Prose),
            other => Err(LensError::BadSectionKind(other.to_string())),
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One anchored section extracted from a spec document.
#[derive(Debug, Clone)]
pub struct Section {
    pub anchor: String,
    pub title: Option<String>,
    /// Markdown rendering of the section body. None for empty sections.
    pub body_md: Option<String>,
    pub kind: SectionKind,
    pub parent_anchor: Option<String>,
    pub prev_anchor: Option<String>,
    pub next_anchor: Option<String>,
    /// Heading depth 2-6; None for dfn-derived sections.
    pub level: Option<u8>,
}

/// A link from one section to another, possibly in a different spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossRef {
    pub from_anchor: String,
    pub to_spec: String,
    pub to_anchor: String,
}

/// Everything extracted from one spec document.
#[derive(Debug)]
pub struct ParsedDocument {
    pub sections: Vec<Section>,
    pub cross_refs: Vec<CrossRef>,
}

// ---------------------------------------------------------------------------
// Reports (CLI / API output)
// ---------------------------------------------------------------------------

/// Full report for a single section, as returned by `query`.
#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub spec: String,
    pub sha: String,
    pub anchor: String,
    pub title: Option<String>,
    pub kind: String,
    pub body: Option<String>,
    pub nav: NavSummary,
    pub outgoing_refs: Vec<RefLink>,
    pub incoming_refs: Vec<RefLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavSummary {
    pub parent: Option<NavLink>,
    pub prev: Option<NavLink>,
    pub next: Option<NavLink>,
    pub children: Vec<NavLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavLink {
    pub anchor: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefLink {
    pub spec: String,
    pub anchor: String,
}

#[derive(Debug, Serialize)]
pub struct ExistsReport {
    pub exists: bool,
    pub spec: String,
    pub anchor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnchorHit {
    pub spec: String,
    pub anchor: String,
    pub title: Option<String>,
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub spec: String,
    pub anchor: String,
    pub title: Option<String>,
    pub kind: String,
    pub snippet: String,
}

#[derive(Debug, Serialize)]
pub struct AnchorsReport {
    pub pattern: String,
    pub results: Vec<AnchorHit>,
}

#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
pub struct RefsReport {
    pub anchor: String,
    pub direction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outgoing: Option<Vec<RefLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming: Option<Vec<RefLink>>,
}

#[derive(Debug, Serialize)]
pub struct HeadingEntry {
    pub anchor: String,
    pub title: Option<String>,
    pub level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpecUrlEntry {
    pub spec: String,
    pub base_url: String,
    pub publisher: String,
}

/// Result of refreshing one spec.
#[derive(Debug, Serialize)]
pub struct RefreshOutcome {
    pub spec: String,
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

// ---------------------------------------------------------------------------
// Spec references
// ---------------------------------------------------------------------------

/// A parsed `SPEC#anchor` reference as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRef {
    pub spec: String,
    pub anchor: String,
}

impl std::str::FromStr for SpecRef {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('#') {
            Some((spec, anchor)) if !spec.is_empty() && !anchor.is_empty() => Ok(SpecRef {
                spec: spec.to_string(),
                anchor: anchor.to_string(),
            }),
            _ => Err(LensError::BadSpecRef(s.to_string())),
        }
    }
}

impl fmt::Display for SpecRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.spec, self.anchor)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for speclens.
#[derive(Debug, thiserror::Error)]
pub enum LensError {
    #[error("Unknown spec: {0}")]
    UnknownSpec(String),

    #[error("Section not found: {spec}#{anchor}")]
    UnknownAnchor { spec: String, anchor: String },

    #[error("No source registered for publisher: {0}")]
    UnknownPublisher(String),

    #[error("Invalid reference '{0}': expected SPEC#anchor (e.g. HTML#navigate)")]
    BadSpecRef(String),

    #[error("Invalid section kind: {0}")]
    BadSectionKind(String),

    #[error("Snapshot not found for {spec} at {sha}")]
    UnknownSnapshot { spec: String, sha: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // -- SectionKind tests --

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            SectionKind::Heading,
            SectionKind::Algorithm,
            SectionKind::Definition,
            SectionKind::Idl,
            SectionKind::Prose,
        ] {
            let parsed = SectionKind::from_str(kind.as_str()).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_kind_rejects_unknown() {
        assert!(SectionKind::from_str("chapter").is_err());
    }

    #[test]
    fn test_kind_serde_lowercase() {
        let json = serde_json::to_string(&SectionKind::Idl).unwrap();
        assert_eq!(json, "\"idl\"");
        let back: SectionKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SectionKind::Idl);
    }

    // -- SpecRef tests --

    #[test]
    fn test_spec_ref_parse() {
        let r = SpecRef::from_str("HTML#navigate").unwrap();
        assert_eq!(r.spec, "HTML");
        assert_eq!(r.anchor, "navigate");
        assert_eq!(r.to_string(), "HTML#navigate");
    }

    #[test]
    fn test_spec_ref_keeps_fragment_punctuation() {
        let r = SpecRef::from_str("HTML#concept-url-parser:basic").unwrap();
        assert_eq!(r.anchor, "concept-url-parser:basic");
    }

    #[test]
    fn test_spec_ref_rejects_malformed() {
        assert!(SpecRef::from_str("HTML").is_err());
        assert!(SpecRef::from_str("#navigate").is_err());
        assert!(SpecRef::from_str("HTML#").is_err());
    }

    // -- LensError tests --

    #[test]
    fn test_error_display() {
        let e = LensError::UnknownAnchor {
            spec: "HTML".into(),
            anchor: "no-such".into(),
        };
        assert_eq!(format!("{e}"), "Section not found: HTML#no-such");

        let e = LensError::BadSpecRef("oops".into());
        assert!(format!("{e}").contains("SPEC#anchor"));
    }
}
