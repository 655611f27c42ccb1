//! Source-code scanning for spec links and step comments.
//!
//! A document is interesting when it carries a spec URL in a comment
//! (`// https://html.spec.whatwg.org/#navigate`) followed by numbered
//! step comments (`// Step 1. Let cspNavigationType be …`). The URL
//! opens a scope that runs until the next spec URL or end of file, and
//! every step comment inside it is validated against that algorithm.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::types::SpecUrl;

/// A spec URL found in a document.
#[derive(Debug, Clone)]
pub struct SpecLink {
    pub line: usize,
    pub col_start: usize,
    pub col_end: usize,
    pub spec: String,
    pub anchor: String,
    pub url: String,
}

/// A step comment found in a document.
#[derive(Debug, Clone)]
pub struct StepNote {
    pub line: usize,
    pub col_start: usize,
    pub col_end: usize,
    /// Hierarchical step path: `Step 5.1` → `[5, 1]`.
    pub number: Vec<u32>,
    pub text: String,
    /// Last line of a multi-line comment; None when single-line.
    pub end_line: Option<usize>,
}

/// Build the URL regex from the catalog's base URLs.
///
/// Matches single-page (`base/#anchor`) and multipage
/// (`base/multipage/page.html#anchor`) forms.
pub fn build_link_pattern(spec_urls: &[SpecUrl]) -> Regex {
    let bases: Vec<String> = spec_urls
        .iter()
        .map(|s| regex::escape(&s.base_url))
        .collect();
    let pattern = format!(r"({})/(?:[^\s#]*)?#([\w:._%{{}}\(\)-]+)", bases.join("|"));
    Regex::new(&pattern).expect("invalid spec link pattern")
}

/// Base-URL → spec-name lookup for the scanner.
pub fn build_base_lookup(spec_urls: &[SpecUrl]) -> HashMap<String, String> {
    spec_urls
        .iter()
        .map(|s| (s.base_url.clone(), s.spec.clone()))
        .collect()
}

/// Scan text for spec links, ordered by position.
pub fn find_spec_links(
    text: &str,
    pattern: &Regex,
    base_lookup: &HashMap<String, String>,
) -> Vec<SpecLink> {
    let mut links = Vec::new();
    for (line_num, line) in text.lines().enumerate() {
        for m in pattern.find_iter(line) {
            if let Some(caps) = pattern.captures(&line[m.start()..]) {
                let base = caps.get(1).map_or("", |c| c.as_str());
                let anchor = caps.get(2).map_or("", |c| c.as_str());
                links.push(SpecLink {
                    line: line_num,
                    col_start: m.start(),
                    col_end: m.end(),
                    spec: base_lookup.get(base).cloned().unwrap_or_default(),
                    anchor: anchor.to_string(),
                    url: m.as_str().to_string(),
                });
            }
        }
    }
    links
}

/// Step comment pattern across comment styles (`//`, `#`, `;`, `/* */`,
/// `*`). At least one signal is required on top of the bare number so
/// ordinary comments mentioning numbers don't match.
fn step_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?://|#|;+|/\*+|\*)\s*([Ss]tep\s+)?(\d{1,3}(?:\.\d{1,3})*)(\.)?(?:\s*(.*?))\s*(?:\*/)?$",
        )
        .expect("invalid step pattern")
    })
}

/// A plain comment line continuing the previous step's text.
fn continuation_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?://|#|;+|\*)\s*(.*?)\s*(?:\*/)?$").expect("invalid continuation pattern")
    })
}

/// Scan text for step comments, folding continuation lines into the
/// preceding note.
pub fn find_step_notes(text: &str) -> Vec<StepNote> {
    let step_re = step_pattern();
    let cont_re = continuation_pattern();
    let lines: Vec<&str> = text.lines().collect();
    let mut notes = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = step_re.captures(lines[i]) else {
            i += 1;
            continue;
        };

        let has_prefix = caps.get(1).is_some();
        let number_str = caps.get(2).map_or("", |c| c.as_str());
        let has_dot = caps.get(3).is_some();
        let mut text_buf = caps.get(4).map_or("", |c| c.as_str()).to_string();
        let multi_part = number_str.contains('.');

        if !has_prefix && !has_dot && !multi_part {
            i += 1;
            continue;
        }

        let col_start = caps.get(0).map_or(0, |c| c.start());
        let mut col_end = caps.get(0).map_or(0, |c| c.end());

        // Fold continuation lines until the next step, a blank comment,
        // or a non-comment line.
        let mut j = i + 1;
        while j < lines.len() {
            if step_re.is_match(lines[j]) {
                break;
            }
            let Some(cont) = cont_re.captures(lines[j]) else {
                break;
            };
            let cont_text = cont.get(1).map_or("", |c| c.as_str());
            if cont_text.is_empty() {
                break;
            }
            text_buf.push(' ');
            text_buf.push_str(cont_text);
            col_end = cont.get(0).map_or(col_end, |c| c.end());
            j += 1;
        }

        let number = number_str
            .split('.')
            .filter_map(|part| part.parse().ok())
            .collect();

        notes.push(StepNote {
            line: i,
            col_start,
            col_end,
            number,
            text: text_buf,
            end_line: (j > i + 1).then(|| j - 1),
        });
        i = j;
    }
    notes
}

/// The spec link under the cursor, if any.
pub fn link_at(links: &[SpecLink], line: usize, col: usize) -> Option<&SpecLink> {
    links
        .iter()
        .find(|l| l.line == line && l.col_start <= col && col <= l.col_end)
}

/// Group step notes under their governing spec link.
///
/// Each link opens a scope extending to the next link (or EOF). Notes
/// appearing before any link have no scope and are dropped.
pub fn group_scopes(
    links: &[SpecLink],
    notes: &[StepNote],
) -> Vec<(SpecLink, Vec<StepNote>)> {
    if links.is_empty() {
        return Vec::new();
    }

    let mut ordered: Vec<&SpecLink> = links.iter().collect();
    ordered.sort_by_key(|l| l.line);

    let mut scopes: Vec<(SpecLink, Vec<StepNote>)> = ordered
        .iter()
        .map(|l| ((*l).clone(), Vec::new()))
        .collect();

    let mut sorted_notes: Vec<&StepNote> = notes.iter().collect();
    sorted_notes.sort_by_key(|n| n.line);

    for note in sorted_notes {
        let owner = scopes
            .iter()
            .rposition(|(link, _)| link.line <= note.line);
        if let Some(idx) = owner {
            scopes[idx].1.push(note.clone());
        }
    }

    scopes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_urls() -> Vec<SpecUrl> {
        vec![
            SpecUrl {
                spec: "HTML".into(),
                base_url: "https://html.spec.whatwg.org".into(),
            },
            SpecUrl {
                spec: "DOM".into(),
                base_url: "https://dom.spec.whatwg.org".into(),
            },
        ]
    }

    fn pattern() -> Regex {
        build_link_pattern(&spec_urls())
    }

    fn lookup() -> HashMap<String, String> {
        build_base_lookup(&spec_urls())
    }

    // -- link pattern --

    #[test]
    fn test_single_page_url() {
        let caps = pattern()
            .captures("https://html.spec.whatwg.org/#navigate")
            .unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "https://html.spec.whatwg.org");
        assert_eq!(caps.get(2).unwrap().as_str(), "navigate");
    }

    #[test]
    fn test_multipage_url() {
        let caps = pattern()
            .captures("https://html.spec.whatwg.org/multipage/browsing-the-web.html#navigate")
            .unwrap();
        assert_eq!(caps.get(2).unwrap().as_str(), "navigate");
    }

    #[test]
    fn test_anchor_charset() {
        let caps = pattern()
            .captures("https://html.spec.whatwg.org/#concept-url-parser:percent-encoded-bytes")
            .unwrap();
        assert_eq!(
            caps.get(2).unwrap().as_str(),
            "concept-url-parser:percent-encoded-bytes"
        );
    }

    #[test]
    fn test_unknown_host_no_match() {
        assert!(pattern().captures("https://example.com/#foo").is_none());
    }

    #[test]
    fn test_fragment_required() {
        assert!(pattern().captures("https://html.spec.whatwg.org/").is_none());
    }

    // -- find_spec_links --

    #[test]
    fn test_link_in_comment() {
        let links = find_spec_links(
            "// https://html.spec.whatwg.org/#navigate",
            &pattern(),
            &lookup(),
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].spec, "HTML");
        assert_eq!(links[0].anchor, "navigate");
        assert_eq!(links[0].line, 0);
    }

    #[test]
    fn test_links_across_lines() {
        let text = "// https://html.spec.whatwg.org/#navigate\ncode();\n// https://dom.spec.whatwg.org/#concept-tree\n";
        let links = find_spec_links(text, &pattern(), &lookup());
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].spec, "DOM");
        assert_eq!(links[1].line, 2);
    }

    // -- find_step_notes --

    #[test]
    fn test_cpp_step() {
        let notes = find_step_notes("// Step 5.1. Assert: userInvolvement is browser UI");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].number, vec![5, 1]);
        assert!(notes[0].text.contains("Assert"));
    }

    #[test]
    fn test_prefixless_multipart() {
        let notes = find_step_notes("// 5.1 Let x be something");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].number, vec![5, 1]);
    }

    #[test]
    fn test_number_with_trailing_dot_only() {
        let notes = find_step_notes("// 5. Let x be something");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].number, vec![5]);
    }

    #[test]
    fn test_number_only_note() {
        let notes = find_step_notes("// Step 5.");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "");
    }

    #[test]
    fn test_hash_and_asm_comments() {
        assert_eq!(find_step_notes("# Step 3. Do something")[0].number, vec![3]);
        assert_eq!(find_step_notes("; Step 1. Assembly step")[0].number, vec![1]);
    }

    #[test]
    fn test_block_comment() {
        let notes = find_step_notes("/* Step 1. Init */");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "Init");
    }

    #[test]
    fn test_bare_numbers_ignored() {
        assert!(find_step_notes("// 42 is the answer to life").is_empty());
        assert!(find_step_notes("// Use port 8080").is_empty());
        assert!(find_step_notes("// This is just a regular comment").is_empty());
    }

    #[test]
    fn test_continuation_folding() {
        let notes = find_step_notes("// Step 2.1 Foo Bar baz\n//       continues here");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "Foo Bar baz continues here");
        assert_eq!(notes[0].line, 0);
        assert_eq!(notes[0].end_line, Some(1));
    }

    #[test]
    fn test_continuation_stops_at_next_step() {
        let notes = find_step_notes("// Step 1. First\n//   more first\n// Step 2. Second");
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].text, "First more first");
        assert_eq!(notes[1].text, "Second");
    }

    #[test]
    fn test_continuation_stops_at_code() {
        let notes = find_step_notes("// Step 1. First\ncode();\n// Step 2. Second");
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].text, "First");
        assert_eq!(notes[0].end_line, None);
    }

    #[test]
    fn test_deep_nesting() {
        let notes = find_step_notes("// Step 5.1.2 Deeply nested step");
        assert_eq!(notes[0].number, vec![5, 1, 2]);
    }

    // -- link_at --

    #[test]
    fn test_cursor_hits() {
        let text = "// https://html.spec.whatwg.org/#navigate";
        let links = find_spec_links(text, &pattern(), &lookup());
        assert!(link_at(&links, 0, 10).is_some());
        assert!(link_at(&links, 0, 0).is_none());
        assert!(link_at(&links, 1, 10).is_none());
    }

    // -- group_scopes --

    #[test]
    fn test_one_scope() {
        let text =
            "// https://html.spec.whatwg.org/#navigate\n// Step 1. First\n// Step 2. Second\n";
        let links = find_spec_links(text, &pattern(), &lookup());
        let notes = find_step_notes(text);
        let scopes = group_scopes(&links, &notes);
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].0.anchor, "navigate");
        assert_eq!(scopes[0].1.len(), 2);
    }

    #[test]
    fn test_two_scopes_split() {
        let text = "// https://html.spec.whatwg.org/#navigate\n// Step 1. From navigate\n// https://dom.spec.whatwg.org/#concept-tree\n// Step 1. From tree\n";
        let links = find_spec_links(text, &pattern(), &lookup());
        let notes = find_step_notes(text);
        let scopes = group_scopes(&links, &notes);
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].1.len(), 1);
        assert_eq!(scopes[1].1.len(), 1);
    }

    #[test]
    fn test_orphan_notes_dropped() {
        let text = "// Step 1. Orphan\n// https://html.spec.whatwg.org/#navigate\n// Step 2. Owned\n";
        let links = find_spec_links(text, &pattern(), &lookup());
        let notes = find_step_notes(text);
        let scopes = group_scopes(&links, &notes);
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].1.len(), 1);
        assert_eq!(scopes[0].1[0].number, vec![2]);
    }

    #[test]
    fn test_no_links_no_scopes() {
        let scopes = group_scopes(&[], &find_step_notes("// Step 1. Orphan"));
        assert!(scopes.is_empty());
    }
}
