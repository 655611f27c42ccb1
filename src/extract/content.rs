//! Section extraction from spec markup.
//!
//! Specs produced by Bikeshed and Wattsi anchor their queryable units on
//! `h2..h6[id]` headings and `dfn[id]` definitions. A `dfn` may define a
//! plain term, an algorithm (wrapped in `div.algorithm` or followed by a
//! sibling `<ol>` of steps), or a WebIDL type (inside a highlighted
//! `<pre>`). This module turns those elements into `Section` values and
//! wires up the parent/sibling tree.

use htmd::HtmlToMarkdown;
use scraper::{ElementRef, Node};

use super::prose::{element_markdown, html_markdown};
use crate::types::{Section, SectionKind};

/// Depth of a heading tag, 2-6.
pub fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Build a `Section` from a heading element. None when the heading has no
/// usable anchor.
pub fn heading_section(element: &ElementRef, converter: &HtmlToMarkdown) -> Option<Section> {
    let anchor = element.value().attr("id")?.to_string();
    let level = heading_level(element.value().name())?;

    Some(Section {
        anchor,
        title: heading_title(element),
        body_md: heading_body(element, level, converter),
        kind: SectionKind::Heading,
        parent_anchor: None,
        prev_anchor: None,
        next_anchor: None,
        level: Some(level),
    })
}

/// Title text of a heading, with section numbers and self-links stripped.
fn heading_title(element: &ElementRef) -> Option<String> {
    let mut parts = Vec::new();

    for node in element.children() {
        if let Some(child) = ElementRef::wrap(node) {
            let classes: Vec<_> = child.value().classes().collect();
            if classes.contains(&"secno") || classes.contains(&"self-link") {
                continue;
            }
            parts.push(child.text().collect::<String>());
        } else if let Some(text) = node.value().as_text() {
            parts.push(text.to_string());
        }
    }

    let title = parts.concat().trim().to_string();
    (!title.is_empty()).then_some(title)
}

/// Markdown of everything between a heading and the next section boundary
/// (a heading of the same or higher level, or an anchored `dfn`).
fn heading_body(element: &ElementRef, level: u8, converter: &HtmlToMarkdown) -> Option<String> {
    let mut collected = String::new();
    let mut current = element.next_sibling();

    while let Some(node) = current {
        if let Some(sibling) = ElementRef::wrap(node) {
            let tag = sibling.value().name();

            if let Some(sibling_level) = heading_level(tag) {
                if sibling_level <= level {
                    break;
                }
            }
            if tag == "dfn" && sibling.value().attr("id").is_some() {
                break;
            }

            collected.push_str(&sibling.html());
        }
        current = node.next_sibling();
    }

    if collected.trim().is_empty() {
        return None;
    }

    let md = html_markdown(&collected, converter);
    (!md.is_empty()).then_some(md)
}

/// Build a `Section` from an anchored `dfn`, classifying it as an
/// algorithm, IDL type, or plain definition. Returns None for dfns that
/// are not standalone sections (parameters, step-internal terms).
pub fn dfn_section(element: &ElementRef, converter: &HtmlToMarkdown) -> Option<Section> {
    let anchor = element.value().attr("id")?.to_string();

    // Terms defined inside an algorithm's step list belong to the
    // algorithm's body, not the section table.
    if in_algorithm_steps(element) {
        return None;
    }

    // Parameter dfns: data-dfn-for without data-dfn-type, a direct <var>
    // child, or an explicit argument type.
    let has_dfn_for = element.value().attr("data-dfn-for").is_some();
    let has_dfn_type = element.value().attr("data-dfn-type").is_some();
    let has_var_child = element
        .children()
        .filter_map(ElementRef::wrap)
        .any(|c| c.value().name() == "var");
    if (has_dfn_for && !has_dfn_type) || has_var_child {
        return None;
    }
    if element.value().attr("data-dfn-type") == Some("argument") {
        return None;
    }

    let title = element.text().collect::<String>().trim().to_string();
    let title = (!title.is_empty()).then_some(title);

    let (kind, body_md) = if in_algorithm_context(element) {
        (SectionKind::Algorithm, algorithm_body(element, converter))
    } else if is_idl_dfn(element) {
        (SectionKind::Idl, idl_body(element))
    } else {
        (SectionKind::Definition, definition_body(element, converter))
    };

    Some(Section {
        anchor,
        title,
        body_md,
        kind,
        parent_anchor: None,
        prev_anchor: None,
        next_anchor: None,
        level: None,
    })
}

/// Whether a `dfn` carries a WebIDL type attribute.
fn is_idl_dfn(element: &ElementRef) -> bool {
    matches!(
        element.value().attr("data-dfn-type"),
        Some("interface")
            | Some("dictionary")
            | Some("enum")
            | Some("callback")
            | Some("callback interface")
            | Some("typedef")
    )
}

/// Whether an element sits inside an `<ol>` that belongs to an algorithm,
/// covering both the Bikeshed wrapper div and the Wattsi sibling pattern.
fn in_algorithm_steps(element: &ElementRef) -> bool {
    let mut current = element.parent();
    while let Some(node) = current {
        let Some(parent) = ElementRef::wrap(node) else {
            current = node.parent();
            continue;
        };

        if parent.value().name() == "ol" {
            // Bikeshed: the <ol> lives under div.algorithm
            let mut ancestor = parent.parent();
            while let Some(anc_node) = ancestor {
                if let Some(anc) = ElementRef::wrap(anc_node) {
                    if is_algorithm_div(&anc) {
                        return true;
                    }
                }
                ancestor = anc_node.parent();
            }

            // Wattsi: a preceding block holds the defining dfn
            let mut prev = node.prev_sibling();
            while let Some(prev_node) = prev {
                if let Some(prev_elem) = ElementRef::wrap(prev_node) {
                    if matches!(prev_elem.value().name(), "p" | "dd" | "li") {
                        if let Ok(selector) = scraper::Selector::parse("dfn[id]") {
                            if prev_elem.select(&selector).next().is_some() {
                                return true;
                            }
                        }
                    }
                    if matches!(
                        prev_elem.value().name(),
                        "p" | "div" | "h2" | "h3" | "h4" | "h5" | "h6"
                    ) {
                        break;
                    }
                }
                prev = prev_node.prev_sibling();
            }

            return false;
        }

        current = node.parent();
    }
    false
}

fn is_algorithm_div(element: &ElementRef) -> bool {
    element.value().name() == "div"
        && (element.value().classes().any(|c| c == "algorithm")
            || element.value().attr("data-algorithm").is_some())
}

/// Whether a `dfn` defines an algorithm: an ancestor algorithm div, or an
/// enclosing block with a following `<ol>` sibling.
fn in_algorithm_context(element: &ElementRef) -> bool {
    let mut current = element.parent();
    while let Some(node) = current {
        if let Some(parent) = ElementRef::wrap(node) {
            if is_algorithm_div(&parent) {
                return true;
            }

            if matches!(parent.value().name(), "p" | "div" | "dd" | "li") {
                let mut sibling = node.next_sibling();
                while let Some(sib_node) = sibling {
                    if let Some(sib) = ElementRef::wrap(sib_node) {
                        if sib.value().name() == "ol" {
                            return true;
                        }
                        if matches!(
                            sib.value().name(),
                            "p" | "div" | "h2" | "h3" | "h4" | "h5" | "h6"
                        ) {
                            break;
                        }
                    }
                    sibling = sib_node.next_sibling();
                }
            }
        }
        current = node.parent();
    }
    false
}

/// Body of a plain definition: the enclosing block element as markdown.
fn definition_body(element: &ElementRef, converter: &HtmlToMarkdown) -> Option<String> {
    let mut current = element.parent();
    while let Some(node) = current {
        if let Some(parent) = ElementRef::wrap(node) {
            if matches!(
                parent.value().name(),
                "p" | "div" | "dd" | "dt" | "li" | "section"
            ) {
                return Some(element_markdown(&parent, converter));
            }
        }
        current = node.parent();
    }
    Some(element.text().collect::<String>().trim().to_string())
}

/// Body of an algorithm: intro prose plus the numbered step list.
fn algorithm_body(element: &ElementRef, converter: &HtmlToMarkdown) -> Option<String> {
    let mut current = element.parent();
    while let Some(node) = current {
        if let Some(parent) = ElementRef::wrap(node) {
            if is_algorithm_div(&parent) {
                return algorithm_div_body(&parent, converter);
            }

            // Wattsi: <p>To <dfn>x</dfn>:</p><ol>…</ol>
            if matches!(parent.value().name(), "p" | "dd" | "li") {
                let intro = element_markdown(&parent, converter);
                let mut sibling = node.next_sibling();
                while let Some(sib_node) = sibling {
                    if let Some(sib) = ElementRef::wrap(sib_node) {
                        if sib.value().name() == "ol" {
                            let steps = render_steps_list(&sib, converter);
                            return Some(format!("{}\n\n{}", intro.trim(), steps));
                        }
                        if matches!(
                            sib.value().name(),
                            "p" | "div" | "h2" | "h3" | "h4" | "h5" | "h6"
                        ) {
                            break;
                        }
                    }
                    sibling = sib_node.next_sibling();
                }
            }
        }
        current = node.parent();
    }
    None
}

/// Body of an algorithm wrapped in `div.algorithm`: children before the
/// first `<ol>` form the intro, the `<ol>` forms the steps.
fn algorithm_div_body(div: &ElementRef, converter: &HtmlToMarkdown) -> Option<String> {
    let ol_selector = scraper::Selector::parse("ol").ok()?;
    let ol = div.select(&ol_selector).next()?;

    let mut intro_html = String::new();
    for child in div.children() {
        if let Some(child_elem) = ElementRef::wrap(child) {
            if child_elem.value().name() == "ol" {
                break;
            }
            intro_html.push_str(&child_elem.html());
        } else if let Some(text) = child.value().as_text() {
            intro_html.push_str(text);
        }
    }

    let intro = html_markdown(&intro_html, converter);
    let steps = render_steps_list(&ol, converter);
    Some(format!("{intro}\n\n{steps}"))
}

/// Body of an IDL type: the enclosing `<pre>` with highlighting stripped.
fn idl_body(element: &ElementRef) -> Option<String> {
    let mut current = element.parent();
    while let Some(node) = current {
        if let Some(parent) = ElementRef::wrap(node) {
            if parent.value().name() == "pre" {
                return Some(idl_text(&parent));
            }
        }
        current = node.parent();
    }
    None
}

/// Raw IDL text from a `<pre>` block: highlighting tags (`<c- …>`,
/// `<code>`) are dropped, whitespace is preserved exactly apart from a
/// trailing trim.
pub fn idl_text(pre: &ElementRef) -> String {
    fn collect(element: &ElementRef, out: &mut String) {
        for child in element.children() {
            if let Some(child_elem) = ElementRef::wrap(child) {
                collect(&child_elem, out);
            } else if let Node::Text(text) = child.value() {
                out.push_str(text);
            }
        }
    }

    let mut out = String::new();
    collect(pre, &mut out);
    out.trim_end().to_string()
}

// ---------------------------------------------------------------------------
// Step list rendering
// ---------------------------------------------------------------------------

/// Render an algorithm's `<ol>` as a markdown numbered list, nesting via
/// 4-space indentation so downstream step parsing can recover the tree.
pub fn render_steps_list(ol: &ElementRef, converter: &HtmlToMarkdown) -> String {
    let mut out = String::new();
    let mut number = 1;

    for child in ol.children() {
        if let Some(item) = ElementRef::wrap(child) {
            if item.value().name() == "li" {
                out.push_str(&render_step_item(&item, number, 0, converter));
                number += 1;
            } else {
                // Notes and examples interleaved between steps
                let md = element_markdown(&item, converter);
                if !md.is_empty() {
                    out.push_str("\n\n");
                    out.push_str(&md);
                    out.push('\n');
                }
            }
        }
    }

    out.trim_end().to_string()
}

fn render_step_item(
    li: &ElementRef,
    number: usize,
    indent: usize,
    converter: &HtmlToMarkdown,
) -> String {
    let mut out = String::new();
    out.push_str(&"    ".repeat(indent));
    out.push_str(&format!("{number}. "));

    // Runs of inline/block content between nested lists convert as one
    // chunk, so mixed text/<var>/<code> step prose stays on one line.
    let mut chunk = String::new();
    let mut first_done = false;

    for child in li.children() {
        if let Some(child_elem) = ElementRef::wrap(child) {
            match child_elem.value().name() {
                "ol" => {
                    flush_chunk(&mut chunk, &mut out, &mut first_done, indent, converter);
                    out.push_str("\n\n");
                    let mut sub_number = 1;
                    for sub in child_elem.children() {
                        if let Some(sub_li) = ElementRef::wrap(sub) {
                            if sub_li.value().name() == "li" {
                                out.push_str(&render_step_item(
                                    &sub_li,
                                    sub_number,
                                    indent + 1,
                                    converter,
                                ));
                                sub_number += 1;
                            }
                        }
                    }
                    first_done = true;
                }
                "ul" => {
                    flush_chunk(&mut chunk, &mut out, &mut first_done, indent, converter);
                    out.push_str("\n\n");
                    out.push_str(&render_bullets(&child_elem, indent + 1, converter));
                    first_done = true;
                }
                _ => chunk.push_str(&child_elem.html()),
            }
        } else if let Node::Text(text) = child.value() {
            chunk.push_str(text);
        }
    }
    flush_chunk(&mut chunk, &mut out, &mut first_done, indent, converter);

    out
}

/// Convert and emit an accumulated HTML chunk. The first chunk's first
/// line continues the step's marker line; everything later is indented
/// one level so it stays attached to the step.
fn flush_chunk(
    chunk: &mut String,
    out: &mut String,
    first_done: &mut bool,
    indent: usize,
    converter: &HtmlToMarkdown,
) {
    if chunk.trim().is_empty() {
        chunk.clear();
        return;
    }
    let md = html_markdown(chunk, converter);
    chunk.clear();
    if md.is_empty() {
        return;
    }

    if !*first_done {
        *first_done = true;
        let mut lines = md.lines();
        if let Some(first) = lines.next() {
            out.push_str(first);
            out.push('\n');
        }
        let rest = lines.collect::<Vec<_>>().join("\n");
        if !rest.trim().is_empty() {
            out.push_str(&indent_block(&rest, indent + 1));
            out.push('\n');
        }
    } else {
        out.push_str("\n\n");
        out.push_str(&indent_block(&md, indent + 1));
        out.push('\n');
    }
}

fn render_bullets(ul: &ElementRef, indent: usize, converter: &HtmlToMarkdown) -> String {
    let mut out = String::new();
    for child in ul.children() {
        if let Some(item) = ElementRef::wrap(child) {
            if item.value().name() == "li" {
                let md = element_markdown(&item, converter);
                out.push_str(&"    ".repeat(indent));
                out.push_str(&format!("* {}\n", md.trim()));
            }
        }
    }
    out
}

fn indent_block(text: &str, indent: usize) -> String {
    let prefix = "    ".repeat(indent);
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tree building
// ---------------------------------------------------------------------------

/// Fill in parent/prev/next links for a document-ordered section list.
///
/// Headings nest by level; dfn-derived sections attach to the most recent
/// heading. Siblings share both level and parent.
pub fn link_tree(mut sections: Vec<Section>) -> Vec<Section> {
    for i in 0..sections.len() {
        match sections[i].level {
            Some(level) => {
                for j in (0..i).rev() {
                    if let Some(candidate) = sections[j].level {
                        if candidate < level {
                            sections[i].parent_anchor = Some(sections[j].anchor.clone());
                            break;
                        }
                    }
                }
            }
            None => {
                for j in (0..i).rev() {
                    if sections[j].level.is_some() {
                        sections[i].parent_anchor = Some(sections[j].anchor.clone());
                        break;
                    }
                }
            }
        }
    }

    for i in 0..sections.len() {
        let level = sections[i].level;
        let parent = sections[i].parent_anchor.clone();

        for j in (0..i).rev() {
            if sections[j].level == level && sections[j].parent_anchor == parent {
                sections[i].prev_anchor = Some(sections[j].anchor.clone());
                break;
            }
        }
        for j in (i + 1)..sections.len() {
            if sections[j].level == level && sections[j].parent_anchor == parent {
                sections[i].next_anchor = Some(sections[j].anchor.clone());
                break;
            }
        }
    }

    sections
}
