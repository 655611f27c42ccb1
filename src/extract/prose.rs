//! HTML-to-markdown conversion tuned for spec prose.
//!
//! Wraps `htmd` with handlers for the markup conventions shared by
//! Bikeshed and Wattsi output: self-links, section numbers, `<var>`
//! parameters, note/example/warning containers, and property tables.

use htmd::element_handler::Handlers;
use htmd::{Element, HtmlToMarkdown};

/// Build a converter for one spec. `base_url` absolutizes `#anchor` links
/// so extracted markdown remains meaningful outside the document.
pub fn build_prose_converter(base_url: &str) -> HtmlToMarkdown {
    let base = base_url.to_string();

    HtmlToMarkdown::builder()
        // <a>: drop self-links, flatten biblio refs, absolutize fragments
        .add_handler(
            vec!["a"],
            move |handlers: &dyn Handlers, element: Element| {
                let mut href: Option<String> = None;
                let mut self_link = false;
                let mut biblio = false;

                for attr in element.attrs.iter() {
                    let name = &attr.name.local;
                    if *name == *"href" {
                        href = Some(attr.value.to_string());
                    } else if *name == *"class" && has_class(&attr.value, "self-link") {
                        self_link = true;
                    } else if *name == *"data-link-type" && &*attr.value == "biblio" {
                        biblio = true;
                    }
                }

                if self_link {
                    return None;
                }

                let content = handlers.walk_children(element.node).content;

                if biblio {
                    return Some(content.into());
                }

                let Some(href) = href else {
                    return Some(content.into());
                };

                let url = if let Some(fragment) = href.strip_prefix('#') {
                    format!("{base}#{fragment}")
                } else {
                    href
                };

                Some(format!("[{content}]({url})").into())
            },
        )
        // <code> → `content`; links inside become [`text`](url)
        .add_handler(vec!["code"], |handlers: &dyn Handlers, element: Element| {
            let content = handlers.walk_children(element.node).content;
            if content.is_empty() {
                return Some("".into());
            }
            match markdown_link_parts(&content) {
                Some((text, url)) => Some(format!("[`{text}`]({url})").into()),
                None => Some(format!("`{content}`").into()),
            }
        })
        // <var> → *content*; links inside become [*text*](url)
        .add_handler(vec!["var"], |handlers: &dyn Handlers, element: Element| {
            let content = handlers.walk_children(element.node).content;
            if content.is_empty() {
                return Some("".into());
            }
            match markdown_link_parts(&content) {
                Some((text, url)) => Some(format!("[*{text}*]({url})").into()),
                None => Some(format!("*{content}*").into()),
            }
        })
        // <dfn> → **content**
        .add_handler(vec!["dfn"], |handlers: &dyn Handlers, element: Element| {
            let content = handlers.walk_children(element.node).content;
            if content.is_empty() {
                return Some("".into());
            }
            Some(format!("**{content}**").into())
        })
        // <span class="secno"> carries the section number; drop it
        .add_handler(vec!["span"], |handlers: &dyn Handlers, element: Element| {
            for attr in element.attrs.iter() {
                if *attr.name.local == *"class" && has_class(&attr.value, "secno") {
                    return None;
                }
            }
            Some(handlers.walk_children(element.node))
        })
        // <dl class="props"> → markdown table; other <dl> pass through
        .add_handler(vec!["dl"], |handlers: &dyn Handlers, element: Element| {
            let is_props = element
                .attrs
                .iter()
                .any(|attr| *attr.name.local == *"class" && has_class(&attr.value, "props"));

            if is_props {
                Some(props_table(element.node).into())
            } else {
                Some(handlers.walk_children(element.node))
            }
        })
        // Note/example/warning/issue containers → labelled blockquotes
        .add_handler(
            vec!["div", "dd", "p"],
            |handlers: &dyn Handlers, element: Element| {
                let mut label: Option<&str> = None;
                for attr in element.attrs.iter() {
                    if *attr.name.local == *"class" {
                        if has_class(&attr.value, "note") {
                            label = Some("**Note:** ");
                        } else if has_class(&attr.value, "example") {
                            label = Some("**Example:** ");
                        } else if has_class(&attr.value, "warning") {
                            label = Some("**Warning:** ");
                        } else if has_class(&attr.value, "issue") || has_class(&attr.value, "XXX") {
                            label = Some("**Issue:** ");
                        }
                        break;
                    }
                }

                let content = handlers.walk_children(element.node).content;

                if let Some(label) = label {
                    return Some(blockquote_with_label(&content, label).into());
                }
                if element.tag == "p" {
                    Some(format!("{}\n\n", content.trim()).into())
                } else {
                    Some(content.into())
                }
            },
        )
        .build()
}

/// Convert a scraper element's outer HTML to trimmed markdown.
pub fn element_markdown(element: &scraper::ElementRef, converter: &HtmlToMarkdown) -> String {
    html_markdown(&element.html(), converter)
}

/// Convert raw HTML to trimmed markdown.
pub fn html_markdown(html: &str, converter: &HtmlToMarkdown) -> String {
    converter
        .convert(html)
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn has_class(attr_value: &str, class: &str) -> bool {
    attr_value.split_whitespace().any(|c| c == class)
}

/// Split a markdown link `[text](url)` into its parts, if that is the
/// entire (trimmed) string.
fn markdown_link_parts(s: &str) -> Option<(String, String)> {
    let s = s.trim();
    let rest = s.strip_prefix('[')?;
    let close = rest.find(']')?;
    let text = &rest[..close];
    let tail = rest[close + 1..].strip_prefix('(')?;
    let close = tail.find(')')?;
    Some((text.to_string(), tail[..close].to_string()))
}

/// Render content as a blockquote, with `label` prefixed on the first line.
fn blockquote_with_label(content: &str, label: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        return format!("\n\n> {}\n\n", label.trim());
    }

    let mut out = String::new();
    for (i, line) in content.lines().enumerate() {
        if i == 0 {
            out.push_str(&format!("> {label}{line}\n"));
        } else if line.trim().is_empty() {
            out.push_str(">\n");
        } else {
            out.push_str(&format!("> {line}\n"));
        }
    }
    format!("\n\n{}\n\n", out.trim_end())
}

/// Build a markdown table from a `<dl class="props">` node.
fn props_table(node: &std::rc::Rc<markup5ever_rcdom::Node>) -> String {
    use markup5ever_rcdom::NodeData;

    let mut rows: Vec<(String, String)> = Vec::new();
    let mut pending_term: Option<String> = None;

    for child in node.children.borrow().iter() {
        if let NodeData::Element { ref name, .. } = child.data {
            match name.local.as_ref() {
                "dt" => {
                    if let Some(term) = pending_term.take() {
                        rows.push((term, String::new()));
                    }
                    pending_term = Some(node_text(child));
                }
                "dd" => {
                    if let Some(term) = pending_term.take() {
                        rows.push((term, node_text(child)));
                    }
                }
                _ => {}
            }
        }
    }
    if let Some(term) = pending_term {
        rows.push((term, String::new()));
    }

    if rows.is_empty() {
        return String::new();
    }

    let mut table = String::from("\n\n| Field | Value |\n|-------|-------|\n");
    for (term, def) in rows {
        table.push_str(&format!(
            "| {} | {} |\n",
            term.trim().replace('\n', " "),
            def.trim().replace('\n', " ")
        ));
    }
    table
}

/// Concatenated text content of an rcdom node.
fn node_text(node: &std::rc::Rc<markup5ever_rcdom::Node>) -> String {
    use markup5ever_rcdom::NodeData;

    match &node.data {
        NodeData::Text { ref contents } => contents.borrow().to_string(),
        NodeData::Element { .. } | NodeData::Document => {
            let mut text = String::new();
            for child in node.children.borrow().iter() {
                text.push_str(&node_text(child));
            }
            text
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(html: &str) -> String {
        let converter = build_prose_converter("https://spec.example.org");
        html_markdown(html, &converter)
    }

    #[test]
    fn test_fragment_links_absolutized() {
        let md = convert(r##"<p>See <a href="#navigate">navigate</a>.</p>"##);
        assert!(md.contains("[navigate](https://spec.example.org#navigate)"));
    }

    #[test]
    fn test_absolute_links_untouched() {
        let md = convert(r#"<p><a href="https://other.example.org/#x">x</a></p>"#);
        assert!(md.contains("[x](https://other.example.org/#x)"));
    }

    #[test]
    fn test_self_links_dropped() {
        let md = convert(r##"<h3>Title<a class="self-link" href="#t"></a></h3>"##);
        assert!(!md.contains("self-link"));
        assert!(!md.contains("]("));
    }

    #[test]
    fn test_code_and_var_formatting() {
        let md = convert("<p>Let <var>x</var> be <code>null</code>.</p>");
        assert!(md.contains("*x*"));
        assert!(md.contains("`null`"));
    }

    #[test]
    fn test_linked_code_merges_into_one_link() {
        let md = convert(r##"<p><code><a href="#foo">foo</a></code></p>"##);
        assert!(md.contains("[`foo`](https://spec.example.org#foo)"));
    }

    #[test]
    fn test_dfn_bolded() {
        let md = convert("<p>A <dfn>navigable</dfn> is a thing.</p>");
        assert!(md.contains("**navigable**"));
    }

    #[test]
    fn test_secno_dropped() {
        let md = convert(r#"<h3><span class="secno">7.4.1</span> Navigation</h3>"#);
        assert!(!md.contains("7.4.1"));
        assert!(md.contains("Navigation"));
    }

    #[test]
    fn test_note_becomes_blockquote() {
        let md = convert(r#"<div class="note">Careful here.</div>"#);
        assert!(md.contains("> **Note:** Careful here."));
    }

    #[test]
    fn test_props_dl_becomes_table() {
        let md = convert(
            r#"<dl class="props"><dt>Value</dt><dd>none</dd><dt>Initial</dt><dd>auto</dd></dl>"#,
        );
        assert!(md.contains("| Field | Value |"));
        assert!(md.contains("| Value | none |"));
        assert!(md.contains("| Initial | auto |"));
    }

    #[test]
    fn test_markdown_link_parts() {
        assert_eq!(
            markdown_link_parts("[text](https://x.org)"),
            Some(("text".to_string(), "https://x.org".to_string()))
        );
        assert_eq!(markdown_link_parts("plain"), None);
        assert_eq!(markdown_link_parts("[unclosed](oops"), None);
    }
}
