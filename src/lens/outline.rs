//! Algorithm outlines: the numbered step tree of an indexed algorithm.
//!
//! Section bodies store algorithm steps as markdown numbered lists with
//! 4-space nesting (see the extraction layer). This module recovers the
//! tree so step comments can be matched by hierarchical number.

use regex::Regex;
use std::sync::OnceLock;

/// One step of a spec algorithm.
#[derive(Debug, Clone)]
pub struct OutlineStep {
    /// Hierarchical position, assigned after tree building: `[1, 2]` is
    /// the second child of the first step.
    pub number: Vec<u32>,
    pub text: String,
    pub children: Vec<OutlineStep>,
}

/// Strip inline markdown (links, bold, italic, code), keeping the text.
pub fn strip_markdown(text: &str) -> String {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    static BOLD_RE: OnceLock<Regex> = OnceLock::new();
    static ITALIC_RE: OnceLock<Regex> = OnceLock::new();
    static CODE_RE: OnceLock<Regex> = OnceLock::new();

    let link = LINK_RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
    let bold = BOLD_RE.get_or_init(|| Regex::new(r"\*\*([^*]*)\*\*").unwrap());
    let italic = ITALIC_RE.get_or_init(|| Regex::new(r"\*([^*]*)\*").unwrap());
    let code = CODE_RE.get_or_init(|| Regex::new(r"`([^`]*)`").unwrap());

    let text = link.replace_all(text, "$1");
    let text = bold.replace_all(&text, "$1");
    let text = italic.replace_all(&text, "$1");
    code.replace_all(&text, "$1").to_string()
}

fn step_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^( *)\d+\.\s").unwrap())
}

/// Parse one numbered-list line into `(indent level, text)`.
fn parse_step_line(line: &str) -> Option<(usize, String)> {
    step_line_re().find(line)?;
    let spaces = line.len() - line.trim_start().len();
    let indent = spaces / 4;

    let rest = line.trim_start();
    let dot = rest.find('.')?;
    rest[..dot].parse::<u32>().ok()?;
    Some((indent, rest[dot + 1..].trim().to_string()))
}

/// Parse an algorithm body into its step tree.
///
/// Non-list prose (the intro line, notes) is ignored; continuation lines
/// indented past their step are folded into its text.
pub fn parse_outline(body: &str) -> Vec<OutlineStep> {
    let lines: Vec<&str> = body.split('\n').collect();
    let mut items: Vec<(usize, String)> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let Some((indent, mut text)) = parse_step_line(lines[i]) else {
            i += 1;
            continue;
        };

        let mut j = i + 1;
        while j < lines.len() {
            let next = lines[j];
            if next.trim().is_empty() {
                j += 1;
                continue;
            }
            if parse_step_line(next).is_some() {
                break;
            }
            let stripped = next.trim_start();
            let next_indent = next.len() - stripped.len();
            if next_indent > indent * 4 && !stripped.starts_with('>') && !stripped.starts_with('*')
            {
                text.push(' ');
                text.push_str(stripped);
                j += 1;
            } else {
                break;
            }
        }

        items.push((indent, text));
        i = j;
    }

    let mut pos = 0;
    let mut steps = Vec::new();
    // A dedent below the opening indent ends a batch; restart at the new
    // level so nothing is dropped.
    while pos < items.len() {
        let indent = items[pos].0;
        let mut batch = build_level(&items, &mut pos, indent);
        steps.append(&mut batch);
    }
    number_steps(&mut steps, &[]);
    steps
}

/// Build one nesting level, recursing for deeper indents.
fn build_level(items: &[(usize, String)], pos: &mut usize, indent: usize) -> Vec<OutlineStep> {
    let mut steps: Vec<OutlineStep> = Vec::new();

    while *pos < items.len() {
        let (item_indent, text) = &items[*pos];

        if *item_indent < indent {
            break;
        }
        if *item_indent > indent {
            let mut nested = build_level(items, pos, *item_indent);
            match steps.last_mut() {
                Some(parent) => parent.children.append(&mut nested),
                None => steps.append(&mut nested),
            }
            continue;
        }

        *pos += 1;
        steps.push(OutlineStep {
            number: Vec::new(),
            text: strip_markdown(text),
            children: Vec::new(),
        });
    }

    steps
}

/// Assign hierarchical numbers from tree position.
fn number_steps(steps: &mut [OutlineStep], prefix: &[u32]) {
    for (i, step) in steps.iter_mut().enumerate() {
        let mut number = prefix.to_vec();
        number.push((i + 1) as u32);
        step.number = number.clone();
        number_steps(&mut step.children, &number);
    }
}

/// Find a step by its hierarchical number path.
pub fn find_step<'a>(steps: &'a [OutlineStep], number: &[u32]) -> Option<&'a OutlineStep> {
    if number.is_empty() {
        return None;
    }
    let mut current = steps;
    let mut found = None;
    for &n in number {
        if n < 1 || n as usize > current.len() {
            return None;
        }
        let step = &current[(n - 1) as usize];
        found = Some(step);
        current = &step.children;
    }
    found
}

/// Depth-first flattening of the step tree.
pub fn flatten<'a>(steps: &'a [OutlineStep]) -> Vec<&'a OutlineStep> {
    let mut out = Vec::new();
    for step in steps {
        out.push(step);
        out.extend(flatten(&step.children));
    }
    out
}
