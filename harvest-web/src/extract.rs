//! Markup to plain text.
//!
//! [`extract_body`] isolates the `<body>` fragment of a rendered page and
//! [`clean`] turns a fragment into newline‑delimited visible text. Neither
//! fails: malformed markup degrades to whatever the HTML5 parser recovers.
use crate::browser::RawMarkup;
use harvest_common::observability::TARGET_NORMALIZE;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

static BODY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body[\s>/]").expect("body tag pattern"));

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("body selector"));

/// Subtrees that never contribute visible text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that start a new line of text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "dialog", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "hgroup", "hr", "li", "main", "nav", "ol", "option", "p", "pre",
    "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Return the serialized `<body>` element of `markup`.
///
/// Markup without a body tag yields an empty fragment.
///
/// ```
/// use harvest_web::extract_body;
///
/// let fragment = extract_body("<html><body><p>Hi</p></body></html>");
/// assert!(fragment.starts_with("<body>"));
/// assert!(extract_body("<p>no body tag</p>").is_empty());
/// ```
pub fn extract_body(markup: &str) -> String {
    if markup.trim().is_empty() {
        warn!(target: TARGET_NORMALIZE, "empty markup; nothing to extract");
        return String::new();
    }
    // The parser always synthesizes a body, so look for a real one first.
    if !BODY_TAG.is_match(markup) {
        warn!(target: TARGET_NORMALIZE, "no body element in markup");
        return String::new();
    }

    let document = Html::parse_document(markup);
    match document.select(&BODY).next() {
        Some(body) => body.html(),
        None => {
            warn!(target: TARGET_NORMALIZE, "no body element in markup");
            String::new()
        }
    }
}

/// Strip hidden elements and tags from `fragment`, one trimmed line of
/// text per block, empty lines dropped.
///
/// Text that decodes to markup or to another entity (`&lt;p&gt;`,
/// `&amp;copy;`) is cleaned again until the output is stable, so cleaning
/// the result is a no-op.
///
/// ```
/// use harvest_web::clean;
///
/// let text = clean("<body><script>x</script><p>Hello</p><p>World</p></body>");
/// assert_eq!(text, "Hello\nWorld");
/// assert_eq!(clean(&text), text);
/// ```
pub fn clean(fragment: &str) -> String {
    let mut current = clean_once(fragment);
    // A pass that changes the text decodes or drops markup, so it settles
    // well within one pass per input byte.
    for _ in 0..fragment.len() {
        let next = clean_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn clean_once(fragment: &str) -> String {
    if fragment.trim().is_empty() {
        return String::new();
    }

    let parsed = Html::parse_fragment(fragment);
    let mut raw = String::with_capacity(fragment.len());
    collect_text(parsed.root_element(), &mut raw);

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN_ELEMENTS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let Some(nested) = ElementRef::wrap(child) else {
                    continue;
                };

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_text(nested, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Body extraction and cleaning in one step.
pub fn normalize(markup: &RawMarkup) -> String {
    let text = clean(&extract_body(&markup.html));
    if text.is_empty() {
        warn!(target: TARGET_NORMALIZE, "page produced no visible text");
    } else {
        debug!(
            target: TARGET_NORMALIZE,
            markup_chars = markup.html.chars().count(),
            text_chars = text.chars().count(),
            "normalized markup"
        );
    }
    text
}
