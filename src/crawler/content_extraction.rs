//! Content extraction functionality for the crawler module

use std::sync::LazyLock;

use scraper::{Html, Node, Selector};

use crate::crawler::PageSignals;

/// Paragraphs must be longer than this to serve as a description
const MIN_PARAGRAPH_CHARS: usize = 50;

/// Paragraph-derived descriptions are cut to this length
const MAX_PARAGRAPH_DESCRIPTION_CHARS: usize = 200;

/// Elements whose text never counts as visible page text
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));
static META_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="description"]"#).expect("valid description selector")
});
static OG_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:description"]"#).expect("valid og selector")
});
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid paragraph selector"));

/// Extract title, visible text and description from rendered HTML
///
/// # Arguments
///
/// * `html` - The rendered HTML of the page
///
/// # Returns
///
/// The page signals. Missing pieces come back as empty strings.
pub fn extract_page_signals(html: &str) -> PageSignals {
    let document = Html::parse_document(html);

    PageSignals {
        rendered_html: html.to_string(),
        title: extract_title(&document),
        body_text: visible_text(&document),
        description: extract_description(&document),
    }
}

fn extract_title(document: &Html) -> String {
    document
        .select(&TITLE)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Resolve the description: meta description, then og:description, then the
/// first long-enough paragraph.
fn extract_description(document: &Html) -> String {
    meta_content(document, &META_DESCRIPTION)
        .or_else(|| meta_content(document, &OG_DESCRIPTION))
        .or_else(|| first_long_paragraph(document))
        .unwrap_or_default()
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

fn first_long_paragraph(document: &Html) -> Option<String> {
    document
        .select(&PARAGRAPH)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .find(|text| text.chars().count() > MIN_PARAGRAPH_CHARS)
        .map(|text| text.chars().take(MAX_PARAGRAPH_DESCRIPTION_CHARS).collect())
}

/// Collect the text of every node outside script/style-like elements
fn visible_text(document: &Html) -> String {
    let mut parts = Vec::new();
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.join("\n")
}
