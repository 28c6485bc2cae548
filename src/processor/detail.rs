//! Post-processing of model output

use std::sync::LazyLock;

use regex::Regex;

static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"));

/// Markers that open a markdown section
const SECTION_MARKERS: [char; 2] = ['#', '*'];

/// Markdown heading and emphasis markers removed from plain translations
const MARKDOWN_MARKERS: [&str; 4] = ["### ", "## ", "# ", "**"];

/// Keep the markdown body of a detail response.
///
/// Drops any preamble before the first `#` or `*`, then turns every
/// `**bold**` span into a `### bold` heading.
pub fn select_markdown_section(text: &str) -> String {
    let section = match text.find(SECTION_MARKERS) {
        Some(start) => &text[start..],
        None => text,
    };
    BOLD_SPAN.replace_all(section, "### $1").into_owned()
}

/// Split a comma-separated tag response into trimmed, non-empty tags
pub fn parse_tags(response: &str) -> Vec<String> {
    response
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remove markdown heading and bold markers
pub fn strip_markdown_markers(text: &str) -> String {
    MARKDOWN_MARKERS
        .iter()
        .fold(text.to_string(), |acc, marker| acc.replace(marker, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_from_first_marker() {
        let text = "Sure! Here is the summary:\n# Example\nSome text";
        assert_eq!(select_markdown_section(text), "# Example\nSome text");

        let text = "Intro *item* then # heading";
        assert_eq!(select_markdown_section(text), "*item* then # heading");
    }

    #[test]
    fn test_bold_becomes_heading() {
        let text = "Preamble\n**Features**\n- fast\n**Pricing**\n- free";
        assert_eq!(
            select_markdown_section(text),
            "### Features\n- fast\n### Pricing\n- free"
        );
    }

    #[test]
    fn test_no_marker_keeps_text() {
        assert_eq!(select_markdown_section("plain text"), "plain text");
        assert_eq!(select_markdown_section(""), "");
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            parse_tags(" ai , tools,,  productivity "),
            vec!["ai", "tools", "productivity"]
        );
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ").is_empty());
    }

    #[test]
    fn test_strip_markdown_markers() {
        assert_eq!(
            strip_markdown_markers("### Title\n## Sub\n# Top\n**bold** text"),
            "Title\nSub\nTop\nbold text"
        );
    }
}
