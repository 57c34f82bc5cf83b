//! Thin wrapper around the markdown converter.

use pulldown_cmark::{html, Options, Parser};

/// Converts markdown body text to an HTML fragment.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_to_html_basic() {
        assert_eq!(to_html("# Hello\n"), "<h1>Hello</h1>\n");
    }

    #[test]
    fn test_to_html_table_extension() {
        let html = to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_to_html_empty() {
        assert_eq!(to_html(""), "");
    }
}
