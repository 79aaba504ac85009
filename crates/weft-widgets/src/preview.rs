//! Rendering of widget descriptions for display.
//!
//! Persisted widgets carry a markdown-ish description. The host supplies the
//! renderer; [`MarkdownPreview`] is the stock one.

use pulldown_cmark::{Options, Parser, html};

pub trait PreviewRenderer {
    /// Render `text` to trusted HTML.
    fn render_preview(&self, text: &str) -> String;
}

/// CommonMark rendering with tables and strikethrough.
///
/// Raw HTML in the input is escaped, not passed through.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownPreview;

impl PreviewRenderer for MarkdownPreview {
    fn render_preview(&self, text: &str) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let parser = Parser::new_ext(text, options).map(|event| match event {
            pulldown_cmark::Event::Html(raw) | pulldown_cmark::Event::InlineHtml(raw) => {
                pulldown_cmark::Event::Text(raw)
            }
            other => other,
        });
        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_markdown() {
        let html = MarkdownPreview.render_preview("# Title\n\nsome *text*");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = MarkdownPreview.render_preview("hi <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
