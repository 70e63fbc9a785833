//! Markdown to HTML for project, data, recipe and job descriptions.
//!
//! Trusted editors may embed raw HTML; for everyone else raw HTML blocks and
//! inline tags are emitted as escaped text.

use pulldown_cmark::{html, Event, Options, Parser};

/// Rendering collaborator used when saving entities.
pub trait HtmlRenderer: Send + Sync {
    fn render(&self, text: &str, trusted: bool) -> String;
}

/// Default renderer backed by pulldown-cmark.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl HtmlRenderer for MarkdownRenderer {
    fn render(&self, text: &str, trusted: bool) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let parser = Parser::new_ext(text, options);

        let mut output = String::with_capacity(text.len() * 3 / 2);
        if trusted {
            html::push_html(&mut output, parser);
        } else {
            let escaped = parser.map(|event| match event {
                Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
                other => other,
            });
            html::push_html(&mut output, escaped);
        }
        output
    }
}
