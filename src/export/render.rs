//! Turning the assembled document into the final artifact.

use crate::error::Result;

use super::document::Document;

/// Artifact bytes plus non-fatal notices from the renderer.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub warnings: Vec<String>,
}

/// Produces the final artifact from a finished [`Document`].
///
/// An `Err` means no artifact could be produced at all. Layout problems
/// that still leave a usable artifact go into [`Rendered::warnings`].
pub trait Renderer {
    fn render(&self, document: &Document) -> Result<Rendered>;
}

/// Writes the document as a standalone HTML file.
///
/// Pages are separated by the `page-break-after` rule in the preamble, so
/// printing the file from a browser paginates one message per page.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, document: &Document) -> Result<Rendered> {
        let warnings = document
            .fragments
            .iter()
            .filter(|f| f.body.is_empty())
            .map(|f| {
                format!(
                    "message {} of {} has no HTML body; its page shows headers only",
                    f.index, f.total
                )
            })
            .collect();

        Ok(Rendered {
            bytes: document.to_html().into_bytes(),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::document::DocumentFragment;

    fn fragment(index: usize, body: &str) -> DocumentFragment {
        DocumentFragment {
            index,
            total: 2,
            subject: "s".into(),
            from: "f".into(),
            to: String::new(),
            date: String::new(),
            manifest: Vec::new(),
            body: body.into(),
        }
    }

    #[test]
    fn test_html_renderer_reports_empty_bodies() {
        let doc = Document {
            fragments: vec![fragment(1, "<p>x</p>"), fragment(2, "")],
        };
        let rendered = HtmlRenderer.render(&doc).unwrap();
        assert_eq!(rendered.bytes, doc.to_html().into_bytes());
        assert_eq!(rendered.warnings.len(), 1);
        assert!(rendered.warnings[0].starts_with("message 2 of 2"));
    }
}
