//! HTML body extraction from a message's part tree.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurposeConfig;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use base64::Engine;

use crate::model::message::Part;

/// base64url that accepts payloads with or without `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64url payload.
///
/// Whitespace is ignored and the standard alphabet's `+` and `/` are
/// accepted in place of `-` and `_`.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_LENIENT.decode(normalized)
}

/// Encode bytes as unpadded base64url.
pub fn encode_base64url(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Return the decoded text of the first `text/html` part, or `""`.
pub fn extract_html_body(root: &Part) -> String {
    extract_html_body_reporting(root, &mut |_| {})
}

/// Like [`extract_html_body`], reporting undecodable payloads to `on_warning`.
///
/// The walk is depth-first in sibling order. An HTML part whose payload is
/// empty or undecodable does not stop the search; the next candidate is
/// tried. Invalid UTF-8 is replaced, never fatal.
pub fn extract_html_body_reporting(root: &Part, on_warning: &mut dyn FnMut(String)) -> String {
    let mut stack: Vec<&Part> = vec![root];

    while let Some(part) = stack.pop() {
        if part.is_html() {
            let Some(data) = part.body.data.as_deref() else {
                continue;
            };
            match decode_base64url(data) {
                Ok(bytes) => {
                    let html = String::from_utf8_lossy(&bytes).into_owned();
                    if !html.is_empty() {
                        return html;
                    }
                }
                Err(e) => {
                    tracing::debug!(part_id = %part.part_id, error = %e, "Bad HTML payload");
                    on_warning(format!("part '{}': {e}", part.part_id));
                }
            }
            continue;
        }
        // Reverse so the first child is popped first.
        stack.extend(part.parts.iter().rev());
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::PartBody;

    fn leaf(mime: &str, text: &str) -> Part {
        Part {
            mime_type: mime.into(),
            body: PartBody {
                data: Some(encode_base64url(text.as_bytes())),
                ..PartBody::default()
            },
            ..Part::default()
        }
    }

    fn node(mime: &str, parts: Vec<Part>) -> Part {
        Part {
            mime_type: mime.into(),
            parts,
            ..Part::default()
        }
    }

    #[test]
    fn test_root_html() {
        let root = leaf("text/html", "<p>hi</p>");
        assert_eq!(extract_html_body(&root), "<p>hi</p>");
    }

    #[test]
    fn test_first_depth_first_wins() {
        let root = node(
            "multipart/mixed",
            vec![
                node(
                    "multipart/alternative",
                    vec![leaf("text/plain", "plain"), leaf("text/html", "<b>deep</b>")],
                ),
                leaf("text/html", "<b>later sibling</b>"),
            ],
        );
        assert_eq!(extract_html_body(&root), "<b>deep</b>");
    }

    #[test]
    fn test_empty_html_part_continues_search() {
        let root = node(
            "multipart/alternative",
            vec![leaf("text/html", ""), leaf("text/html", "<i>second</i>")],
        );
        assert_eq!(extract_html_body(&root), "<i>second</i>");
    }

    #[test]
    fn test_text_only_is_empty() {
        let root = node("multipart/alternative", vec![leaf("text/plain", "hello")]);
        assert_eq!(extract_html_body(&root), "");
    }

    #[test]
    fn test_mime_type_case_insensitive() {
        let root = leaf("Text/HTML", "<p>x</p>");
        assert_eq!(extract_html_body(&root), "<p>x</p>");
    }

    #[test]
    fn test_bad_base64_reports_and_continues() {
        let mut bad = leaf("text/html", "");
        bad.part_id = "0".into();
        bad.body.data = Some("!!!not base64!!!".into());
        let root = node("multipart/mixed", vec![bad, leaf("text/html", "<p>ok</p>")]);

        let mut warnings = Vec::new();
        let html = extract_html_body_reporting(&root, &mut |w| warnings.push(w));
        assert_eq!(html, "<p>ok</p>");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("part '0'"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut part = leaf("text/html", "");
        part.body.data = Some(encode_base64url(b"<p>caf\xe9</p>"));
        assert_eq!(extract_html_body(&part), "<p>caf\u{FFFD}</p>");
    }

    #[test]
    fn test_very_deep_tree_terminates() {
        let mut root = leaf("text/html", "<p>bottom</p>");
        for _ in 0..100_000 {
            root = node("multipart/mixed", vec![root]);
        }
        assert_eq!(extract_html_body(&root), "<p>bottom</p>");
        // Dropping a 100k-deep tree recursively would overflow the test stack.
        let mut current = root;
        while let Some(child) = current.parts.pop() {
            current = child;
        }
    }

    #[test]
    fn test_decode_accepts_padding_and_standard_alphabet() {
        assert_eq!(decode_base64url("PGI-aGk8L2I-").unwrap(), b"<b>hi</b>");
        assert_eq!(decode_base64url("PGI+aGk8L2I+").unwrap(), b"<b>hi</b>");
        assert_eq!(decode_base64url("aGk=").unwrap(), b"hi");
        assert_eq!(decode_base64url("aG\nk").unwrap(), b"hi");
    }
}
