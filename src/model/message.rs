//! Message and part tree types.
//!
//! The shapes follow the mail provider's message resource, so JSON dumps of
//! that API deserialize straight into them.

use serde::{Deserialize, Serialize};

/// Reference to a message returned by a search, before it is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

/// A single header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Body payload of a part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartBody {
    /// Inline payload, base64url-encoded.
    pub data: Option<String>,
    /// Identifier for fetching the payload separately (attachments).
    pub attachment_id: Option<String>,
    /// Decoded size in bytes, as reported by the source.
    pub size: u64,
}

/// A node of a message's MIME tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Part {
    pub part_id: String,
    pub mime_type: String,
    /// Non-empty for attachments.
    pub filename: String,
    pub headers: Vec<Header>,
    pub body: PartBody,
    pub parts: Vec<Part>,
}

impl Part {
    /// Whether this part's MIME type is `text/html`.
    pub fn is_html(&self) -> bool {
        self.mime_type.trim().eq_ignore_ascii_case("text/html")
    }

    /// The attachment filename, if this part carries one.
    pub fn attachment_name(&self) -> Option<&str> {
        let name = self.filename.trim();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

/// A fully fetched message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    pub id: String,
    /// Milliseconds since the Unix epoch, as a decimal string.
    pub internal_date: Option<String>,
    /// Root of the part tree; its headers are the message headers.
    pub payload: Part,
}

impl Message {
    /// The message headers, in original order.
    pub fn headers(&self) -> &[Header] {
        &self.payload.headers
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Top-level parts that carry an attachment.
    ///
    /// Only the root's immediate children are scanned. Attachments nested
    /// deeper (e.g. inside a `multipart/alternative`) are not listed.
    pub fn top_level_attachments(&self) -> impl Iterator<Item = &Part> {
        self.payload.parts.iter().filter(|p| {
            p.attachment_name().is_some()
                && (p.body.attachment_id.is_some() || p.body.data.is_some())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_provider_shape() {
        let json = r#"{
            "id": "18c1",
            "threadId": "18c1",
            "internalDate": "1704362400000",
            "payload": {
                "partId": "",
                "mimeType": "multipart/mixed",
                "filename": "",
                "headers": [{"name": "Subject", "value": "Invoice"}],
                "body": {"size": 0},
                "parts": [
                    {"partId": "0", "mimeType": "text/html", "filename": "",
                     "body": {"size": 5, "data": "PGI-aGk8L2I-"}},
                    {"partId": "1", "mimeType": "application/pdf", "filename": "invoice.pdf",
                     "body": {"size": 3, "attachmentId": "ANGj"}}
                ]
            }
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, "18c1");
        assert_eq!(msg.header("subject"), Some("Invoice"));
        assert_eq!(msg.payload.parts.len(), 2);
        assert!(msg.payload.parts[0].is_html());
        let atts: Vec<_> = msg.top_level_attachments().collect();
        assert_eq!(atts.len(), 1);
        assert_eq!(atts[0].body.attachment_id.as_deref(), Some("ANGj"));
    }

    #[test]
    fn test_header_lookup_returns_first_match() {
        let msg = Message {
            payload: Part {
                headers: vec![Header::new("To", "a@x.com"), Header::new("TO", "b@x.com")],
                ..Part::default()
            },
            ..Message::default()
        };
        assert_eq!(msg.header("to"), Some("a@x.com"));
        assert_eq!(msg.header("from"), None);
    }

    #[test]
    fn test_filename_without_reference_is_not_an_attachment() {
        let msg = Message {
            payload: Part {
                parts: vec![Part {
                    filename: "orphan.txt".into(),
                    ..Part::default()
                }],
                ..Part::default()
            },
            ..Message::default()
        };
        assert_eq!(msg.top_level_attachments().count(), 0);
    }
}
