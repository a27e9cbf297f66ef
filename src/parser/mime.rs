//! MIME decoding: turns a raw RFC 5322 message into the [`Part`] tree model.

use mail_parser::{MessageParser, MimeHeaders, PartType};

use crate::error::{BinderError, Result};
use crate::model::message::{Message, Part, PartBody};
use crate::parser::body::encode_base64url;
use crate::parser::header;
use crate::parser::mbox::skip_from_line;

/// Maximum depth for recursive multipart descent (to prevent stack overflow on adversarial input).
const MAX_DEPTH: usize = 32;

/// Decode a raw message into a [`Message`].
///
/// Text leaves carry their decoded content as base64url `data`. Parts with
/// a filename carry an `attachment_id` (the part's index) instead, so the
/// bytes are only materialized by [`attachment_bytes`].
pub fn parse_message(id: &str, raw_message: &[u8]) -> Message {
    let bytes = skip_from_line(raw_message);
    let headers = header::parse_header_block(header::split_header_block(bytes));

    let internal_date = headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("date"))
        .and_then(|h| header::parse_date(&h.value))
        .map(|dt| dt.timestamp_millis().to_string());

    let mut payload = match MessageParser::default().parse(bytes) {
        Some(msg) => convert_part(&msg, 0, 0, ""),
        None => {
            tracing::warn!(id, "mail-parser could not decode message, using raw body");
            fallback_part(bytes)
        }
    };
    payload.headers = headers;

    Message {
        id: id.to_string(),
        internal_date,
        payload,
    }
}

/// Decode the attachment with the given part index out of a raw message.
pub fn attachment_bytes(raw_message: &[u8], attachment_id: &str) -> Result<Vec<u8>> {
    let index: usize = attachment_id.parse().map_err(|_| {
        BinderError::Source(format!("invalid attachment id '{attachment_id}'"))
    })?;
    let msg = MessageParser::default()
        .parse(skip_from_line(raw_message))
        .ok_or_else(|| BinderError::Source("message could not be decoded".into()))?;
    msg.parts
        .get(index)
        .map(|part| part.contents().to_vec())
        .ok_or_else(|| BinderError::Source(format!("no attachment with id '{attachment_id}'")))
}

/// Convert part `index` of `msg`. `prefix` is empty for the outer message
/// and `"{part_id}."` inside a forwarded one.
///
/// Leaves of a forwarded message carry their bytes inline, since
/// [`attachment_bytes`] only indexes the outer message's parts.
fn convert_part(
    msg: &mail_parser::Message<'_>,
    index: usize,
    depth: usize,
    prefix: &str,
) -> Part {
    let Some(part) = msg.parts.get(index) else {
        return Part::default();
    };

    let mime_type = part
        .content_type()
        .map(|ct| match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub),
            None => ct.ctype().to_string(),
        })
        .unwrap_or_else(|| default_mime_type(&part.body).to_string())
        .to_ascii_lowercase();

    let filename = part.attachment_name().unwrap_or_default().to_string();
    let contents = part.contents();
    let mut converted = Part {
        part_id: format!("{prefix}{index}"),
        mime_type,
        body: PartBody {
            size: contents.len() as u64,
            ..PartBody::default()
        },
        ..Part::default()
    };

    match &part.body {
        PartType::Multipart(children) => {
            if depth >= MAX_DEPTH {
                tracing::warn!(depth, "Multipart nesting too deep, skipping children");
            } else {
                converted.parts = children
                    .iter()
                    .map(|&child| convert_part(msg, child, depth + 1, prefix))
                    .collect();
            }
        }
        PartType::Message(nested) => {
            if prefix.is_empty() && !filename.is_empty() {
                converted.body.attachment_id = Some(index.to_string());
            } else if !filename.is_empty() {
                converted.body.data = Some(encode_base64url(contents));
            }
            if depth >= MAX_DEPTH {
                tracing::warn!(depth, "Forwarded message nesting too deep, skipping body");
            } else {
                let nested_prefix = format!("{}.", converted.part_id);
                converted.parts = vec![convert_part(nested, 0, depth + 1, &nested_prefix)];
            }
        }
        _ if !filename.is_empty() && prefix.is_empty() => {
            converted.body.attachment_id = Some(index.to_string());
        }
        _ => {
            converted.body.data = Some(encode_base64url(contents));
        }
    }
    converted.filename = filename;
    converted
}

fn default_mime_type(body: &PartType<'_>) -> &'static str {
    match body {
        PartType::Text(_) => "text/plain",
        PartType::Html(_) => "text/html",
        PartType::Message(_) => "message/rfc822",
        PartType::Multipart(_) => "multipart/mixed",
        PartType::Binary(_) | PartType::InlineBinary(_) => "application/octet-stream",
    }
}

/// Treat everything after the headers as a plain-text body.
fn fallback_part(bytes: &[u8]) -> Part {
    let header_len = header::split_header_block(bytes).len();
    let body = bytes.get(header_len..).unwrap_or_default();
    let body = body
        .strip_prefix(b"\r\n")
        .or_else(|| body.strip_prefix(b"\n"))
        .unwrap_or(body);
    Part {
        mime_type: "text/plain".into(),
        body: PartBody {
            data: Some(encode_base64url(body)),
            size: body.len() as u64,
            ..PartBody::default()
        },
        ..Part::default()
    }
}
