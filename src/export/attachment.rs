//! Saving a message's attachments under deterministic names.

use std::path::Path;

use crate::error::{BinderError, Result, Warning};
use crate::model::attachment::AttachmentRecord;
use crate::model::message::{Message, Part};
use crate::parser::body::decode_base64url;
use crate::source::MailSource;

use super::storage::Storage;

/// Attachments of one message, in discovery order.
#[derive(Debug, Default)]
pub struct SavedAttachments {
    /// Every storage name assigned, written or not.
    pub manifest: Vec<String>,
    /// Attachments that reached storage.
    pub records: Vec<AttachmentRecord>,
    pub warnings: Vec<Warning>,
}

/// `{message_index}-{attachment_index} - {filename}`, both indices 1-based.
pub fn storage_name(message_index: usize, attachment_index: usize, filename: &str) -> String {
    format!(
        "{message_index}-{attachment_index} - {}",
        safe_filename(filename)
    )
}

/// Replace path separators and control characters with `_`.
///
/// A name that is empty or only dots would resolve outside the output
/// directory; it becomes `_`.
pub fn safe_filename(name: &str) -> String {
    let safe: String = name
        .trim()
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    if safe.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        safe
    }
}

/// Fetch and write every top-level attachment of `message`.
///
/// Fetch failures abort. Write failures become [`Warning::Persist`] and the
/// name stays in the manifest so later numbering does not shift.
pub fn save_attachments(
    message: &Message,
    message_index: usize,
    source: &dyn MailSource,
    storage: &dyn Storage,
    output_dir: &Path,
) -> Result<SavedAttachments> {
    let mut saved = SavedAttachments::default();

    for (i, part) in message.top_level_attachments().enumerate() {
        let original = part.attachment_name().unwrap_or_default();
        let name = storage_name(message_index, i + 1, original);
        let path = output_dir.join(&name);

        let bytes = fetch_bytes(message, part, source)?;
        match storage.write(&path, &bytes) {
            Ok(()) => {
                tracing::debug!(name = %name, size = bytes.len(), "Attachment saved");
                saved.records.push(AttachmentRecord {
                    original_filename: original.to_string(),
                    storage_name: name.clone(),
                    path,
                    size: bytes.len() as u64,
                });
            }
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "Failed to save attachment");
                saved.warnings.push(Warning::Persist {
                    path,
                    reason: e.to_string(),
                });
            }
        }
        saved.manifest.push(name);
    }

    Ok(saved)
}

/// Bytes from the source by attachment id, else from inline data.
fn fetch_bytes(message: &Message, part: &Part, source: &dyn MailSource) -> Result<Vec<u8>> {
    if let Some(attachment_id) = part.body.attachment_id.as_deref() {
        return source.get_attachment(&message.id, attachment_id);
    }
    let data = part.body.data.as_deref().unwrap_or_default();
    decode_base64url(data).map_err(|e| {
        BinderError::Source(format!(
            "message '{}': inline attachment '{}' is not valid base64url: {e}",
            message.id, part.filename
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_name() {
        assert_eq!(storage_name(1, 1, "invoice.pdf"), "1-1 - invoice.pdf");
        assert_eq!(storage_name(3, 12, "a b.txt"), "3-12 - a b.txt");
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(safe_filename("a\\b\u{0}c\nd"), "a_b_c_d");
        assert_eq!(safe_filename(".."), "_");
        assert_eq!(safe_filename("  résumé.pdf "), "résumé.pdf");
    }
}
