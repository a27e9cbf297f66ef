//! Saved attachment records.

use std::path::PathBuf;

/// An attachment written next to the assembled document.
///
/// The bytes are released as soon as they are written; only the metadata
/// survives in the record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AttachmentRecord {
    /// Filename as it appeared in the message.
    pub original_filename: String,

    /// `{message_index}-{attachment_index} - {filename}`, also used in the manifest.
    pub storage_name: String,

    /// Where the bytes were written.
    pub path: PathBuf,

    /// Number of bytes written.
    pub size: u64,
}
