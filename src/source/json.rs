//! Source backed by provider-format JSON dumps.
//!
//! Layout:
//!
//! ```text
//! dump/
//!   18c1a.json              {"id", "internalDate", "payload": {...}}
//!   18c1b.json
//!   attachments/
//!     ANGjdJ8.json          {"size": 1234, "data": "<base64url>"}
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BinderError, Result};
use crate::model::message::{Message, MessageRef};
use crate::parser::body::decode_base64url;
use crate::search;

use super::MailSource;

/// Body of an attachment dump.
#[derive(Debug, Deserialize)]
struct AttachmentBody {
    #[serde(default)]
    size: u64,
    data: String,
}

/// [`MailSource`] over a directory of JSON message dumps.
pub struct JsonSource {
    dir: PathBuf,
    messages: Vec<Message>,
    by_id: HashMap<String, usize>,
}

impl JsonSource {
    /// Load every `*.json` message in `dir`.
    ///
    /// A message without an `id` takes its file stem.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let read_dir = std::fs::read_dir(&dir).map_err(|e| BinderError::source_io(&dir, e))?;

        let mut files: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut messages = Vec::with_capacity(files.len());
        let mut by_id = HashMap::with_capacity(files.len());
        for file in files {
            let text = std::fs::read_to_string(&file).map_err(|e| BinderError::io(&file, e))?;
            let mut message: Message = serde_json::from_str(&text).map_err(|e| {
                BinderError::Source(format!("{}: invalid message JSON: {e}", file.display()))
            })?;
            if message.id.is_empty() {
                message.id = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
            }
            if by_id.insert(message.id.clone(), messages.len()).is_some() {
                tracing::warn!(id = %message.id, file = %file.display(), "Duplicate message id, later dump wins");
            }
            messages.push(message);
        }

        tracing::info!(dir = %dir.display(), messages = messages.len(), "JSON dump loaded");
        Ok(Self {
            dir,
            messages,
            by_id,
        })
    }

    fn attachment_path(&self, attachment_id: &str) -> Result<PathBuf> {
        let plain = !attachment_id.is_empty()
            && attachment_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !plain {
            return Err(BinderError::Source(format!(
                "invalid attachment id '{attachment_id}'"
            )));
        }
        Ok(self
            .dir
            .join("attachments")
            .join(format!("{attachment_id}.json")))
    }
}

impl MailSource for JsonSource {
    fn list_matching(&self, query: &str) -> Result<Vec<MessageRef>> {
        Ok(search::select(&self.messages, query))
    }

    fn get_message(&self, id: &str) -> Result<Message> {
        self.by_id
            .get(id)
            .map(|&i| self.messages[i].clone())
            .ok_or_else(|| BinderError::Source(format!("no message with id '{id}'")))
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let path = self.attachment_path(attachment_id)?;
        let text = std::fs::read_to_string(&path).map_err(|e| BinderError::source_io(&path, e))?;
        let body: AttachmentBody = serde_json::from_str(&text).map_err(|e| {
            BinderError::Source(format!("{}: invalid attachment JSON: {e}", path.display()))
        })?;
        let bytes = decode_base64url(&body.data).map_err(|e| {
            BinderError::Source(format!(
                "attachment '{attachment_id}' of message '{message_id}': {e}"
            ))
        })?;
        if body.size != 0 && body.size != bytes.len() as u64 {
            tracing::debug!(
                attachment_id,
                reported = body.size,
                actual = bytes.len(),
                "Attachment size mismatch"
            );
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_json(id: &str, internal_date: &str, subject: &str) -> String {
        format!(
            r#"{{"id": "{id}", "internalDate": "{internal_date}",
                "payload": {{"mimeType": "multipart/mixed",
                  "headers": [{{"name": "Subject", "value": "{subject}"}}],
                  "parts": [{{"partId": "1", "mimeType": "application/pdf",
                    "filename": "a.pdf", "body": {{"attachmentId": "ATT1", "size": 8}}}}]}}}}"#
        )
    }

    fn dump() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), message_json("a", "1000", "Older")).unwrap();
        std::fs::write(dir.path().join("b.json"), message_json("b", "2000", "Newer")).unwrap();
        std::fs::create_dir(dir.path().join("attachments")).unwrap();
        std::fs::write(
            dir.path().join("attachments/ATT1.json"),
            r#"{"size": 8, "data": "JVBERi0xLjQ"}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_list_newest_first() {
        let dir = dump();
        let source = JsonSource::open(dir.path()).unwrap();
        let ids: Vec<String> = source
            .list_matching("")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(source.list_matching("subject:older").unwrap().len(), 1);
    }

    #[test]
    fn test_get_attachment_decodes() {
        let dir = dump();
        let source = JsonSource::open(dir.path()).unwrap();
        assert_eq!(source.get_attachment("a", "ATT1").unwrap(), b"%PDF-1.4");
        assert!(matches!(
            source.get_attachment("a", "MISSING"),
            Err(BinderError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_rejects_path_like_attachment_id() {
        let dir = dump();
        let source = JsonSource::open(dir.path()).unwrap();
        assert!(matches!(
            source.get_attachment("a", "../a"),
            Err(BinderError::Source(_))
        ));
    }

    #[test]
    fn test_invalid_json_is_source_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        assert!(matches!(
            JsonSource::open(dir.path()),
            Err(BinderError::Source(_))
        ));
    }

    #[test]
    fn test_missing_id_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("xyz.json"), r#"{"payload": {}}"#).unwrap();
        let source = JsonSource::open(dir.path()).unwrap();
        assert!(source.get_message("xyz").is_ok());
    }
}
