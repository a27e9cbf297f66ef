//! Local mailbox source: an MBOX file or a directory of `.eml` files.
//!
//! The whole mailbox is split and decoded up front; fetches are served from
//! memory. Message ids are the 1-based position in the file for MBOX, and
//! the file name for `.eml` directories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{BinderError, Result};
use crate::model::message::{Message, MessageRef};
use crate::parser::mbox::MboxParser;
use crate::parser::mime;
use crate::search;

use super::MailSource;

struct Entry {
    message: Message,
    raw: Vec<u8>,
}

/// [`MailSource`] over local RFC 5322 messages.
pub struct MboxSource {
    path: PathBuf,
    entries: Vec<Entry>,
    by_id: HashMap<String, usize>,
}

impl MboxSource {
    /// Load every message under `path`.
    ///
    /// A directory is read as a set of `.eml` files, anything else as an
    /// MBOX file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = std::fs::metadata(&path).map_err(|e| BinderError::source_io(&path, e))?;

        let raw_messages = if meta.is_dir() {
            read_eml_dir(&path)?
        } else {
            read_mbox(&path)?
        };

        let mut entries = Vec::with_capacity(raw_messages.len());
        let mut by_id = HashMap::with_capacity(raw_messages.len());
        for (id, raw) in raw_messages {
            let message = mime::parse_message(&id, &raw);
            by_id.insert(id, entries.len());
            entries.push(Entry { message, raw });
        }

        tracing::info!(path = %path.display(), messages = entries.len(), "Mailbox loaded");
        Ok(Self {
            path,
            entries,
            by_id,
        })
    }

    /// Path the mailbox was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of messages in the mailbox.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, id: &str) -> Result<&Entry> {
        self.by_id
            .get(id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| BinderError::Source(format!("no message with id '{id}'")))
    }
}

impl MailSource for MboxSource {
    fn list_matching(&self, query: &str) -> Result<Vec<MessageRef>> {
        Ok(search::select(self.entries.iter().map(|e| &e.message), query))
    }

    fn get_message(&self, id: &str) -> Result<Message> {
        Ok(self.entry(id)?.message.clone())
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        mime::attachment_bytes(&self.entry(message_id)?.raw, attachment_id)
    }
}

fn read_mbox(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let mut messages = Vec::new();
    MboxParser::new(path)?.parse(&mut |raw| {
        messages.push(((messages.len() + 1).to_string(), raw.to_vec()));
        true
    })?;
    Ok(messages)
}

fn read_eml_dir(dir: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| BinderError::source_io(dir, e))?;

    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
        })
        .collect();
    files.sort();

    files
        .into_iter()
        .map(|file| {
            let raw = std::fs::read(&file).map_err(|e| BinderError::io(&file, e))?;
            let id = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok((id, raw))
        })
        .collect()
}
