//! Streaming MBOX splitter.
//!
//! Reads MBOX files line-by-line and hands each raw message to a callback.
//! Tolerant of malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{BinderError, Result};

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Default maximum message size in bytes (256 MB).
const MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Streaming MBOX parser.
///
/// Tolerates mixed `\n` / `\r\n` line endings, `From ` lines not preceded by
/// a blank line, truncated messages at EOF and a UTF-8 BOM at the start.
pub struct MboxParser {
    path: PathBuf,
    max_message_size: usize,
}

impl MboxParser {
    /// Create a parser for the given MBOX file.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::metadata(&path).map_err(|e| BinderError::source_io(&path, e))?;
        Ok(Self {
            path,
            max_message_size: MAX_MESSAGE_SIZE,
        })
    }

    /// Path to the MBOX file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Split the MBOX, calling `message_callback` with each raw message
    /// (separator line included).
    ///
    /// The callback returns `false` to stop early. Returns the number of
    /// messages delivered.
    pub fn parse(&self, message_callback: &mut dyn FnMut(&[u8]) -> bool) -> Result<u64> {
        let file = File::open(&self.path).map_err(|e| BinderError::source_io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut count: u64 = 0;
        let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);
        let mut prev_line_was_empty = true;
        let mut truncated = false;

        loop {
            line_buf.clear();
            let read = reader
                .read_until(b'\n', &mut line_buf)
                .map_err(|e| BinderError::io(&self.path, e))?;
            if read == 0 {
                break;
            }

            if is_mbox_separator(&line_buf) {
                if !prev_line_was_empty {
                    warn!("Found 'From ' separator without preceding blank line");
                }
                if !message_buf.is_empty() {
                    if !message_callback(&message_buf) {
                        return Ok(count);
                    }
                    count += 1;
                }
                message_buf.clear();
                truncated = false;
            }

            if message_buf.len() + line_buf.len() <= self.max_message_size {
                message_buf.extend_from_slice(&line_buf);
            } else if !truncated {
                warn!(
                    max_size = self.max_message_size,
                    "Message exceeds maximum size, truncating body"
                );
                truncated = true;
            }

            prev_line_was_empty = is_blank_line(&line_buf);
        }

        if !message_buf.is_empty() && message_callback(&message_buf) {
            count += 1;
        }

        Ok(count)
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    let line = line.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(line);
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}

/// Strip the `From ` separator line (and a BOM) from a raw message.
pub fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_mbox_separator() {
        assert!(is_mbox_separator(
            b"From user@example.com Thu Jan 01 00:00:00 2024\n"
        ));
        assert!(!is_mbox_separator(b"from user@example.com\n"));
        assert!(!is_mbox_separator(b">From user@example.com\n"));
        assert!(!is_mbox_separator(b"From: user@example.com\n"));
    }

    #[test]
    fn test_skip_from_line() {
        let data = b"From user@example.com Thu Jan 01 00:00:00 2024\nSubject: Test\n\nBody\n";
        assert!(skip_from_line(data).starts_with(b"Subject:"));
        assert_eq!(skip_from_line(b"Subject: x\n"), b"Subject: x\n");
    }

    #[test]
    fn test_parse_splits_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.mbox");
        std::fs::write(
            &path,
            "From a@x Thu Jan 01 00:00:00 2024\nSubject: one\n\nbody\n>From quoted\n\n\
             From b@x Fri Jan 02 00:00:00 2024\nSubject: two\n\nbody two\n",
        )
        .unwrap();

        let mut messages = Vec::new();
        let count = MboxParser::new(&path)
            .unwrap()
            .parse(&mut |raw| {
                messages.push(String::from_utf8_lossy(raw).into_owned());
                true
            })
            .unwrap();
        assert_eq!(count, 2);
        assert!(messages[0].contains("Subject: one"));
        assert!(messages[0].contains(">From quoted"));
        assert!(messages[1].contains("Subject: two"));
    }

    #[test]
    fn test_missing_file() {
        let err = MboxParser::new("/no/such/file.mbox").err().unwrap();
        assert!(matches!(err, BinderError::FileNotFound(_)));
    }
}
