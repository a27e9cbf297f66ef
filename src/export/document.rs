//! Document assembly: one page-broken fragment per message.
//!
//! The [`Assembler`] owns the counters and the growing [`Document`]. It is
//! fed messages in final order and hands the finished document over in
//! [`Assembly`].

use std::path::{Path, PathBuf};

use crate::error::{Result, Warning};
use crate::model::address::display_names;
use crate::model::attachment::AttachmentRecord;
use crate::model::message::Message;
use crate::parser::body::extract_html_body_reporting;
use crate::sanitize::dom::escape;
use crate::sanitize::sanitize_html;
use crate::source::MailSource;

use super::attachment::save_attachments;
use super::storage::Storage;

/// Page setup and header styling shared by every fragment.
const PREAMBLE: &str = r#"<html>
<head><meta charset="UTF-8"><style>
    @page { size: letter; margin: 1in; }
    body { font-family: Helvetica, Arial, sans-serif; font-size: 10pt; }
    .email-container { page-break-after: always; border-bottom: 1px solid #ccc; padding: 20px 0; }
    .header { background-color: #f4f4f4; padding: 10px; margin-bottom: 10px; }
</style></head>
<body>
"#;

const CLOSING: &str = "</body></html>\n";

const NO_SUBJECT: &str = "No Subject";
const UNKNOWN_SENDER: &str = "Unknown";

/// Running totals for one assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Messages appended so far.
    pub messages: usize,
    /// Attachment names assigned so far, across all messages.
    pub attachments: usize,
}

/// The rendered unit for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFragment {
    /// 1-based position in the document.
    pub index: usize,
    pub total: usize,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: String,
    /// Storage names of this message's attachments.
    pub manifest: Vec<String>,
    /// Sanitized body HTML, possibly empty.
    pub body: String,
}

impl DocumentFragment {
    /// The manifest line: names joined with `", "`, or `"None"`.
    pub fn manifest_line(&self) -> String {
        if self.manifest.is_empty() {
            "None".to_string()
        } else {
            self.manifest.join(", ")
        }
    }

    /// Append this fragment's page to `out`.
    pub fn write_html(&self, out: &mut String) {
        out.push_str("<div class=\"email-container\">\n<div class=\"header\">");
        out.push_str(&format!("<b>Message:</b> {} of {}<br>", self.index, self.total));
        for (label, value) in [
            ("Subject", self.subject.as_str()),
            ("From", self.from.as_str()),
            ("To", self.to.as_str()),
            ("Date", self.date.as_str()),
        ] {
            out.push_str(&format!("<b>{label}:</b> {}<br>", escape(value)));
        }
        out.push_str(&format!(
            "<b>Attachments:</b> {}</div>\n",
            escape(&self.manifest_line())
        ));
        out.push_str(&self.body);
        out.push_str("\n</div>\n");
    }
}

/// Fragments in processing order inside the fixed preamble.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub fragments: Vec<DocumentFragment>,
}

impl Document {
    /// The complete HTML document.
    pub fn to_html(&self) -> String {
        let mut out = String::from(PREAMBLE);
        for fragment in &self.fragments {
            fragment.write_html(&mut out);
        }
        out.push_str(CLOSING);
        out
    }
}

/// Result of a finished assembly.
#[derive(Debug)]
pub struct Assembly {
    pub document: Document,
    pub attachments: Vec<AttachmentRecord>,
    pub warnings: Vec<Warning>,
    pub counters: Counters,
}

/// Builds a [`Document`] one message at a time.
pub struct Assembler {
    total: usize,
    output_dir: PathBuf,
    counters: Counters,
    document: Document,
    attachments: Vec<AttachmentRecord>,
    warnings: Vec<Warning>,
}

impl Assembler {
    /// `total` is the number of messages that will be pushed; attachments
    /// are written into `output_dir`.
    pub fn new(total: usize, output_dir: impl AsRef<Path>) -> Self {
        Self {
            total,
            output_dir: output_dir.as_ref().to_path_buf(),
            counters: Counters::default(),
            document: Document::default(),
            attachments: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Save the message's attachments, then append its fragment.
    ///
    /// Only attachment fetch failures are returned as errors; everything
    /// else degrades to a fallback value or a recorded warning.
    pub fn push(
        &mut self,
        message: &Message,
        source: &dyn MailSource,
        storage: &dyn Storage,
    ) -> Result<()> {
        let index = self.counters.messages + 1;

        let saved = save_attachments(message, index, source, storage, &self.output_dir)?;
        self.counters.attachments += saved.manifest.len();
        self.attachments.extend(saved.records);
        self.warnings.extend(saved.warnings);

        let mut decode_errors = Vec::new();
        let raw_html =
            extract_html_body_reporting(&message.payload, &mut |reason| decode_errors.push(reason));
        for reason in decode_errors {
            tracing::warn!(index, id = %message.id, reason = %reason, "Undecodable HTML body");
            self.warnings.push(Warning::Decode { index, reason });
        }

        let fragment = DocumentFragment {
            index,
            total: self.total,
            subject: message
                .header("subject")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(NO_SUBJECT)
                .to_string(),
            from: message
                .header("from")
                .map(display_names)
                .unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            to: message.header("to").map(display_names).unwrap_or_default(),
            date: message.header("date").unwrap_or_default().to_string(),
            manifest: saved.manifest,
            body: sanitize_html(&raw_html),
        };
        tracing::debug!(index, id = %message.id, body_len = fragment.body.len(), "Fragment appended");

        self.document.fragments.push(fragment);
        self.counters.messages = index;
        Ok(())
    }

    /// Close the document and hand it over.
    pub fn finish(self) -> Assembly {
        if self.counters.messages != self.total {
            tracing::warn!(
                expected = self.total,
                appended = self.counters.messages,
                "Fragment count differs from announced total"
            );
        }
        Assembly {
            document: self.document,
            attachments: self.attachments,
            warnings: self.warnings,
            counters: self.counters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BinderError;
    use crate::export::storage::FsStorage;
    use crate::model::message::{Header, MessageRef, Part, PartBody};
    use crate::parser::body::encode_base64url;

    struct NoSource;

    impl MailSource for NoSource {
        fn list_matching(&self, _query: &str) -> Result<Vec<MessageRef>> {
            Ok(Vec::new())
        }
        fn get_message(&self, id: &str) -> Result<Message> {
            Err(BinderError::Source(format!("no message {id}")))
        }
        fn get_attachment(&self, _message_id: &str, _attachment_id: &str) -> Result<Vec<u8>> {
            Ok(b"bytes".to_vec())
        }
    }

    fn message(headers: &[(&str, &str)], html: Option<&str>) -> Message {
        let mut payload = Part {
            mime_type: "multipart/mixed".into(),
            headers: headers.iter().map(|(n, v)| Header::new(*n, *v)).collect(),
            ..Part::default()
        };
        if let Some(html) = html {
            payload.parts.push(Part {
                mime_type: "text/html".into(),
                body: PartBody {
                    data: Some(encode_base64url(html.as_bytes())),
                    ..PartBody::default()
                },
                ..Part::default()
            });
        }
        Message {
            id: "m".into(),
            internal_date: None,
            payload,
        }
    }

    fn assemble(messages: &[Message]) -> Assembly {
        let dir = tempfile::tempdir().unwrap();
        let mut assembler = Assembler::new(messages.len(), dir.path());
        for m in messages {
            assembler.push(m, &NoSource, &FsStorage).unwrap();
        }
        assembler.finish()
    }

    #[test]
    fn test_header_fallbacks() {
        let assembly = assemble(&[message(&[("Subject", "  ")], None)]);
        let f = &assembly.document.fragments[0];
        assert_eq!(f.subject, "No Subject");
        assert_eq!(f.from, "Unknown");
        assert_eq!(f.to, "");
        assert_eq!(f.date, "");
        assert_eq!(f.manifest_line(), "None");
        assert_eq!(f.body, "");
    }

    #[test]
    fn test_display_names_and_escaping() {
        let assembly = assemble(&[message(
            &[
                ("From", "\"Jane <Acme>\" <jane@x.com>"),
                ("To", "Bob <bob@x.com>, carol@x.com"),
                ("Subject", "Q&A <draft>"),
            ],
            Some("<p>hi</p>"),
        )]);
        let html = assembly.document.to_html();
        assert!(html.contains("<b>Subject:</b> Q&amp;A &lt;draft&gt;<br>"));
        assert!(html.contains("<b>To:</b> Bob, carol@x.com<br>"));
        assert!(html.contains("<p>hi</p>"));
    }

    #[test]
    fn test_numbering_and_counters() {
        let msgs: Vec<Message> = (0..3)
            .map(|i| {
                let subject = format!("s{i}");
                message(&[("Subject", subject.as_str())], None)
            })
            .collect();
        let assembly = assemble(&msgs);
        assert_eq!(assembly.counters.messages, 3);
        let labels: Vec<(usize, usize, &str)> = assembly
            .document
            .fragments
            .iter()
            .map(|f| (f.index, f.total, f.subject.as_str()))
            .collect();
        assert_eq!(labels, [(1, 3, "s0"), (2, 3, "s1"), (3, 3, "s2")]);
        assert_eq!(assembly.document.to_html().matches("email-container\"").count(), 3);
    }

    #[test]
    fn test_decode_failure_is_warning() {
        let mut msg = message(&[], None);
        msg.payload.parts.push(Part {
            mime_type: "text/html".into(),
            body: PartBody {
                data: Some("***".into()),
                ..PartBody::default()
            },
            ..Part::default()
        });
        let assembly = assemble(&[msg]);
        assert_eq!(assembly.document.fragments[0].body, "");
        assert!(matches!(
            assembly.warnings.as_slice(),
            [Warning::Decode { index: 1, .. }]
        ));
    }

    #[test]
    fn test_inline_attachment_data() {
        let mut msg = message(&[], None);
        msg.payload.parts.push(Part {
            filename: "note.txt".into(),
            body: PartBody {
                data: Some(encode_base64url(b"inline")),
                ..PartBody::default()
            },
            ..Part::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let mut assembler = Assembler::new(1, dir.path());
        assembler.push(&msg, &NoSource, &FsStorage).unwrap();
        let assembly = assembler.finish();

        assert_eq!(assembly.attachments.len(), 1);
        assert_eq!(assembly.attachments[0].storage_name, "1-1 - note.txt");
        assert_eq!(
            std::fs::read(dir.path().join("1-1 - note.txt")).unwrap(),
            b"inline"
        );
    }
}
