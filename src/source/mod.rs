//! Mail sources: where matched messages and their attachments come from.
//!
//! The pipeline only talks to [`MailSource`]. Two local implementations
//! ship with the crate; a hosted provider plugs in behind the same trait.

pub mod json;
pub mod mbox;

use std::path::Path;

use crate::config::SourceKind;
use crate::error::Result;
use crate::model::message::{Message, MessageRef};

pub use self::json::JsonSource;
pub use self::mbox::MboxSource;

/// Search and fetch interface of a mailbox.
///
/// Every method is a blocking call. Any error is fatal to the run.
pub trait MailSource {
    /// Messages matching a provider-style query, newest first.
    fn list_matching(&self, query: &str) -> Result<Vec<MessageRef>>;

    /// Fetch a full message with its part tree.
    fn get_message(&self, id: &str) -> Result<Message>;

    /// Raw bytes of an attachment referenced by a part's `attachment_id`.
    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>>;
}

/// Open the source of the given kind at `path`.
pub fn open_source(kind: SourceKind, path: &Path) -> Result<Box<dyn MailSource>> {
    Ok(match kind {
        SourceKind::Mbox => Box::new(MboxSource::open(path)?),
        SourceKind::Json => Box::new(JsonSource::open(path)?),
    })
}
