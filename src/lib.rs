//! `mailbinder`: bind the messages matching a mail search into one
//! paginated document, with their attachments saved alongside.
//!
//! The library covers the whole run: sources to search and fetch from,
//! HTML body extraction and sanitization, document assembly, rendering and
//! storage. The `mailbinder` binary wires these together behind a CLI.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod sanitize;
pub mod search;
pub mod source;
