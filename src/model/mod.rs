//! Core data model types for messages, addresses, and attachments.

pub mod address;
pub mod attachment;
pub mod message;
