//! Message decoding: MBOX splitting, header decoding, MIME trees and body payloads.

pub mod body;
pub mod header;
pub mod mbox;
pub mod mime;
