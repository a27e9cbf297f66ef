//! Output side of a run: attachment files, the assembled document, and
//! the renderer and storage it is handed to.

pub mod attachment;
pub mod document;
pub mod render;
pub mod storage;

pub use self::document::{Assembler, Assembly, Counters, Document, DocumentFragment};
pub use self::render::{HtmlRenderer, Rendered, Renderer};
pub use self::storage::{FsStorage, Storage};
