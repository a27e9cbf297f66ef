//! One end-to-end run: search, assemble, render, write.
//!
//! Order of effects:
//!
//! 1. Search the source. Zero matches end the run before anything is
//!    written.
//! 2. Reverse the provider's newest-first order.
//! 3. Create the output directory and write the config snapshot.
//! 4. Fetch and assemble each message, saving its attachments.
//! 5. Render the document and write the artifact.

use std::path::PathBuf;

use crate::error::{Result, Warning};
use crate::export::{Assembler, Renderer, Storage};
use crate::model::attachment::AttachmentRecord;
use crate::source::MailSource;

/// File name of the configuration snapshot in the output directory.
pub const CONFIG_SNAPSHOT_NAME: &str = "config.toml";

/// Inputs of a run that are not collaborators.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Provider-style search query; empty selects everything.
    pub query: String,
    pub output_dir: PathBuf,
    pub document_filename: String,
    /// TOML written to [`CONFIG_SNAPSHOT_NAME`]; `None` skips the snapshot.
    pub config_snapshot: Option<String>,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub messages: usize,
    pub attachments: Vec<AttachmentRecord>,
    pub document_path: PathBuf,
    pub document_size: u64,
    pub warnings: Vec<Warning>,
}

impl RunSummary {
    /// Bytes written for all saved attachments.
    pub fn attachment_bytes(&self) -> u64 {
        self.attachments.iter().map(|a| a.size).sum()
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The search matched nothing; no output was created.
    NoMessages,
    Completed(RunSummary),
}

/// Execute a run.
///
/// `progress` receives `(processed, total)` after each message.
pub fn run(
    source: &dyn MailSource,
    renderer: &dyn Renderer,
    storage: &dyn Storage,
    opts: &RunOptions,
    progress: &dyn Fn(usize, usize),
) -> Result<RunOutcome> {
    let mut refs = source.list_matching(&opts.query)?;
    if refs.is_empty() {
        tracing::info!(query = %opts.query, "No messages matched");
        return Ok(RunOutcome::NoMessages);
    }
    refs.reverse();
    let total = refs.len();
    tracing::info!(query = %opts.query, total, "Messages matched");

    storage.create_dir_all(&opts.output_dir)?;

    let mut warnings = Vec::new();
    if let Some(snapshot) = &opts.config_snapshot {
        let path = opts.output_dir.join(CONFIG_SNAPSHOT_NAME);
        if let Err(e) = storage.write(&path, snapshot.as_bytes()) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write config snapshot");
            warnings.push(Warning::Persist {
                path,
                reason: e.to_string(),
            });
        }
    }

    let mut assembler = Assembler::new(total, &opts.output_dir);
    progress(0, total);
    for (i, message_ref) in refs.iter().enumerate() {
        let message = source.get_message(&message_ref.id)?;
        assembler.push(&message, source, storage)?;
        progress(i + 1, total);
    }
    let assembly = assembler.finish();
    warnings.extend(assembly.warnings);

    let rendered = renderer.render(&assembly.document)?;
    let document_path = opts.output_dir.join(&opts.document_filename);
    storage.write(&document_path, &rendered.bytes)?;
    tracing::info!(
        path = %document_path.display(),
        size = rendered.bytes.len(),
        "Document written"
    );

    for notice in rendered.warnings {
        tracing::warn!(notice = %notice, "Renderer reported a layout issue");
        warnings.push(Warning::Render(notice));
    }

    Ok(RunOutcome::Completed(RunSummary {
        messages: assembly.counters.messages,
        attachments: assembly.attachments,
        document_path,
        document_size: rendered.bytes.len() as u64,
        warnings,
    }))
}
