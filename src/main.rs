//! CLI entry point for `mailbinder`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailbinder::config::{self, Config, SourceKind};
use mailbinder::export::{FsStorage, HtmlRenderer};
use mailbinder::pipeline::{self, RunOptions, RunOutcome, RunSummary};
use mailbinder::source::{open_source, MailSource};

#[derive(Parser)]
#[command(
    name = "mailbinder",
    version,
    about = "Bind the messages matching a search into one paginated document"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file to use instead of the standard locations
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Search, assemble the document and save attachments (default)
    Run(RunArgs),
    /// Preview the messages a run would include, oldest first
    List {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        json: bool,
    },
    /// Write a default config file
    InitConfig {
        /// Target path (defaults to the standard config location)
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Which mailbox to search, overriding the config.
#[derive(Args, Default)]
struct SourceArgs {
    /// Search query, e.g. `from:billing@acme.com after:2024/01/01`
    #[arg(short, long)]
    query: Option<String>,

    /// MBOX file, `.eml` directory or JSON dump directory
    #[arg(short, long, value_name = "PATH")]
    source: Option<PathBuf>,

    /// Source format
    #[arg(short, long, value_enum)]
    kind: Option<SourceKind>,
}

impl SourceArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(query) = &self.query {
            config.search.query = query.clone();
        }
        if let Some(source) = &self.source {
            config.source.path = Some(source.clone());
        }
        if let Some(kind) = self.kind {
            config.source.kind = kind;
        }
    }
}

#[derive(Args, Default)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output folder
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Document file name inside the output folder
    #[arg(short, long, value_name = "NAME")]
    document: Option<String>,

    /// Do not write config.toml into the output folder
    #[arg(long)]
    no_snapshot: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        self.source.apply(config);
        if let Some(output) = &self.output {
            config.output.folder = output.clone();
        }
        if let Some(document) = &self.document {
            config.output.document_filename = document.clone();
        }
        if self.no_snapshot {
            config.output.write_config_snapshot = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Run(args)) => cmd_run(config, &args),
        None => cmd_run(config, &RunArgs::default()),
        Some(Commands::List { source, json }) => cmd_list(config, &source, json),
        Some(Commands::InitConfig { path, force }) => cmd_init_config(path, force),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailbinder.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Open the configured source after validating the config.
fn open_configured_source(config: &Config) -> anyhow::Result<Box<dyn MailSource>> {
    config.validate()?;
    let path = config
        .source
        .path
        .as_deref()
        .context("no mail source path configured")?;
    if !path.exists() {
        anyhow::bail!("Mail source not found: {}", path.display());
    }
    Ok(open_source(config.source.kind, path)?)
}

/// Run the full pipeline and print a summary.
fn cmd_run(mut config: Config, args: &RunArgs) -> anyhow::Result<()> {
    args.apply(&mut config);
    let source = open_configured_source(&config)?;

    let opts = RunOptions {
        query: config.search.query.clone(),
        output_dir: config.output.folder.clone(),
        document_filename: config.output.document_filename.trim().to_string(),
        config_snapshot: if config.output.write_config_snapshot {
            Some(config::to_toml(&config)?)
        } else {
            None
        },
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Processing emails [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let outcome = pipeline::run(
        source.as_ref(),
        &HtmlRenderer,
        &FsStorage,
        &opts,
        &|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        },
    )?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    match outcome {
        RunOutcome::NoMessages => {
            if args.json {
                println!("{}", serde_json::json!({ "messages": 0 }));
            } else {
                println!("  No messages found.");
            }
        }
        RunOutcome::Completed(summary) => {
            if args.json {
                print_summary_json(&summary, elapsed)?;
            } else {
                print_summary_table(&summary, elapsed);
            }
        }
    }

    Ok(())
}

/// Print the messages a run would include.
fn cmd_list(mut config: Config, args: &SourceArgs, json: bool) -> anyhow::Result<()> {
    args.apply(&mut config);
    let source = open_configured_source(&config)?;

    let mut refs = source.list_matching(&config.search.query)?;
    refs.reverse();

    let mut rows = Vec::with_capacity(refs.len());
    for message_ref in &refs {
        let message = source.get_message(&message_ref.id)?;
        rows.push(serde_json::json!({
            "id": message.id,
            "date": message.header("date").unwrap_or_default(),
            "from": message.header("from").unwrap_or_default(),
            "subject": message.header("subject").unwrap_or_default(),
            "attachments": message.top_level_attachments().count(),
        }));
    }

    if json {
        let output = serde_json::json!({
            "result_count": rows.len(),
            "results": rows,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  {} result(s)", rows.len());
    println!();
    if rows.is_empty() {
        return Ok(());
    }

    println!(
        "  {:<4} {:<31} {:<25} {:<40} {:>4}",
        "#", "Date", "From", "Subject", "Att"
    );
    println!("  {}", "-".repeat(108));
    for (i, row) in rows.iter().enumerate() {
        let field = |key: &str, width: usize| -> String {
            row[key].as_str().unwrap_or_default().chars().take(width).collect()
        };
        println!(
            "  {:<4} {:<31} {:<25} {:<40} {:>4}",
            i + 1,
            field("date", 31),
            field("from", 24),
            field("subject", 39),
            row["attachments"].as_u64().unwrap_or(0)
        );
    }
    println!();

    Ok(())
}

/// Write a default config file.
fn cmd_init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p,
        None => config::config_file_path().context("cannot determine config directory")?,
    };
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    config::save_config(&Config::default(), &path)?;
    println!("  Wrote {}", path.display());
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailbinder", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print the run summary as a human-readable table.
fn print_summary_table(summary: &RunSummary, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  Run complete:");
    println!("  {:<20} {}", "Messages", summary.messages);
    println!(
        "  {:<20} {} ({})",
        "Attachments",
        summary.attachments.len(),
        format_size(summary.attachment_bytes(), BINARY)
    );
    println!(
        "  {:<20} {} ({})",
        "Document",
        summary.document_path.display(),
        format_size(summary.document_size, BINARY)
    );
    println!("  {:<20} {:.2?}", "Elapsed", elapsed);

    if !summary.warnings.is_empty() {
        println!();
        println!("  {} warning(s):", summary.warnings.len());
        for warning in &summary.warnings {
            println!("    - {warning}");
        }
    }
    println!();
}

/// Print the run summary as JSON.
fn print_summary_json(summary: &RunSummary, elapsed: std::time::Duration) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "messages": summary.messages,
        "attachments": summary.attachments,
        "attachment_bytes": summary.attachment_bytes(),
        "document": path_str(&summary.document_path),
        "document_size": summary.document_size,
        "elapsed_ms": elapsed.as_millis(),
        "warnings": summary
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
