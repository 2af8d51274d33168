//! CLI entry point for `maildir2pdf`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use maildir2pdf::config::Config;
use maildir2pdf::model::event::{ScanEvent, ScanSummary};
use maildir2pdf::scan::{scan_maildir, ScanOptions};

/// Extract every PDF attachment from a Maildir tree into a directory,
/// keeping each message's date as the file timestamp.
#[derive(Parser)]
#[command(name = "maildir2pdf", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Maildir root to scan
    #[arg(value_name = "MAILDIR")]
    maildir: Option<PathBuf>,

    /// Directory for extracted PDFs (default: current directory)
    #[arg(short, long, global = true, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Print one JSON object per event instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract PDF attachments from every mailbox
    Extract { path: PathBuf },
    /// List the mailboxes that would be scanned
    Mailboxes { path: PathBuf },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = maildir2pdf::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Extract { path }) => cmd_extract(&path, cli.output, cli.json, &config),
        Some(Commands::Mailboxes { path }) => cmd_mailboxes(&path, cli.json),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => match cli.maildir {
            Some(path) => cmd_extract(&path, cli.output, cli.json, &config),
            None => anyhow::bail!("No Maildir given. Usage: maildir2pdf <MAILDIR> (see --help)"),
        },
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
    let log_dir = maildir2pdf::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "maildir2pdf.log");
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

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "maildir2pdf", &mut std::io::stdout());
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

/// Scan a Maildir and write its PDFs.
fn cmd_extract(
    path: &Path,
    output: Option<PathBuf>,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let output_dir = match output.or_else(|| config.output.directory.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine the current directory")?,
    };
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Cannot create output directory {}", output_dir.display()))?;

    let options = ScanOptions::from_config(config, output_dir);

    let pb = if json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("valid template"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let start = Instant::now();
    let result = scan_maildir(path, &options, &mut |event| {
        if json {
            print_event_json(event);
        }
        match event {
            ScanEvent::MailboxStarted(mailbox) => {
                pb.set_message(format!("Scanning {}", mailbox.name));
            }
            ScanEvent::Saved(saved) if !json => pb.suspend(|| {
                println!(
                    "Saved PDF: {} (from {} in mailbox {})",
                    saved.output_path.display(),
                    saved.source_path.display(),
                    saved.mailbox
                );
            }),
            ScanEvent::Saved(_) => {}
            ScanEvent::Warning(warning) => pb.suspend(|| {
                tracing::warn!(
                    scope = %warning.scope,
                    mailbox = %warning.mailbox,
                    path = %warning.path.display(),
                    "{}",
                    warning.reason
                );
            }),
        }
    });
    pb.finish_and_clear();

    let summary =
        result.with_context(|| format!("Error scanning maildir {}", path.display()))?;

    if json {
        let mut value = serde_json::to_value(&summary)?;
        value["event"] = serde_json::json!("summary");
        value["elapsed_ms"] = serde_json::json!(start.elapsed().as_millis());
        println!("{value}");
    } else {
        print_summary(&options.output_dir, &summary, start.elapsed());
    }

    Ok(())
}

/// List discovered mailboxes.
fn cmd_mailboxes(path: &Path, json: bool) -> anyhow::Result<()> {
    let mailboxes = maildir2pdf::maildir::locator::discover_mailboxes(path)
        .with_context(|| format!("Error discovering mailboxes in {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&mailboxes)?);
        return Ok(());
    }

    println!();
    println!("  {} mailbox(es)", mailboxes.len());
    println!();
    for mailbox in &mailboxes {
        println!("  {:<30} {}", mailbox.name, mailbox.path.display());
    }
    println!();
    Ok(())
}

fn print_event_json(event: &ScanEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize event"),
    }
}

/// Print scan totals in a human-readable table.
fn print_summary(output_dir: &Path, summary: &ScanSummary, elapsed: Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<20} {}", "Output directory", output_dir.display());
    println!("  {:<20} {}", "Mailboxes", summary.mailboxes);
    println!("  {:<20} {}", "Messages", summary.messages);
    println!(
        "  {:<20} {} ({})",
        "PDFs saved",
        summary.pdfs_saved,
        format_size(summary.bytes_written, BINARY)
    );
    println!("  {:<20} {}", "Warnings", summary.warnings);
    println!("  {:<20} {:.2?}", "Elapsed", elapsed);
    println!();
}
