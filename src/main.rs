mod config;
mod contact;
mod directory;
mod phone;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use config::Config;
use contact::Store;
use directory::http::HttpDirectory;
use directory::{AddContactRequest, Directory};
use ui::app::{App, FormOutcome, Submission};

#[derive(Parser, Debug)]
#[command(name = "peerbook")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default configuration file
    Init(InitArgs),
    /// Add or update a contact without opening the TUI
    Add(AddArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Base URL of the directory server
    #[arg(long)]
    server: String,

    /// Overwrite an existing configuration file
    #[arg(long, default_value_t = false)]
    force: bool,
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Contact id to update; a new id is generated when omitted
    #[arg(long)]
    id: Option<uuid::Uuid>,

    /// Phone number to attach
    #[arg(long)]
    phone: Option<String>,

    /// Grant a one-off phone privacy exception
    #[arg(long, default_value_t = false)]
    share_phone: bool,

    first: String,

    #[arg(default_value = "")]
    last: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing();

    if let Some(command) = cli.command {
        match command {
            Command::Init(args) => return handle_init(args, cli.config.as_deref()),
            Command::Add(args) => {
                let config = config::load(cli.config.as_deref())?;
                return handle_add(args, &config);
            }
        }
    }

    let config = config::load(cli.config.as_deref())?;
    tracing::info!(server = %config.server.base_url, "starting peerbook");
    run_tui(config)
}

/// Log to a file under the config directory; the terminal belongs to the TUI.
/// Logging is best-effort: a missing or read-only home disables it.
fn init_tracing() -> Option<WorkerGuard> {
    let dir = config::log_dir().ok()?;
    std::fs::create_dir_all(&dir).ok()?;
    let appender = tracing_appender::rolling::never(&dir, "peerbook.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn handle_init(args: InitArgs, config_override: Option<&Path>) -> Result<()> {
    let path = match config_override {
        Some(path) => config::expand_tilde(path),
        None => {
            config::ensure_config_dir()?;
            config::config_path()?
        }
    };

    config::write_default(&path, &args.server, args.force)?;
    println!("Initialized peerbook configuration at {}", path.display());
    Ok(())
}

fn handle_add(args: AddArgs, config: &Config) -> Result<()> {
    let first = contact::normalize_name(&args.first);
    let last = contact::normalize_name(&args.last);
    if first.is_empty() && last.is_empty() {
        bail!("first and last name must not both be empty");
    }

    let request = AddContactRequest {
        id: args.id.unwrap_or_else(uuid::Uuid::new_v4),
        first_name: first.clone(),
        last_name: last.clone(),
        phone: args.phone.unwrap_or_default(),
        add_phone_privacy_exception: args.share_phone,
    };

    let directory = HttpDirectory::new(&config.server)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let batch = runtime
        .block_on(directory.add_contact(&request))
        .context("failed to add contact")?;

    let shown = if first.is_empty() { &last } else { &first };
    println!(
        "Saved contact {} ({} update(s) applied).",
        shown,
        batch.contacts.len()
    );
    Ok(())
}

fn run_tui(config: Config) -> Result<()> {
    let directory = HttpDirectory::new(&config.server)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;

    let listing = runtime
        .block_on(directory.list_contacts())
        .context("failed to load contacts from the directory")?;
    let mut store = Store::new(listing.contacts, listing.phone_hints);

    // Submissions flow to the transport task; completions come back over a
    // channel the UI loop drains on its own thread.
    let (submit_tx, mut submit_rx) = tokio::sync::mpsc::unbounded_channel::<Submission>();
    let (outcome_tx, outcome_rx) = mpsc::channel::<FormOutcome>();

    runtime.spawn(async move {
        while let Some(submission) = submit_rx.recv().await {
            let Submission {
                seq,
                contact_id,
                was_contact,
                request,
            } = submission;
            let result = directory.add_contact(&request).await;
            let outcome = FormOutcome {
                seq,
                contact_id,
                was_contact,
                first_name: request.first_name,
                last_name: request.last_name,
                result,
            };
            if outcome_tx.send(outcome).is_err() {
                break;
            }
        }
    });

    let mut app = App::new(&mut store, &config, submit_tx, outcome_rx);
    app.run()
}
