use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use yt_cli::commands::util::{epoch_secs, resolve_when};
use yt_cli::commands::{add, archive, edit, export, list, session, show, sort, status};
use yt_cli::{Cli, Commands, Config};
use yt_storage::{DataLock, Storage};

/// Load config and lock the data directory for the rest of the command.
fn open_storage(config_path: Option<&Path>) -> Result<(Storage, Config, DataLock)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let storage = Storage::new(&config.data_dir);
    let lock = storage.lock().context("failed to lock data directory")?;
    Ok((storage, config, lock))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (storage, config, _lock) = open_storage(cli.config.as_deref())?;
    let now = Utc::now();
    let mut out = io::stdout().lock();

    match command {
        Commands::Add {
            title,
            description,
            source,
        } => add::run(&mut out, &storage, title, description, source)?,
        Commands::List { json } => {
            list::run(&mut out, &storage, &config.merge, epoch_secs(&now), *json)?;
        }
        Commands::Start(when) => {
            let at = resolve_when(when.at.as_deref(), now)?;
            session::start(&mut out, &storage, &config, &when.title, at, epoch_secs(&now))?;
        }
        Commands::Stop(when) => {
            let at = resolve_when(when.at.as_deref(), now)?;
            session::stop(&mut out, &storage, &config, &when.title, at)?;
        }
        Commands::Toggle(when) => {
            let at = resolve_when(when.at.as_deref(), now)?;
            session::toggle(&mut out, &storage, &config, &when.title, at, epoch_secs(&now))?;
        }
        Commands::Status { at } => {
            let at = resolve_when(at.as_deref(), now)?;
            status::run(&mut out, &storage, &config.merge, at)?;
        }
        Commands::Show { title } => show::run(&mut out, &storage, title, &Local)?,
        Commands::Edit {
            title,
            new_title,
            description,
            source,
        } => {
            let changes = edit::TimerChanges {
                title: new_title.as_deref(),
                description: description.as_deref(),
                source: source.as_deref(),
            };
            edit::edit(&mut out, &storage, title, &changes)?;
        }
        Commands::Note { title, index, text } => {
            edit::note(&mut out, &storage, title, *index, text)?;
        }
        Commands::SetIntervals { title, file } => {
            edit::set_intervals(&mut out, &storage, title, file)?;
        }
        Commands::Sort => sort::run(&mut out, &storage)?,
        Commands::Export(args) => {
            export::run(&mut out, &storage, &config, args, &now.with_timezone(&Local))?;
        }
        Commands::Archive { timer: None } => archive::archive_exported(&mut out, &storage)?,
        Commands::Archive { timer: Some(title) } => {
            archive::archive_timer(&mut out, &storage, &config, title, epoch_secs(&now))?;
        }
    }

    Ok(())
}
