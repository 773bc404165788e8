//! atlas-media CLI
//!
//! Command-line interface for reconciling destination photos in the travel
//! catalog against the Places API.

mod cli_types;
mod commands;
mod error;
mod progress;

use std::io::Write;

use clap::Parser;

use cli_types::{Cli, Commands, ConfigAction};
pub(crate) use error::CliError;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let result = match cli.command {
        Commands::Sync {
            select,
            max_passes,
            threshold,
            revalidate,
            all,
            dry_run,
        } => commands::sync::run_sync(
            cli.db,
            select,
            commands::sync::SyncFlags {
                max_passes,
                threshold,
                revalidate,
                all,
                dry_run,
            },
            cli.quiet,
        ),
        Commands::Audit {
            select,
            needs_media,
        } => commands::audit::run_audit(cli.db, select, needs_media, cli.quiet),
        Commands::Import { file, dry_run } => commands::import::run_import(cli.db, &file, dry_run),
        Commands::Status => commands::status::run_status(cli.db),
        Commands::History { limit } => commands::history::run_history(cli.db, limit),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(),
            ConfigAction::Path => commands::config::run_config_path(),
            ConfigAction::SetKey { key } => commands::config::run_config_set_key(&key),
        },
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

/// Install the logger.
///
/// Normal output is plain `info` lines; `--verbose` switches to timestamped
/// records at `debug`. `RUST_LOG` overrides either.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        log::LevelFilter::Warn
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .filter_module("reqwest", log::LevelFilter::Warn)
        .filter_module("hyper_util", log::LevelFilter::Warn)
        .filter_module("rustls", log::LevelFilter::Warn);

    if !verbose {
        builder.format(|buf, record| match record.level() {
            log::Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "{}: {}", level.as_str().to_lowercase(), record.args()),
        });
    }

    builder.parse_env(env_logger::Env::default());
    builder.init();
}

/// Emit an empty line through the logger so `--quiet` suppresses it too.
pub(crate) fn log_blank() {
    log::info!("");
}
