mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use secrecy::SecretString;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use boatmon_core::ConsoleConfig;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Watch mode owns the terminal, so its logs go to a file.
    let _guard = match cli.command {
        Command::Watch(ref args) => Some(init_file_tracing(
            cli.global.verbose,
            args.log_file.clone(),
        )),
        _ => {
            init_tracing(cli.global.verbose);
            None
        }
    };

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// File-based tracing for `watch`. The returned guard flushes on drop and
/// must live until the process exits.
fn init_file_tracing(verbosity: u8, log_file: Option<PathBuf>) -> WorkerGuard {
    let path = log_file.unwrap_or_else(|| config::log_dir().join("boatmon.log"));
    let dir = path
        .parent()
        .map_or_else(std::env::temp_dir, std::path::Path::to_path_buf);
    let file_name = path
        .file_name()
        .map_or_else(|| "boatmon.log".into(), std::ffi::OsStr::to_os_string);
    let _ = std::fs::create_dir_all(&dir);

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity.max(1))));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a backend
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "boatmon", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let needs_password = commands::needs_settings_password(&cmd);
            let console_config = build_console_config(&cli.global, needs_password)?;

            tracing::debug!(command = ?cmd, url = %console_config.url, "dispatching command");
            commands::dispatch(cmd, console_config, &cli.global).await
        }
    }
}

/// Build a `ConsoleConfig` from the config file, profile, and CLI overrides.
///
/// Commands that hit settings-protected endpoints prompt for the password
/// when none was resolved and stdin is a terminal.
fn build_console_config(
    global: &cli::GlobalOpts,
    needs_password: bool,
) -> Result<ConsoleConfig, CliError> {
    let cfg = config::load_config_or_default();
    let profile_name = config::active_profile_name(global, &cfg);

    let mut console_config = match cfg.profiles.get(&profile_name) {
        Some(profile) => config::resolve_profile(profile, &profile_name, global)?,
        None if global.url.is_some() => config::from_flags(global)?,
        None if global.profile.is_some() => {
            return Err(boatmon_config::ConfigError::ProfileNotFound {
                name: profile_name,
                available: cfg.profile_names(),
            }
            .into());
        }
        None => config::from_flags(global)?,
    };

    if needs_password
        && console_config.settings_password.is_none()
        && std::io::stdin().is_terminal()
    {
        let pw = rpassword::prompt_password("Settings password: ")?;
        if !pw.is_empty() {
            console_config.settings_password = Some(SecretString::from(pw));
        }
    }

    Ok(console_config)
}
