//! Command dispatch: bridges CLI args -> console operations -> output formatting.

pub mod calibration;
pub mod config_cmd;
pub mod relays;
pub mod sensors;
pub mod thresholds;
pub mod util;
pub mod victron;
pub mod watch;

use boatmon_core::ConsoleConfig;

use crate::cli::{Command, GlobalOpts, ThresholdsCommand};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: ConsoleConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(config, args, global).await,
        Command::Sensors(args) => sensors::handle(config, args, global).await,
        Command::Victron(args) => victron::handle(config, args, global).await,
        Command::Relays(args) => relays::handle(config, args, global).await,
        Command::Thresholds(args) => thresholds::handle(config, args, global).await,
        Command::Calibration(args) => calibration::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Whether `cmd` calls a settings-protected endpoint.
pub fn needs_settings_password(cmd: &Command) -> bool {
    match cmd {
        Command::Thresholds(args) => !matches!(args.command, ThresholdsCommand::Show),
        Command::Calibration(_) => true,
        _ => false,
    }
}
