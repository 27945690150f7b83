//! Relay command handlers.

use tabled::Tabled;

use boatmon_core::{Console, ConsoleConfig, CoreError, RelayConfigUpdate, RelayDevice, RelayMode};

use crate::cli::{GlobalOpts, RelayConfigureArgs, RelayModeArg, RelaysArgs, RelaysCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RelayRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Board")]
    board: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

fn row(r: &RelayDevice, color: bool) -> RelayRow {
    RelayRow {
        id: r.id.clone(),
        name: r.display_name().to_owned(),
        board: format!("{}/{}", r.board_id, r.relay_number),
        state: output::paint_on_off(r.state, color),
        mode: mode_label(r),
        enabled: if r.enabled { "yes".into() } else { "no".into() },
    }
}

fn mode_label(r: &RelayDevice) -> String {
    match r.mode {
        RelayMode::Flash => format!("flash ({}s)", output::opt_num(r.flash_interval_seconds)),
        RelayMode::Timed => format!("timed ({}s)", output::opt_num(r.timed_duration_seconds)),
        other => other.to_string(),
    }
}

fn detail(r: &RelayDevice, color: bool) -> String {
    output::detail_lines(&[
        ("ID:", r.id.clone()),
        ("Name:", r.display_name().to_owned()),
        ("Board:", r.board_id.to_string()),
        ("Relay:", r.relay_number.to_string()),
        ("State:", output::paint_on_off(r.state, color)),
        ("Mode:", mode_label(r)),
        ("Enabled:", r.enabled.to_string()),
    ])
}

// ── Arg translation ─────────────────────────────────────────────────

fn to_update(args: &RelayConfigureArgs) -> RelayConfigUpdate {
    let enabled = if args.enable {
        Some(true)
    } else if args.disable {
        Some(false)
    } else {
        None
    };
    RelayConfigUpdate {
        name: args.name.clone(),
        enabled,
        mode: args.mode.map(|m| match m {
            RelayModeArg::Normal => RelayMode::Normal,
            RelayModeArg::Flash => RelayMode::Flash,
            RelayModeArg::Timed => RelayMode::Timed,
        }),
        flash_interval_seconds: args.flash_interval,
        timed_duration_seconds: args.timed_duration,
    }
}

/// The relay as the store sees it after a command, preferring the
/// backend's echo when the store has not caught up.
fn settled(console: &Console, relay_id: &str, echoed: Option<RelayDevice>) -> Option<RelayDevice> {
    console.snapshot().relay(relay_id).cloned().or(echoed)
}

enum Switch {
    On,
    Off,
    Toggle,
}

async fn switch(
    config: ConsoleConfig,
    relay: String,
    how: Switch,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let verb = match how {
        Switch::On => "Switching on",
        Switch::Off => "Switching off",
        Switch::Toggle => "Toggling",
    };
    let pb = util::spinner(&format!("{verb} relay '{relay}'"), global);

    let result = Console::oneshot(config, |console| {
        let relay = relay.clone();
        async move {
            let echoed = match how {
                Switch::On => console.set_relay(&relay, true).await?,
                Switch::Off => console.set_relay(&relay, false).await?,
                Switch::Toggle => console.toggle_relay(&relay).await?,
            };
            Ok::<_, CoreError>(settled(&console, &relay, echoed))
        }
    })
    .await;
    pb.finish_and_clear();

    match result? {
        Some(r) => {
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &r,
                |r| format!("Relay '{}' is {}", r.display_name(), output::paint_on_off(r.state, color)),
                |r| r.state.to_string(),
            )?;
            output::print_output(&out, global.quiet);
        }
        None => {
            if !global.quiet {
                eprintln!("✓ Command for relay '{relay}' accepted");
            }
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ConsoleConfig,
    args: RelaysArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        RelaysCommand::List => {
            let relays = Console::oneshot(config, |console| async move {
                let records = console.client().list_relays().await?;
                Ok::<_, CoreError>(records.into_iter().map(RelayDevice::from).collect::<Vec<_>>())
            })
            .await?;

            let out = output::render_list(
                &global.output,
                &relays,
                |r| row(r, color),
                |r| format!("{}\t{}", r.id, if r.state { "on" } else { "off" }),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RelaysCommand::On { relay } => switch(config, relay, Switch::On, global).await,
        RelaysCommand::Off { relay } => switch(config, relay, Switch::Off, global).await,
        RelaysCommand::Toggle { relay } => switch(config, relay, Switch::Toggle, global).await,

        RelaysCommand::Configure(cfg_args) => {
            let update = to_update(&cfg_args);
            let relay = cfg_args.relay;
            let pb = util::spinner(&format!("Configuring relay '{relay}'"), global);

            let result = Console::oneshot(config, |console| {
                let relay = relay.clone();
                async move {
                    let echoed = console.configure_relay(&relay, &update).await?;
                    Ok::<_, CoreError>(settled(&console, &relay, echoed))
                }
            })
            .await;
            pb.finish_and_clear();

            match result? {
                Some(r) => {
                    let out = output::render_single(
                        &global.output,
                        &r,
                        |r| detail(r, color),
                        |r| r.id.clone(),
                    )?;
                    output::print_output(&out, global.quiet);
                }
                None => {
                    if !global.quiet {
                        eprintln!("✓ Relay '{relay}' updated");
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn configure_args(argv: &[&str]) -> RelayConfigureArgs {
        let mut full = vec!["boatmon", "relays", "configure"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Relays(RelaysArgs {
                command: RelaysCommand::Configure(args),
            }) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn configure_flags_become_update() {
        let update = to_update(&configure_args(&[
            "r1",
            "--mode",
            "flash",
            "--flash-interval",
            "0.5",
            "--disable",
        ]));
        assert_eq!(update.mode, Some(RelayMode::Flash));
        assert_eq!(update.flash_interval_seconds, Some(0.5));
        assert_eq!(update.enabled, Some(false));
        assert_eq!(update.name, None);
    }

    #[test]
    fn enable_and_disable_conflict() {
        let parsed = Cli::try_parse_from([
            "boatmon", "relays", "configure", "r1", "--enable", "--disable",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn mode_label_includes_timing() {
        let relay = RelayDevice {
            id: "r1".into(),
            board_id: 0,
            relay_number: 3,
            name: String::new(),
            enabled: true,
            mode: RelayMode::Timed,
            state: false,
            flash_interval_seconds: None,
            timed_duration_seconds: Some(30.0),
        };
        assert_eq!(mode_label(&relay), "timed (30s)");
        assert_eq!(relay.display_name(), "r1");
    }
}
