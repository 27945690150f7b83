//! Config subcommand handlers.

use dialoguer::{Input, MultiSelect, Select};

use boatmon_core::ChannelKind;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

const MASK: &str = "****";

/// Copy of `cfg` with plaintext passwords masked.
fn redacted(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.settings_password.is_some() {
            profile.settings_password = Some(MASK.into());
        }
    }
    cfg
}

/// Render as TOML with keys and profiles in sorted order.
fn to_toml(cfg: &Config) -> Result<String, CliError> {
    toml::Table::try_from(cfg)
        .and_then(|table| toml::to_string_pretty(&table))
        .map_err(|e| CliError::Internal(format!("cannot render config: {e}")))
}

/// Delegate to the shared config crate's save function.
fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn available(cfg: &Config) -> String {
    let names = cfg.profile_names();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

fn duration_value(key: &str, value: String) -> Result<Option<String>, CliError> {
    humantime::parse_duration(&value).map_err(|e| CliError::Validation {
        field: key.into(),
        reason: format!("'{value}' is not a duration ({e}); try \"3s\" or \"500ms\""),
    })?;
    Ok(Some(value))
}

fn parse_channels(value: &str) -> Result<Vec<ChannelKind>, CliError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<ChannelKind>().map_err(|_| CliError::Validation {
                field: "channels".into(),
                reason: format!("unknown channel '{s}'; expected sensors, victron or relays"),
            })
        })
        .collect()
}

/// Apply `key = value` to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "url" => {
            let url: url::Url = value.parse().map_err(|_| CliError::Validation {
                field: "url".into(),
                reason: format!("invalid URL: {value}"),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(CliError::Validation {
                    field: "url".into(),
                    reason: "must be an http:// or https:// URL".into(),
                });
            }
            profile.url = value;
        }
        "api_prefix" | "api-prefix" => profile.api_prefix = value,
        "settings_password_env" | "settings-password-env" => {
            profile.settings_password_env = Some(value);
        }
        "insecure" => {
            profile.insecure = Some(value.parse().map_err(|_| CliError::Validation {
                field: "insecure".into(),
                reason: "must be 'true' or 'false'".into(),
            })?);
        }
        "timeout" => {
            profile.timeout = Some(value.parse().map_err(|_| CliError::Validation {
                field: "timeout".into(),
                reason: "must be a number (seconds)".into(),
            })?);
        }
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "channels" => profile.channels = Some(parse_channels(&value)?),
        "reconnect_delay" | "reconnect-delay" => {
            profile.reconnect_delay = duration_value("reconnect_delay", value)?;
        }
        "threshold_poll" | "threshold-poll" => {
            profile.threshold_poll = duration_value("threshold_poll", value)?;
        }
        "relay_fallback_window" | "relay-fallback-window" => {
            profile.relay_fallback_window = duration_value("relay_fallback_window", value)?;
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: url, api_prefix, \
                     settings_password_env, insecure, timeout, ca_cert, channels, \
                     reconnect_delay, threshold_poll, relay_fallback_window"
                ),
            });
        }
    }
    Ok(())
}

/// Offer to store the settings password in the system keyring or return it
/// for plaintext config.
///
/// Returns `Some(secret)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_keyring_storage(secret: &str, profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the settings password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        boatmon_config::store_settings_password(profile_name, secret)?;
        eprintln!("   ✓ Settings password stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret.to_owned()))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("⚓ boatmon configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let url: String = Input::new()
                .with_prompt("Backend URL")
                .default("http://boat.local:8000".into())
                .interact_text()
                .map_err(prompt_err)?;

            let kinds = [ChannelKind::Sensors, ChannelKind::Victron, ChannelKind::Relays];
            let labels: Vec<String> = kinds.iter().map(ToString::to_string).collect();
            let picked = MultiSelect::new()
                .with_prompt("Live channels (space to toggle)")
                .items(&labels)
                .defaults(&[true, true, true])
                .interact()
                .map_err(prompt_err)?;
            let channels: Vec<ChannelKind> = picked.into_iter().filter_map(|i| kinds.get(i).copied()).collect();

            let mut profile = Profile::new(String::new());
            set_profile_key(&mut profile, "url", url)?;
            if channels.len() != kinds.len() {
                profile.channels = Some(channels);
            }

            let password =
                rpassword::prompt_password("Settings password (empty to skip): ").map_err(prompt_err)?;
            if !password.is_empty() {
                profile.settings_password = prompt_keyring_storage(&password, &profile_name)?;
            }

            let mut cfg = config::load_config_or_default();
            if cfg.profiles.contains_key(&profile_name) {
                eprintln!("   Replacing existing profile '{profile_name}'");
            }
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: boatmon relays list");

            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(config::load_config_or_default());
            let text = to_toml(&cfg)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |_| text.trim_end().to_owned(),
                |_| config::config_path().display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(|| Profile::new(String::new()));
            set_profile_key(profile, &key, value)?;

            save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: boatmon config init");
            } else {
                for name in cfg.profile_names() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: available(&cfg),
                    name: profile_name,
                });
            }

            let secret = rpassword::prompt_password("Settings password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "settings_password".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            boatmon_config::store_settings_password(&profile_name, &secret)?;

            eprintln!("✓ Settings password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
