//! Clap derive structures for the `boatmon` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// boatmon -- live engine, tank, battery and relay console for your boat
#[derive(Debug, Parser)]
#[command(
    name = "boatmon",
    version,
    about = "Monitor boat telemetry and switch relays from the command line",
    long_about = "An operator console for a boat monitoring backend.\n\n\
        Streams engine, tank and Victron telemetry over live channels, grades\n\
        readings against the configured thresholds, and drives relay boards.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "BOATMON_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 'u', env = "BOATMON_URL", global = true)]
    pub url: Option<String>,

    /// Settings password for protected endpoints
    #[arg(long, env = "BOATMON_SETTINGS_PASSWORD", global = true, hide_env_values = true)]
    pub settings_password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BOATMON_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "BOATMON_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "BOATMON_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow live telemetry, alerts and channel state
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Current engine and tank sensor readings
    #[command(alias = "s")]
    Sensors(SensorsArgs),

    /// Current Victron device telemetry (shunt, MPPT, inverter)
    #[command(alias = "v")]
    Victron(VictronArgs),

    /// List and switch relays
    #[command(alias = "r")]
    Relays(RelaysArgs),

    /// Alert thresholds
    #[command(alias = "th")]
    Thresholds(ThresholdsArgs),

    /// Sensor calibration parameters
    #[command(alias = "cal")]
    Calibration(CalibrationArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Minimum time between sensor summary lines (e.g. "1s", "500ms")
    #[arg(long, short = 'i', default_value = "1s", value_parser = humantime_duration)]
    pub interval: std::time::Duration,

    /// Only print alert and channel changes
    #[arg(long)]
    pub alerts_only: bool,

    /// Write logs to this file instead of the default log directory
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

fn humantime_duration(raw: &str) -> Result<std::time::Duration, String> {
    raw.parse::<humantime::Duration>()
        .map(Into::into)
        .map_err(|e| e.to_string())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SENSORS / VICTRON
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shared arguments for commands that read one live snapshot.
#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Seconds to wait for the first update
    #[arg(long, short = 'w', default_value = "5")]
    pub wait: u64,
}

#[derive(Debug, Args)]
pub struct SensorsArgs {
    #[command(subcommand)]
    pub command: SensorsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SensorsCommand {
    /// List every sensor with its status
    #[command(alias = "ls")]
    List(SnapshotArgs),

    /// Show one sensor
    Get {
        /// Sensor id (e.g. engine_rpm, fuel_tank)
        sensor: String,

        #[command(flatten)]
        snapshot: SnapshotArgs,
    },
}

#[derive(Debug, Args)]
pub struct VictronArgs {
    #[command(subcommand)]
    pub command: VictronCommand,
}

#[derive(Debug, Subcommand)]
pub enum VictronCommand {
    /// List Victron devices
    #[command(alias = "ls")]
    List(SnapshotArgs),

    /// Show all fields of one device
    Get {
        /// Device id
        device: String,

        #[command(flatten)]
        snapshot: SnapshotArgs,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RELAYS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RelaysArgs {
    #[command(subcommand)]
    pub command: RelaysCommand,
}

#[derive(Debug, Subcommand)]
pub enum RelaysCommand {
    /// List relays and their state
    #[command(alias = "ls")]
    List,

    /// Switch a relay on
    On {
        /// Relay id
        relay: String,
    },

    /// Switch a relay off
    Off {
        /// Relay id
        relay: String,
    },

    /// Flip a relay
    Toggle {
        /// Relay id
        relay: String,
    },

    /// Change name, enablement, mode or timing of a relay
    Configure(RelayConfigureArgs),
}

#[derive(Debug, Args)]
pub struct RelayConfigureArgs {
    /// Relay id
    pub relay: String,

    /// New display name
    #[arg(long)]
    pub name: Option<String>,

    /// Allow commands to this relay
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    /// Refuse commands to this relay
    #[arg(long)]
    pub disable: bool,

    /// Switching mode
    #[arg(long, value_enum)]
    pub mode: Option<RelayModeArg>,

    /// Flash interval in seconds (flash mode)
    #[arg(long)]
    pub flash_interval: Option<f64>,

    /// On duration in seconds (timed mode)
    #[arg(long)]
    pub timed_duration: Option<f64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RelayModeArg {
    Normal,
    Flash,
    Timed,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  THRESHOLDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ThresholdsArgs {
    #[command(subcommand)]
    pub command: ThresholdsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ThresholdsCommand {
    /// Show the thresholds in force
    Show,

    /// Change one or more thresholds (requires the settings password)
    Set {
        /// Engine RPM maximum
        #[arg(long)]
        rpm_max: Option<f64>,

        /// Oil pressure minimum (PSI)
        #[arg(long)]
        oil_min: Option<f64>,

        /// Oil pressure maximum (PSI)
        #[arg(long)]
        oil_max: Option<f64>,

        /// Coolant temperature maximum (°C)
        #[arg(long)]
        coolant_max: Option<f64>,
    },

    /// Restore backend defaults (requires the settings password)
    Reset,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CALIBRATION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CalibrationArgs {
    #[command(subcommand)]
    pub command: CalibrationCommand,
}

#[derive(Debug, Subcommand)]
pub enum CalibrationCommand {
    /// Show calibration for every sensor (requires the settings password)
    Show,

    /// Replace calibration from a JSON file (requires the settings password)
    Set {
        /// JSON file mapping sensor id to its parameters
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (e.g. "url", "reconnect_delay")
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the settings password in the system keyring
    SetPassword,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
