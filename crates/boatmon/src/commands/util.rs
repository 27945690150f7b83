//! Shared helpers for command handlers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;

use boatmon_core::{
    ChannelConfig, ChannelKind, Console, ConsoleConfig, TelemetrySnapshot, ThresholdSet,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Stderr spinner for a backend round-trip. Hidden in quiet mode.
pub fn spinner(message: &str, global: &GlobalOpts) -> ProgressBar {
    if global.quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Connect with only the `kind` channel and wait up to `wait_secs` for a
/// snapshot that satisfies `ready`.
///
/// Also returns the thresholds loaded on connect so readings can be graded.
pub async fn first_snapshot(
    mut config: ConsoleConfig,
    kind: ChannelKind,
    wait_secs: u64,
    ready: impl Fn(&TelemetrySnapshot) -> bool,
) -> Result<(Arc<TelemetrySnapshot>, Option<ThresholdSet>), CliError> {
    config.channels.retain(|c| c.kind == kind);
    if config.channels.is_empty() {
        config.channels.push(ChannelConfig::new(kind));
    }
    config.threshold_poll_interval = Duration::ZERO;

    let console = Console::new(config)?;
    console.connect().await?;

    let mut sub = console.subscribe();
    let snapshot = if ready(sub.current()) {
        Some(Arc::clone(sub.current()))
    } else {
        tokio::time::timeout(Duration::from_secs(wait_secs), async {
            while let Some(snap) = sub.changed().await {
                if ready(&snap) {
                    return Some(snap);
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
    };

    let thresholds = console.thresholds();
    console.disconnect().await;

    snapshot
        .map(|snap| (snap, thresholds))
        .ok_or_else(|| CliError::NoData {
            channel: kind.to_string(),
            seconds: wait_secs,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize)]
    struct Payload {
        value: f64,
    }

    #[test]
    fn read_json_file_parses_typed_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(&path, r#"{"value": 2.5}"#).unwrap();
        let parsed: Payload = read_json_file(&path).unwrap();
        assert!((parsed.value - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn read_json_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(&path, "not json").unwrap();
        let parsed: Result<Payload, _> = read_json_file(&path);
        assert!(matches!(parsed, Err(CliError::Validation { .. })));
    }
}
