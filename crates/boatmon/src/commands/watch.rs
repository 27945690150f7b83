//! `watch`: follow live telemetry until Ctrl-C.
//!
//! Prints alert transitions and channel state changes as they happen, plus a
//! throttled one-line sensor summary. JSON output modes emit one event per
//! line instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::info;

use boatmon_core::{
    Alert, Console, ConsoleConfig, ConnectionState, TelemetrySnapshot, ThresholdSet, evaluate,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

/// How often channel states are sampled.
const STATE_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

// ── Diffing ─────────────────────────────────────────────────────────

/// Alerts that appeared (or changed severity) and sensors whose alert cleared.
fn alert_changes<'a>(previous: &'a [Alert], current: &'a [Alert]) -> (Vec<&'a Alert>, Vec<&'a Alert>) {
    let raised = current
        .iter()
        .filter(|a| {
            !previous
                .iter()
                .any(|p| p.sensor_id == a.sensor_id && p.severity == a.severity)
        })
        .collect();
    let cleared = previous
        .iter()
        .filter(|p| !current.iter().any(|a| a.sensor_id == p.sensor_id))
        .collect();
    (raised, cleared)
}

/// Channel states that differ from the last sample.
fn state_changes<'a>(
    previous: &[ConnectionState],
    current: &'a [ConnectionState],
) -> Vec<&'a ConnectionState> {
    current
        .iter()
        .filter(|s| {
            previous
                .iter()
                .find(|p| p.channel_id == s.channel_id)
                .is_none_or(|p| p.status != s.status)
        })
        .collect()
}

fn summary_line(
    snapshot: &TelemetrySnapshot,
    thresholds: Option<&ThresholdSet>,
    color: bool,
) -> Option<String> {
    if snapshot.sensors().is_empty() {
        return None;
    }
    let parts: Vec<String> = snapshot
        .sensors()
        .values()
        .map(|r| {
            let text = format!("{} {}{}", r.label(), output::format_num(r.value), unit_suffix(r.unit));
            match evaluate(&r.sensor_id, Some(r.value), thresholds).severity() {
                Some(sev) => output::paint_severity(sev, &text, color),
                None => text,
            }
        })
        .collect();
    Some(parts.join(" · "))
}

fn unit_suffix(unit: &str) -> String {
    if unit.is_empty() {
        String::new()
    } else {
        format!(" {unit}")
    }
}

// ── Printing ────────────────────────────────────────────────────────

struct Printer {
    ndjson: bool,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn stamp() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }

    fn line(&self, text: &str) {
        output::print_output(&format!("{} {text}", Self::stamp()), self.quiet);
    }

    fn event(&self, value: &serde_json::Value) {
        output::print_output(&value.to_string(), self.quiet);
    }

    fn alert_raised(&self, alert: &Alert) {
        if self.ndjson {
            self.event(&json!({ "event": "alert", "alert": alert }));
        } else {
            let text = format!("{} {}", alert.icon, alert.message);
            self.line(&output::paint_severity(alert.severity, &text, self.color));
        }
    }

    fn alert_cleared(&self, alert: &Alert) {
        if self.ndjson {
            self.event(&json!({ "event": "alert_cleared", "sensor_id": alert.sensor_id }));
        } else {
            self.line(&format!("✓ {} back to normal", alert.label));
        }
    }

    fn channel(&self, state: &ConnectionState) {
        if self.ndjson {
            self.event(&json!({ "event": "channel", "state": state }));
        } else {
            let attempts = if state.attempt_count > 1 {
                format!(" (attempt {})", state.attempt_count)
            } else {
                String::new()
            };
            self.line(&format!("channel {}: {}{attempts}", state.channel_id, state.status));
        }
    }

    fn sensors(&self, snapshot: &TelemetrySnapshot, thresholds: Option<&ThresholdSet>) -> bool {
        if self.ndjson {
            if snapshot.sensors().is_empty() {
                return false;
            }
            let readings: Vec<_> = snapshot.sensors().values().collect();
            self.event(&json!({ "event": "sensors", "readings": readings }));
            return true;
        }
        match summary_line(snapshot, thresholds, self.color) {
            Some(text) => {
                self.line(&text);
                true
            }
            None => false,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ConsoleConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let printer = Printer {
        ndjson: matches!(global.output, OutputFormat::Json | OutputFormat::JsonCompact),
        color: output::should_color(&global.color),
        quiet: global.quiet,
    };

    let console = Console::new(config)?;
    console.connect().await?;
    info!(url = %console.config().url, "watching");

    let mut snapshots = console.subscribe();
    let mut alerts = console.subscribe_alerts();
    let mut last_states: Vec<ConnectionState> = Vec::new();
    let mut last_summary: Option<Instant> = None;

    let mut last_alerts: Arc<Vec<Alert>> = alerts.latest();
    for alert in last_alerts.iter() {
        printer.alert_raised(alert);
    }

    let mut sample = tokio::time::interval(STATE_SAMPLE_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,

            _ = sample.tick() => {
                let states = console.channel_states().await;
                for state in state_changes(&last_states, &states) {
                    printer.channel(state);
                }
                last_states = states;
            }

            Some(current) = alerts.changed() => {
                let (raised, cleared) = alert_changes(&last_alerts, &current);
                for alert in cleared {
                    printer.alert_cleared(alert);
                }
                for alert in raised {
                    printer.alert_raised(alert);
                }
                last_alerts = current;
            }

            Some(snapshot) = snapshots.changed(), if !args.alerts_only => {
                let due = last_summary.is_none_or(|t| t.elapsed() >= args.interval);
                if due && printer.sensors(&snapshot, console.thresholds().as_ref()) {
                    last_summary = Some(Instant::now());
                }
            }

            else => break,
        }
    }

    info!("stopping watch");
    console.disconnect().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use boatmon_core::{AlertSeverity, ChannelStatus};

    use super::*;

    fn alert(sensor_id: &str, severity: AlertSeverity) -> Alert {
        Alert {
            sensor_id: sensor_id.into(),
            label: sensor_id.into(),
            severity,
            message: format!("{sensor_id} out of range"),
            observed_value: 0.0,
            threshold_value: 0.0,
            icon: severity.icon().into(),
        }
    }

    fn state(id: &str, status: ChannelStatus) -> ConnectionState {
        ConnectionState {
            channel_id: id.into(),
            status,
            attempt_count: 1,
        }
    }

    #[test]
    fn escalation_is_reported_and_recovery_clears() {
        let before = vec![
            alert("engine_rpm", AlertSeverity::Warning),
            alert("coolant_temp", AlertSeverity::Warning),
        ];
        let after = vec![alert("engine_rpm", AlertSeverity::Danger)];

        let (raised, cleared) = alert_changes(&before, &after);
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].severity, AlertSeverity::Danger);
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0].sensor_id, "coolant_temp");
    }

    #[test]
    fn unchanged_alerts_are_quiet() {
        let list = vec![alert("oil_pressure", AlertSeverity::Danger)];
        let (raised, cleared) = alert_changes(&list, &list);
        assert!(raised.is_empty());
        assert!(cleared.is_empty());
    }

    #[test]
    fn only_changed_channels_are_reported() {
        let before = vec![
            state("sensors", ChannelStatus::Open),
            state("relays", ChannelStatus::Connecting),
        ];
        let after = vec![
            state("sensors", ChannelStatus::Open),
            state("relays", ChannelStatus::Open),
            state("victron", ChannelStatus::Connecting),
        ];
        let changed: Vec<&str> = state_changes(&before, &after)
            .into_iter()
            .map(|s| s.channel_id.as_str())
            .collect();
        assert_eq!(changed, ["relays", "victron"]);
    }

    #[test]
    fn empty_snapshot_has_no_summary() {
        assert_eq!(summary_line(&TelemetrySnapshot::default(), None, false), None);
    }
}
