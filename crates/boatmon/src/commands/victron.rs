//! Victron device command handlers.

use tabled::Tabled;

use boatmon_core::{ChannelKind, ConsoleConfig, DeviceKind, DeviceTelemetryBlock};

use crate::cli::{GlobalOpts, VictronArgs, VictronCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Device")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

impl From<&DeviceTelemetryBlock> for DeviceRow {
    fn from(d: &DeviceTelemetryBlock) -> Self {
        Self {
            id: d.device_id.clone(),
            kind: d.kind.to_string(),
            summary: summary(d),
        }
    }
}

/// The headline fields for each device class.
fn headline_fields(kind: DeviceKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        DeviceKind::Shunt => &[("voltage", "V"), ("current", "A"), ("soc", "%")],
        DeviceKind::Mppt => &[("pv_power", "W"), ("battery_voltage", "V"), ("state", "")],
        DeviceKind::Inverter => &[("ac_output_power", "W"), ("state", "")],
        DeviceKind::Unknown => &[],
    }
}

fn summary(d: &DeviceTelemetryBlock) -> String {
    let parts: Vec<String> = headline_fields(d.kind)
        .iter()
        .filter_map(|(name, unit)| {
            let value = d.field(name)?;
            let text = value
                .as_f64()
                .map_or_else(|| value.to_string(), output::format_num);
            Some(if unit.is_empty() {
                format!("{name} {text}")
            } else {
                format!("{name} {text}{unit}")
            })
        })
        .collect();
    if parts.is_empty() {
        format!("{} fields", d.fields.len())
    } else {
        parts.join(", ")
    }
}

fn detail(d: &DeviceTelemetryBlock) -> String {
    let fields: Vec<(String, String)> = d
        .fields
        .iter()
        .map(|(name, value)| (format!("{name}:"), value.to_string()))
        .collect();
    let mut pairs = vec![
        ("Device:", d.device_id.clone()),
        ("Kind:", d.kind.to_string()),
    ];
    pairs.extend(fields.iter().map(|(k, v)| (k.as_str(), v.clone())));
    output::detail_lines(&pairs)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ConsoleConfig,
    args: VictronArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        VictronCommand::List(snapshot) => {
            let (snap, _) = util::first_snapshot(
                config,
                ChannelKind::Victron,
                snapshot.wait,
                |s| !s.devices().is_empty(),
            )
            .await?;

            let devices: Vec<DeviceTelemetryBlock> = snap.devices().values().cloned().collect();
            let out = output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow::from(d),
                |d| d.device_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        VictronCommand::Get { device, snapshot } => {
            let not_found = || CliError::NotFound {
                resource_type: "device".into(),
                identifier: device.clone(),
                list_command: "victron list".into(),
            };

            let (snap, _) = util::first_snapshot(
                config,
                ChannelKind::Victron,
                snapshot.wait,
                |s| s.device(&device).is_some(),
            )
            .await
            .map_err(|e| match e {
                CliError::NoData { .. } => not_found(),
                other => other,
            })?;

            let block = snap.device(&device).ok_or_else(not_found)?;
            let out = output::render_single(&global.output, block, detail, |d| {
                d.fields
                    .iter()
                    .map(|(k, v)| format!("{k}\t{v}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
