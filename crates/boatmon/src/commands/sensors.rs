//! Sensor command handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use boatmon_core::{ChannelKind, ConsoleConfig, SensorReading, SensorStatus, ThresholdSet, evaluate};

use crate::cli::{GlobalOpts, SensorsArgs, SensorsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── View ────────────────────────────────────────────────────────────

/// A reading together with its grade against the current thresholds.
#[derive(Debug, Serialize)]
struct SensorView {
    sensor_id: String,
    label: String,
    value: f64,
    unit: &'static str,
    status: SensorStatus,
    received_at: DateTime<Utc>,
}

impl SensorView {
    fn new(reading: &SensorReading, thresholds: Option<&ThresholdSet>) -> Self {
        Self {
            sensor_id: reading.sensor_id.clone(),
            label: reading.label(),
            value: reading.value,
            unit: reading.unit,
            status: evaluate(&reading.sensor_id, Some(reading.value), thresholds),
            received_at: reading.received_at,
        }
    }
}

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "Sensor")]
    id: String,
    #[tabled(rename = "Name")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn row(v: &SensorView, color: bool) -> SensorRow {
    SensorRow {
        id: v.sensor_id.clone(),
        label: v.label.clone(),
        value: with_unit(v.value, v.unit),
        status: output::paint_status(v.status, color),
        updated: v.received_at.with_timezone(&chrono::Local).format("%H:%M:%S").to_string(),
    }
}

fn with_unit(value: f64, unit: &str) -> String {
    if unit.is_empty() {
        output::format_num(value)
    } else {
        format!("{} {unit}", output::format_num(value))
    }
}

fn detail(v: &SensorView, color: bool) -> String {
    output::detail_lines(&[
        ("Sensor:", v.sensor_id.clone()),
        ("Name:", v.label.clone()),
        ("Value:", with_unit(v.value, v.unit)),
        ("Status:", output::paint_status(v.status, color)),
        ("Updated:", v.received_at.to_rfc3339()),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ConsoleConfig,
    args: SensorsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        SensorsCommand::List(snapshot) => {
            let (snap, thresholds) = util::first_snapshot(
                config,
                ChannelKind::Sensors,
                snapshot.wait,
                |s| !s.sensors().is_empty(),
            )
            .await?;

            let views: Vec<SensorView> = snap
                .sensors()
                .values()
                .map(|r| SensorView::new(r, thresholds.as_ref()))
                .collect();
            let out = output::render_list(
                &global.output,
                &views,
                |v| row(v, color),
                |v| format!("{}\t{}", v.sensor_id, output::format_num(v.value)),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SensorsCommand::Get { sensor, snapshot } => {
            let (snap, thresholds) = util::first_snapshot(
                config,
                ChannelKind::Sensors,
                snapshot.wait,
                |s| s.sensor(&sensor).is_some(),
            )
            .await
            .map_err(|e| match e {
                CliError::NoData { .. } => CliError::NotFound {
                    resource_type: "sensor".into(),
                    identifier: sensor.clone(),
                    list_command: "sensors list".into(),
                },
                other => other,
            })?;

            let reading = snap.sensor(&sensor).ok_or_else(|| CliError::NotFound {
                resource_type: "sensor".into(),
                identifier: sensor.clone(),
                list_command: "sensors list".into(),
            })?;
            let view = SensorView::new(reading, thresholds.as_ref());
            let out = output::render_single(
                &global.output,
                &view,
                |v| detail(v, color),
                |v| output::format_num(v.value),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
