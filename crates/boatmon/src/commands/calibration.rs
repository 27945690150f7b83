//! Calibration command handlers.

use tabled::Tabled;

use boatmon_core::{Calibration, Console, ConsoleConfig, SensorCalibration, sensor_label};

use crate::cli::{CalibrationArgs, CalibrationCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct CalibrationRow {
    #[tabled(rename = "Sensor")]
    sensor: String,
    #[tabled(rename = "Offset")]
    offset: String,
    #[tabled(rename = "Scale")]
    scale: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Pulses/Rev")]
    pulses_per_rev: String,
    #[tabled(rename = "Other")]
    other: String,
}

/// One sensor's entry, flattened for list rendering.
#[derive(serde::Serialize)]
struct Entry<'a> {
    sensor_id: &'a str,
    #[serde(flatten)]
    params: &'a SensorCalibration,
}

impl From<&Entry<'_>> for CalibrationRow {
    fn from(e: &Entry<'_>) -> Self {
        let p = e.params;
        Self {
            sensor: format!("{} ({})", sensor_label(e.sensor_id), e.sensor_id),
            offset: output::opt_num(p.offset),
            scale: output::opt_num(p.scale),
            min: output::opt_num(p.min),
            max: output::opt_num(p.max),
            pulses_per_rev: output::opt_num(p.pulses_per_rev),
            other: p.extra.keys().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

fn render(calibration: &Calibration, global: &GlobalOpts) -> Result<(), CliError> {
    let out = match global.output {
        // Structured formats keep the backend's keyed shape.
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            output::render_single(&global.output, calibration, |_| String::new(), |_| String::new())?
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let entries: Vec<Entry<'_>> = calibration
                .iter()
                .map(|(sensor_id, params)| Entry { sensor_id, params })
                .collect();
            output::render_list(
                &global.output,
                &entries,
                |e| CalibrationRow::from(e),
                |e| e.sensor_id.to_owned(),
            )?
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ConsoleConfig,
    args: CalibrationArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        CalibrationCommand::Show => {
            let calibration =
                Console::oneshot(config, |console| async move { console.calibration().await })
                    .await?;
            render(&calibration, global)
        }

        CalibrationCommand::Set { from_file } => {
            let calibration: Calibration = util::read_json_file(&from_file)?;
            let pb = util::spinner("Uploading calibration", global);
            let result = Console::oneshot(config, |console| async move {
                console.update_calibration(&calibration).await
            })
            .await;
            pb.finish_and_clear();
            render(&result?, global)
        }
    }
}
