//! Threshold command handlers.

use tabled::Tabled;

use boatmon_core::{Console, ConsoleConfig, ThresholdSet};

use crate::cli::{GlobalOpts, ThresholdsArgs, ThresholdsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct LimitRow {
    #[tabled(rename = "Limit")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn rows(t: &ThresholdSet) -> Vec<LimitRow> {
    [
        ("engine_rpm_max", t.engine_rpm_max, "rpm"),
        ("oil_pressure_min", t.oil_pressure_min, "psi"),
        ("oil_pressure_max", t.oil_pressure_max, "psi"),
        ("coolant_temp_max", t.coolant_temp_max, "°C"),
    ]
    .into_iter()
    .map(|(name, value, unit)| LimitRow {
        name,
        value: value.map_or_else(|| "not set".into(), |v| format!("{} {unit}", output::format_num(v))),
    })
    .collect()
}

fn detail(t: &ThresholdSet) -> String {
    tabled::Table::new(rows(t))
        .with(tabled::settings::Style::rounded())
        .to_string()
}

fn plain(t: &ThresholdSet) -> String {
    rows(t)
        .into_iter()
        .map(|r| format!("{}\t{}", r.name, r.value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Overlay the limits given on the command line onto `current`.
fn merge(
    current: ThresholdSet,
    rpm_max: Option<f64>,
    oil_min: Option<f64>,
    oil_max: Option<f64>,
    coolant_max: Option<f64>,
) -> ThresholdSet {
    ThresholdSet {
        engine_rpm_max: rpm_max.or(current.engine_rpm_max),
        oil_pressure_min: oil_min.or(current.oil_pressure_min),
        oil_pressure_max: oil_max.or(current.oil_pressure_max),
        coolant_temp_max: coolant_max.or(current.coolant_temp_max),
    }
}

fn print(t: &ThresholdSet, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, t, detail, plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ConsoleConfig,
    args: ThresholdsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ThresholdsCommand::Show => {
            let thresholds = Console::oneshot(config, |console| async move {
                match console.thresholds() {
                    Some(t) => Ok(t),
                    None => console.refresh_thresholds().await,
                }
            })
            .await?;
            print(&thresholds, global)
        }

        ThresholdsCommand::Set {
            rpm_max,
            oil_min,
            oil_max,
            coolant_max,
        } => {
            if rpm_max.is_none() && oil_min.is_none() && oil_max.is_none() && coolant_max.is_none()
            {
                return Err(CliError::Validation {
                    field: "thresholds".into(),
                    reason: "pass at least one of --rpm-max, --oil-min, --oil-max, --coolant-max"
                        .into(),
                });
            }

            let pb = util::spinner("Updating thresholds", global);
            let result = Console::oneshot(config, |console| async move {
                let current = match console.thresholds() {
                    Some(t) => t,
                    None => console.refresh_thresholds().await?,
                };
                let next = merge(current, rpm_max, oil_min, oil_max, coolant_max);
                console.update_thresholds(&next).await
            })
            .await;
            pb.finish_and_clear();
            print(&result?, global)
        }

        ThresholdsCommand::Reset => {
            if !util::confirm("Restore backend default thresholds?", global.yes)? {
                return Ok(());
            }
            let thresholds = Console::oneshot(config, |console| async move {
                console.reset_thresholds().await
            })
            .await?;
            print(&thresholds, global)
        }
    }
}
