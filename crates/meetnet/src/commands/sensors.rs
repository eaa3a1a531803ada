//! Sensor listing handler.

use std::collections::BTreeMap;

use serde::Serialize;
use tabled::Tabled;

use meetnet_core::{DataSnapshot, SensorEntity, build_sensors};

use crate::cli::{GlobalOpts, SelectionArgs};
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::ready_coordinator;

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SensorReport {
    #[serde(flatten)]
    entity: SensorEntity,
    native_value: Option<f64>,
    available: bool,
    attributes: BTreeMap<&'static str, String>,
}

impl SensorReport {
    fn new(entity: SensorEntity, snapshot: &DataSnapshot) -> Self {
        Self {
            native_value: entity.native_value(snapshot),
            available: entity.available(snapshot),
            attributes: entity.attributes(snapshot),
            entity,
        }
    }
}

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "Unique ID")]
    unique_id: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Sensor")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Measured")]
    measured: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl SensorRow {
    fn new(report: &SensorReport, color: bool) -> Self {
        let entity = &report.entity;
        Self {
            unique_id: entity.unique_id.clone(),
            location: entity.device.name.clone(),
            name: entity.name.clone(),
            value: format_value(report.native_value, entity.native_unit.as_deref()),
            measured: report
                .attributes
                .get("measurement_time")
                .cloned()
                .unwrap_or_default(),
            status: output::status_cell(report.available, color),
        }
    }
}

/// `12.3 m/s`, or `-` when there is no value.
pub(crate) fn format_value(value: Option<f64>, unit: Option<&str>) -> String {
    match (value, unit) {
        (Some(v), Some(u)) if !u.is_empty() => format!("{v} {u}"),
        (Some(v), _) => v.to_string(),
        (None, _) => "-".into(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    profile: &ResolvedProfile,
    args: &SelectionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut coordinator = ready_coordinator(profile, &args.locations, None).await?;
    coordinator.refresh().await?;
    coordinator.client().close();

    let snapshot = coordinator.snapshot();
    let reports: Vec<SensorReport> = build_sensors(&coordinator)
        .into_iter()
        .map(|entity| SensorReport::new(entity, &snapshot))
        .collect();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &reports,
        |r| SensorRow::new(r, color),
        |r| r.entity.unique_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
