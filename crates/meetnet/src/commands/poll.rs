//! Current-data polling handler.
//!
//! One-shot mode runs a single coordinator tick and prints the readings.
//! `--watch` hands the coordinator to the background poller and prints
//! every published snapshot until Ctrl-C or an authentication failure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use meetnet_core::{Coordinator, CoordinatorState, DataSnapshot, spawn_polling};

use crate::cli::{GlobalOpts, PollArgs};
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::ready_coordinator;
use super::sensors::format_value;

// ── Layout ──────────────────────────────────────────────────────────

/// Catalog metadata for one polled data id, fixed at setup.
#[derive(Debug, Clone)]
struct ReadingSlot {
    id: String,
    location_id: String,
    location_name: String,
    parameter_id: String,
    parameter_name: String,
    unit: Option<String>,
}

fn reading_slots(coordinator: &Coordinator) -> Vec<ReadingSlot> {
    coordinator
        .selected_locations()
        .iter()
        .flat_map(|location_id| coordinator.available_data_for_location(location_id))
        .map(|ad| ReadingSlot {
            location_name: coordinator.location_name(&ad.location_id),
            parameter_name: coordinator.parameter_name(&ad.parameter_id),
            unit: coordinator.parameter_unit(&ad.parameter_id),
            id: ad.id,
            location_id: ad.location_id,
            parameter_id: ad.parameter_id,
        })
        .collect()
}

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Reading {
    id: String,
    location_id: String,
    location_name: String,
    parameter_id: String,
    parameter_name: String,
    value: Option<f64>,
    unit: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    fresh: bool,
}

/// Join the slots with a snapshot. Slots the API did not return get no value.
fn readings(slots: &[ReadingSlot], snapshot: &DataSnapshot) -> Vec<Reading> {
    slots
        .iter()
        .map(|slot| {
            let value = snapshot.data.get(&slot.id);
            Reading {
                id: slot.id.clone(),
                location_id: slot.location_id.clone(),
                location_name: slot.location_name.clone(),
                parameter_id: slot.parameter_id.clone(),
                parameter_name: slot.parameter_name.clone(),
                value: value.and_then(|v| v.value),
                unit: value
                    .and_then(|v| v.unit.clone())
                    .or_else(|| slot.unit.clone()),
                timestamp: value.and_then(|v| v.timestamp),
                fresh: snapshot.last_update_success && value.is_some(),
            }
        })
        .collect()
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Parameter")]
    parameter: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Measured")]
    measured: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl ReadingRow {
    fn new(r: &Reading, color: bool) -> Self {
        Self {
            id: r.id.clone(),
            location: r.location_name.clone(),
            parameter: r.parameter_name.clone(),
            value: format_value(r.value, r.unit.as_deref()),
            measured: r
                .timestamp
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_default(),
            status: output::status_cell(r.fresh, color),
        }
    }
}

fn print_snapshot(
    slots: &[ReadingSlot],
    snapshot: &DataSnapshot,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let rows = readings(slots, snapshot);
    let out = output::render_list(
        &global.output,
        &rows,
        |r| ReadingRow::new(r, color),
        |r| format!("{}\t{}", r.id, r.value.map(|v| v.to_string()).unwrap_or_default()),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    profile: &ResolvedProfile,
    args: &PollArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut coordinator =
        ready_coordinator(profile, &args.selection.locations, args.interval).await?;
    let slots = reading_slots(&coordinator);

    coordinator.refresh().await?;
    print_snapshot(&slots, &coordinator.snapshot(), global)?;

    if !args.watch {
        coordinator.client().close();
        return Ok(());
    }

    watch(coordinator, &slots, global).await
}

async fn watch(
    coordinator: Coordinator,
    slots: &[ReadingSlot],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !global.quiet {
        eprintln!(
            "Polling every {}s, press Ctrl-C to stop",
            coordinator.config().scan_interval.as_secs().max(1)
        );
    }

    let mut updates = coordinator.subscribe();
    updates.mark_unchanged();
    let cancel = CancellationToken::new();
    let mut handle = spawn_polling(coordinator, cancel.clone());

    let finished = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break None;
            }
            joined = &mut handle => break Some(joined),
            changed = updates.changed() => {
                if changed.is_err() {
                    break None;
                }
                let snapshot = updates.borrow_and_update().clone();
                if !snapshot.last_update_success {
                    tracing::warn!("poll failed, showing last known values");
                }
                print_snapshot(slots, &snapshot, global)?;
            }
        }
    };

    let joined = match finished {
        Some(joined) => joined,
        None => {
            cancel.cancel();
            handle.await
        }
    };
    let coordinator = joined.map_err(|e| CliError::Internal(format!("poller crashed: {e}")))?;
    coordinator.client().close();

    if coordinator.state() == CoordinatorState::AuthRequired {
        return Err(CliError::AuthFailed {
            profile: "default".into(),
            message: "credentials were rejected while polling".into(),
        });
    }
    Ok(())
}
