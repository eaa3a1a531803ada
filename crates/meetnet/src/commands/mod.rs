//! Command handlers, one module per top-level subcommand.

pub mod check;
pub mod config_cmd;
pub mod locations;
pub mod poll;
pub mod sensors;

use std::sync::Arc;

use meetnet_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::config::ResolvedProfile;
use crate::error::CliError;

/// Route an API-backed command to its handler.
pub async fn dispatch(
    cmd: Command,
    profile: &ResolvedProfile,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let result = match cmd {
        Command::Check => check::handle(profile, global).await,
        Command::Locations(args) => locations::handle_locations(profile, &args, global).await,
        Command::Parameters => locations::handle_parameters(profile, global).await,
        Command::Sensors(args) => sensors::handle(profile, &args, global).await,
        Command::Poll(args) => poll::handle(profile, &args, global).await,
        Command::Config(_) | Command::Completions(_) => unreachable!("handled in main"),
    };
    result.map_err(|e| e.with_profile(&profile.name))
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Build a coordinator for the selected locations and run its setup.
///
/// Every selected location must exist in the catalog.
pub async fn ready_coordinator(
    profile: &ResolvedProfile,
    locations: &[String],
    interval_secs: Option<u64>,
) -> Result<Coordinator, CliError> {
    if interval_secs == Some(0) {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let config = profile.coordinator_config(locations, interval_secs);
    if config.locations.is_empty() {
        return Err(CliError::NoLocations);
    }

    let client = Arc::new(profile.client()?);
    let mut coordinator = Coordinator::new(client, config);
    coordinator.setup().await?;

    if let Some(catalog) = coordinator.catalog() {
        if let Some(unknown) = coordinator
            .selected_locations()
            .iter()
            .find(|id| !catalog.locations.contains_key(id.as_str()))
        {
            return Err(CliError::NotFound {
                resource_type: "location".into(),
                identifier: unknown.clone(),
                list_command: "locations".into(),
            });
        }
    }

    Ok(coordinator)
}
