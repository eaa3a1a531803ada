//! Catalog listing handlers: locations and parameters.

use serde::Serialize;
use tabled::Tabled;

use meetnet_api::{Catalog, Location, Parameter};

use crate::cli::{GlobalOpts, LocationsArgs};
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

// ── Reports ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct LocationReport {
    id: String,
    name: String,
    description: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    parameters: Vec<String>,
}

impl LocationReport {
    fn new(location: &Location, catalog: &Catalog) -> Self {
        let coords = location.position.as_ref().and_then(|p| p.coordinates());
        Self {
            id: location.id.clone(),
            name: location.name.clone(),
            description: location.description.clone(),
            latitude: coords.map(|(lat, _)| lat),
            longitude: coords.map(|(_, lon)| lon),
            parameters: catalog
                .available_for_location(&location.id)
                .into_iter()
                .map(|ad| ad.parameter_id)
                .collect(),
        }
    }
}

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Lat")]
    lat: String,
    #[tabled(rename = "Lon")]
    lon: String,
    #[tabled(rename = "Parameters")]
    parameters: String,
}

impl From<&LocationReport> for LocationRow {
    fn from(r: &LocationReport) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            lat: r.latitude.map(|v| format!("{v:.4}")).unwrap_or_default(),
            lon: r.longitude.map(|v| format!("{v:.4}")).unwrap_or_default(),
            parameters: r.parameters.join(", "),
        }
    }
}

#[derive(Debug, Serialize)]
struct ParameterReport<'a> {
    #[serde(flatten)]
    parameter: &'a Parameter,
    locations: usize,
}

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Locations")]
    locations: usize,
}

impl From<&ParameterReport<'_>> for ParameterRow {
    fn from(r: &ParameterReport<'_>) -> Self {
        Self {
            id: r.parameter.id.clone(),
            name: r.parameter.name.clone(),
            unit: r.parameter.unit.clone().unwrap_or_default(),
            locations: r.locations,
        }
    }
}

// ── Filtering ───────────────────────────────────────────────────────

fn matches_filter(location: &Location, filter: &str) -> bool {
    let needle = filter.to_lowercase();
    location.id.to_lowercase().contains(&needle) || location.name.to_lowercase().contains(&needle)
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_locations(
    profile: &ResolvedProfile,
    args: &LocationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = profile.client()?;
    let catalog = client.get_catalog(false).await?;
    client.close();

    let reports: Vec<LocationReport> = catalog
        .sorted_locations()
        .into_iter()
        .filter(|l| args.filter.as_deref().is_none_or(|f| matches_filter(l, f)))
        .map(|l| LocationReport::new(l, &catalog))
        .collect();

    let out = output::render_list(
        &global.output,
        &reports,
        |r| LocationRow::from(r),
        |r| r.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle_parameters(
    profile: &ResolvedProfile,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = profile.client()?;
    let catalog = client.get_catalog(false).await?;
    client.close();

    let mut parameters: Vec<&Parameter> = catalog.parameters.values().collect();
    parameters.sort_by(|a, b| a.id.cmp(&b.id));

    let reports: Vec<ParameterReport<'_>> = parameters
        .into_iter()
        .map(|parameter| ParameterReport {
            parameter,
            locations: catalog
                .available_data
                .iter()
                .filter(|ad| ad.parameter_id == parameter.id)
                .count(),
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &reports,
        |r| ParameterRow::from(r),
        |r| r.parameter.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use meetnet_api::Position;

    use super::*;

    fn location() -> Location {
        Location {
            id: "NPT".into(),
            name: "Nieuwpoort".into(),
            description: None,
            position: Some(Position::Wkt("POINT(2.7283 51.1496)".into())),
        }
    }

    #[test]
    fn filter_matches_id_or_name_case_insensitively() {
        assert!(matches_filter(&location(), "npt"));
        assert!(matches_filter(&location(), "POORT"));
        assert!(!matches_filter(&location(), "ost"));
    }

    #[test]
    fn report_reads_wkt_coordinates() {
        let report = LocationReport::new(&location(), &Catalog::default());
        assert_eq!(report.latitude, Some(51.1496));
        assert_eq!(report.longitude, Some(2.7283));
        assert!(report.parameters.is_empty());

        let row = LocationRow::from(&report);
        assert_eq!(row.lat, "51.1496");
    }
}
