// Domain types for the catalog and current-data feeds.
//
// Catalog types are immutable once parsed and shared behind an `Arc`.
// `DataValue` is transient: a fresh map is produced on every poll.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic position of a location, in whichever shape the API sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Position {
    /// Well-known-text, e.g. `POINT(2.7283 51.1496)`.
    Wkt(String),
    /// Explicit latitude / longitude pair.
    LatLon { lat: f64, lon: f64 },
}

impl Position {
    /// Latitude and longitude, if they can be determined.
    ///
    /// WKT `POINT(x y)` is read as `x = lon`, `y = lat`. Other WKT
    /// geometries return `None`.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match self {
            Self::LatLon { lat, lon } => Some((*lat, *lon)),
            Self::Wkt(wkt) => {
                let body = wkt.trim();
                let inner = body
                    .get(..5)
                    .filter(|prefix| prefix.eq_ignore_ascii_case("POINT"))
                    .and_then(|_| body.get(5..))?
                    .trim()
                    .strip_prefix('(')?
                    .strip_suffix(')')?;
                let mut parts = inner.split_whitespace();
                let lon = parts.next()?.parse().ok()?;
                let lat = parts.next()?.parse().ok()?;
                Some((lat, lon))
            }
        }
    }
}

/// A monitoring location (buoy, pier, measuring pole).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Short location key, e.g. `"NPT"`.
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub position: Option<Position>,
}

/// A measurable quantity (wind speed, water temperature, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Short parameter key, e.g. `"WVC"`.
    pub id: String,
    pub name: String,
    pub unit: Option<String>,
    pub parameter_type_id: Option<i64>,
}

/// A (location, parameter) combination for which measurements exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailableData {
    /// Location+parameter key, e.g. `"NPTWVC"`.
    pub id: String,
    pub location_id: String,
    pub parameter_id: String,
    /// Measurement interval hint in minutes.
    pub current_interval: Option<u32>,
}

/// Locations, parameters, and the combinations between them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub locations: HashMap<String, Location>,
    pub parameters: HashMap<String, Parameter>,
    pub available_data: Vec<AvailableData>,
}

impl Catalog {
    /// Available data whose location is in `location_ids`, in catalog order.
    pub fn available_for_locations<S: AsRef<str>>(&self, location_ids: &[S]) -> Vec<AvailableData> {
        let wanted: HashSet<&str> = location_ids.iter().map(AsRef::as_ref).collect();
        self.available_data
            .iter()
            .filter(|ad| wanted.contains(ad.location_id.as_str()))
            .cloned()
            .collect()
    }

    /// Available data for a single location, in catalog order.
    pub fn available_for_location(&self, location_id: &str) -> Vec<AvailableData> {
        self.available_for_locations(&[location_id])
    }

    /// Display name for a location, or the raw id when unknown.
    pub fn location_name(&self, location_id: &str) -> String {
        self.locations
            .get(location_id)
            .map_or_else(|| location_id.to_owned(), |loc| loc.name.clone())
    }

    /// Display name for a parameter, or the raw id when unknown.
    pub fn parameter_name(&self, parameter_id: &str) -> String {
        self.parameters
            .get(parameter_id)
            .map_or_else(|| parameter_id.to_owned(), |p| p.name.clone())
    }

    /// Unit for a parameter, if the catalog knows one.
    pub fn parameter_unit(&self, parameter_id: &str) -> Option<String> {
        self.parameters
            .get(parameter_id)
            .and_then(|p| p.unit.clone())
    }

    /// Locations ordered by display name, then id.
    pub fn sorted_locations(&self) -> Vec<&Location> {
        let mut locations: Vec<&Location> = self.locations.values().collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        locations
    }
}

/// One current measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    /// Matches an [`AvailableData::id`].
    pub id: String,
    pub value: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Denormalized location key (sent by some API variants only).
    pub location_id: Option<String>,
    /// Denormalized parameter key (sent by some API variants only).
    pub parameter_id: Option<String>,
    /// Denormalized unit (sent by some API variants only).
    pub unit: Option<String>,
}

/// Current values keyed by data id.
pub type DataMap = HashMap<String, DataValue>;

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let mut cat = Catalog::default();
        for (id, name) in [("NPT", "Nieuwpoort"), ("OST", "Oostende"), ("ZBR", "Zeebrugge")] {
            cat.locations.insert(
                id.into(),
                Location {
                    id: id.into(),
                    name: name.into(),
                    description: None,
                    position: None,
                },
            );
        }
        cat.parameters.insert(
            "WVC".into(),
            Parameter {
                id: "WVC".into(),
                name: "Wind Speed".into(),
                unit: Some("m/s".into()),
                parameter_type_id: None,
            },
        );
        for (loc, param) in [("NPT", "WVC"), ("OST", "WVC"), ("NPT", "WT"), ("ZBR", "GH")] {
            cat.available_data.push(AvailableData {
                id: format!("{loc}{param}"),
                location_id: loc.into(),
                parameter_id: param.into(),
                current_interval: None,
            });
        }
        cat
    }

    #[test]
    fn filters_by_location_set_in_catalog_order() {
        let ids: Vec<String> = catalog()
            .available_for_locations(&["NPT", "ZBR"])
            .into_iter()
            .map(|ad| ad.id)
            .collect();
        assert_eq!(ids, ["NPTWVC", "NPTWT", "ZBRGH"]);
    }

    #[test]
    fn lookups_degrade_to_raw_id() {
        let cat = catalog();
        assert_eq!(cat.location_name("NPT"), "Nieuwpoort");
        assert_eq!(cat.location_name("XXX"), "XXX");
        assert_eq!(cat.parameter_name("WT"), "WT");
        assert_eq!(cat.parameter_unit("WVC").as_deref(), Some("m/s"));
        assert_eq!(cat.parameter_unit("WT"), None);
    }

    #[test]
    fn sorted_by_display_name() {
        let cat = catalog();
        let names: Vec<&str> = cat.sorted_locations().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Nieuwpoort", "Oostende", "Zeebrugge"]);
    }

    #[test]
    fn wkt_point_is_lon_lat() {
        let pos = Position::Wkt("POINT (2.7283 51.1496)".into());
        assert_eq!(pos.coordinates(), Some((51.1496, 2.7283)));
        let pos = Position::Wkt("point(3.1 51.3)".into());
        assert_eq!(pos.coordinates(), Some((51.3, 3.1)));
    }

    #[test]
    fn non_point_wkt_has_no_coordinates() {
        assert_eq!(Position::Wkt("LINESTRING(0 0, 1 1)".into()).coordinates(), None);
        assert_eq!(Position::Wkt("POINT(abc)".into()).coordinates(), None);
        assert_eq!(Position::Wkt(String::new()).coordinates(), None);
    }

    #[test]
    fn lat_lon_passes_through() {
        let pos = Position::LatLon { lat: 51.2, lon: 2.9 };
        assert_eq!(pos.coordinates(), Some((51.2, 2.9)));
    }
}
