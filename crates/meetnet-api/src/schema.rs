// Field-name mapping between API response variants.
//
// Two response shapes exist in the wild. They agree on the top-level
// arrays but name the join and position fields differently:
//
//   field                      V2              Legacy
//   AvailableData → location   "Location"      "LocationID"
//   AvailableData → parameter  "Parameter"     "ParameterID"
//   Location position          "PositionWKT"   "Latitude" + "Longitude"
//
// A `CatalogSchema` is picked once per response and every record is read
// through it. Parsing code never branches on the variant itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a location's position is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionFields {
    Wkt(&'static str),
    LatLon {
        lat: &'static str,
        lon: &'static str,
    },
}

/// Field names for one API response variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSchema {
    // Top-level arrays
    pub locations: &'static str,
    pub parameters: &'static str,
    pub available_data: &'static str,
    pub values: &'static str,

    // Shared record fields
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    pub parameter_type: &'static str,
    pub current_interval: &'static str,

    pub position: PositionFields,

    // AvailableData references
    pub data_location: &'static str,
    pub data_parameter: &'static str,

    // Current value records
    pub value: &'static str,
    pub timestamp: &'static str,
    pub value_location: Option<&'static str>,
    pub value_parameter: Option<&'static str>,
    pub value_unit: Option<&'static str>,
}

impl CatalogSchema {
    pub const V2: Self = Self {
        locations: "Locations",
        parameters: "Parameters",
        available_data: "AvailableData",
        values: "Values",
        id: "ID",
        name: "Name",
        description: "Description",
        unit: "Unit",
        parameter_type: "ParameterTypeID",
        current_interval: "CurrentInterval",
        position: PositionFields::Wkt("PositionWKT"),
        data_location: "Location",
        data_parameter: "Parameter",
        value: "Value",
        timestamp: "Timestamp",
        value_location: None,
        value_parameter: None,
        value_unit: None,
    };

    pub const LEGACY: Self = Self {
        position: PositionFields::LatLon {
            lat: "Latitude",
            lon: "Longitude",
        },
        data_location: "LocationID",
        data_parameter: "ParameterID",
        value_location: Some("LocationID"),
        value_parameter: Some("ParameterID"),
        value_unit: Some("Unit"),
        ..Self::V2
    };
}

/// Which response variant to parse against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Inspect each response and pick the matching schema.
    Auto,
    /// `Location` / `Parameter` references, WKT positions.
    #[default]
    V2,
    /// `LocationID` / `ParameterID` references, lat/lon positions.
    Legacy,
}

impl SchemaVariant {
    /// Resolve to a concrete schema for a catalog response.
    ///
    /// `Auto` looks at the first `AvailableData` record: a `LocationID`
    /// key without a `Location` key selects the legacy table.
    pub fn for_catalog(self, body: &Value) -> &'static CatalogSchema {
        match self {
            Self::V2 => &CatalogSchema::V2,
            Self::Legacy => &CatalogSchema::LEGACY,
            Self::Auto => {
                let first = body
                    .get(CatalogSchema::V2.available_data)
                    .and_then(Value::as_array)
                    .and_then(|records| records.iter().find(|r| r.is_object()));
                match first {
                    Some(record)
                        if record.get(CatalogSchema::V2.data_location).is_none()
                            && record.get(CatalogSchema::LEGACY.data_location).is_some() =>
                    {
                        &CatalogSchema::LEGACY
                    }
                    _ => &CatalogSchema::V2,
                }
            }
        }
    }

    /// Resolve to a concrete schema for a current-data response.
    ///
    /// `Auto` reads the denormalized fields whenever they are present,
    /// so it uses the legacy table; V2 payloads simply lack those keys.
    pub fn for_values(self) -> &'static CatalogSchema {
        match self {
            Self::V2 => &CatalogSchema::V2,
            Self::Auto | Self::Legacy => &CatalogSchema::LEGACY,
        }
    }
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::V2 => "v2",
            Self::Legacy => "legacy",
        })
    }
}

impl std::str::FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "v2" => Ok(Self::V2),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("expected 'auto', 'v2', or 'legacy', got '{other}'")),
        }
    }
}

// ── Tolerant field readers ───────────────────────────────────────────

/// String field, or `""` when missing or not a string.
pub(crate) fn str_field(record: &Value, key: &str) -> String {
    opt_str_field(record, key).unwrap_or_default()
}

/// String field, `None` when missing, null, or not a string.
pub(crate) fn opt_str_field(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Numeric field accepted as a JSON number or numeric string.
pub(crate) fn f64_field(record: &Value, key: &str) -> Option<f64> {
    match record.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn i64_field(record: &Value, key: &str) -> Option<i64> {
    match record.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Array field as a slice of records; missing or mistyped yields empty.
pub(crate) fn records<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    body.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
