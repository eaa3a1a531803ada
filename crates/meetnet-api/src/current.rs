// Current-data endpoint
//
// Latest measurement per available-data id. Anomalies in individual
// records (non-numeric values, unparseable timestamps) are logged and
// degraded to `None`; they never fail the whole request.

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::MeetnetClient;
use crate::error::Error;
use crate::models::{DataMap, DataValue};
use crate::schema::{CatalogSchema, f64_field, opt_str_field, records, str_field};

/// Naive layouts accepted when the timestamp carries no offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

impl MeetnetClient {
    /// Current values for `ids`, or for everything when `ids` is empty.
    ///
    /// Returns a fresh map on every call.
    pub async fn get_current_data<S: AsRef<str>>(&self, ids: &[S]) -> Result<DataMap, Error> {
        let url = self.endpoints().current_data_url()?;
        let query: Vec<(&str, String)> = if ids.is_empty() {
            Vec::new()
        } else {
            let joined = ids.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
            vec![("ids", joined)]
        };

        let body = self.authenticated_request(Method::GET, url, &query).await?;
        let data = parse_values(&body, self.schema.for_values());
        debug!(count = data.len(), "fetched current data");
        Ok(data)
    }
}

pub(crate) fn parse_values(body: &Value, schema: &CatalogSchema) -> DataMap {
    records(body, schema.values)
        .iter()
        .filter(|r| r.is_object())
        .map(|record| {
            let value = parse_value(record, schema);
            (value.id.clone(), value)
        })
        .collect()
}

fn parse_value(record: &Value, schema: &CatalogSchema) -> DataValue {
    let id = str_field(record, schema.id);

    let value = match record.get(schema.value) {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let parsed = f64_field(record, schema.value);
            if parsed.is_none() {
                warn!(data_id = %id, value = %raw, "non-numeric measurement value");
            }
            parsed
        }
    };

    let timestamp = match record.get(schema.timestamp) {
        Some(Value::String(raw)) if !raw.is_empty() => {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                warn!(data_id = %id, timestamp = %raw, "could not parse timestamp");
            }
            parsed
        }
        _ => None,
    };

    DataValue {
        value,
        timestamp,
        location_id: schema.value_location.and_then(|k| opt_str_field(record, k)),
        parameter_id: schema.value_parameter.and_then(|k| opt_str_field(record, k)),
        unit: schema.value_unit.and_then(|k| opt_str_field(record, k)),
        id,
    }
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// A trailing `Z` is accepted as `+00:00`. Timestamps without an offset
/// are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = raw.trim().replace('Z', "+00:00");
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn zulu_timestamp_is_utc_midnight() {
        assert_eq!(
            parse_timestamp("2024-01-01T00:00:00Z"),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn offset_timestamp_converts_to_utc() {
        assert_eq!(
            parse_timestamp("2024-06-01T12:00:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn naive_timestamp_is_taken_as_utc() {
        assert_eq!(
            parse_timestamp("2024-06-01T10:00:00"),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap())
        );
        assert!(parse_timestamp("2024-06-01T10:00:00.250").is_some());
    }

    #[test]
    fn garbage_timestamp_is_none() {
        assert_eq!(parse_timestamp("not-a-date"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn values_degrade_instead_of_failing() {
        let body = json!({"Values": [
            {"ID": "NPTWVC", "Value": "12.3", "Timestamp": "2024-06-01T10:00:00Z"},
            {"ID": "NPTWT", "Value": null},
            {"ID": "NPTGH", "Value": "n/a", "Timestamp": "not-a-date"},
            {"ID": "NPTLT", "Value": 17},
            42
        ]});

        let data = parse_values(&body, &CatalogSchema::V2);
        assert_eq!(data.len(), 4);
        assert_eq!(data["NPTWVC"].value, Some(12.3));
        assert_eq!(
            data["NPTWVC"].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(data["NPTWT"].value, None);
        assert_eq!(data["NPTGH"].value, None);
        assert_eq!(data["NPTGH"].timestamp, None);
        assert_eq!(data["NPTLT"].value, Some(17.0));
    }

    #[test]
    fn legacy_values_carry_denormalized_fields() {
        let body = json!({"Values": [
            {"ID": "OSTWT", "Value": 14.1, "LocationID": "OST", "ParameterID": "WT", "Unit": "°C"}
        ]});

        let legacy = parse_values(&body, &CatalogSchema::LEGACY);
        assert_eq!(legacy["OSTWT"].location_id.as_deref(), Some("OST"));
        assert_eq!(legacy["OSTWT"].unit.as_deref(), Some("°C"));

        let v2 = parse_values(&body, &CatalogSchema::V2);
        assert_eq!(v2["OSTWT"].location_id, None);
        assert_eq!(v2["OSTWT"].parameter_id, None);
    }
}
