// ── Sensor projection ──
//
// Turns the coordinator's catalog and snapshot into one sensor per
// (location, parameter) pair, grouped into a device per location.
// Known parameter codes get a curated name, unit, and icon; anything
// else falls back to what the catalog says.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::coordinator::{Coordinator, DataSnapshot};

/// Prefix for every sensor's unique id.
pub const UNIQUE_ID_PREFIX: &str = "meetnet_vlaamse_banken";
pub const MANUFACTURER: &str = "Meetnet Vlaamse Banken";
pub const MODEL: &str = "Monitoring Station";
pub const DEFAULT_ICON: &str = "mdi:chart-line";

// ── Classification ───────────────────────────────────────────────

/// Physical quantity a sensor measures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    WindSpeed,
    Temperature,
    Pressure,
}

/// How a sensor's values behave over time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StateClass {
    #[default]
    Measurement,
}

/// Curated presentation for a known parameter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescription {
    pub parameter_id: &'static str,
    pub name: &'static str,
    pub device_class: Option<DeviceClass>,
    pub state_class: StateClass,
    pub native_unit: &'static str,
    pub icon: &'static str,
}

const fn describe(
    parameter_id: &'static str,
    name: &'static str,
    device_class: Option<DeviceClass>,
    native_unit: &'static str,
    icon: &'static str,
) -> SensorDescription {
    SensorDescription {
        parameter_id,
        name,
        device_class,
        state_class: StateClass::Measurement,
        native_unit,
        icon,
    }
}

/// Known parameter codes.
pub const SENSOR_DESCRIPTIONS: &[SensorDescription] = &[
    // Wind
    describe("WVC", "Wind Speed", Some(DeviceClass::WindSpeed), "m/s", "mdi:weather-windy"),
    describe("WRS", "Wind Direction", None, "°", "mdi:compass"),
    describe("WC3", "Wind Gust", Some(DeviceClass::WindSpeed), "m/s", "mdi:weather-windy-variant"),
    describe("WC1", "Wind Speed (1 min avg)", Some(DeviceClass::WindSpeed), "m/s", "mdi:weather-windy"),
    // Temperature
    describe("WT", "Water Temperature", Some(DeviceClass::Temperature), "°C", "mdi:thermometer-water"),
    describe("LT", "Air Temperature", Some(DeviceClass::Temperature), "°C", "mdi:thermometer"),
    // Pressure
    describe("LP", "Air Pressure", Some(DeviceClass::Pressure), "hPa", "mdi:gauge"),
    // Water
    describe("WL", "Water Level", None, "m", "mdi:waves"),
    describe("GH", "Wave Height", None, "m", "mdi:wave"),
];

/// Curated description for `parameter_id`, if it is a known code.
pub fn description_for(parameter_id: &str) -> Option<&'static SensorDescription> {
    SENSOR_DESCRIPTIONS
        .iter()
        .find(|d| d.parameter_id == parameter_id)
}

// ── Entities ─────────────────────────────────────────────────────

/// Groups the sensors of one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// The location id.
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

/// One measurement stream exposed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorEntity {
    pub unique_id: String,
    pub data_id: String,
    pub location_id: String,
    pub parameter_id: String,
    pub name: String,
    pub device_class: Option<DeviceClass>,
    pub state_class: StateClass,
    pub native_unit: Option<String>,
    pub icon: String,
    pub device: DeviceInfo,
}

impl SensorEntity {
    /// Latest value, or `None` when the snapshot has nothing for this sensor.
    pub fn native_value(&self, snapshot: &DataSnapshot) -> Option<f64> {
        snapshot.data.get(&self.data_id).and_then(|v| v.value)
    }

    /// The last tick succeeded and it carried this sensor's id.
    pub fn available(&self, snapshot: &DataSnapshot) -> bool {
        snapshot.last_update_success && snapshot.data.contains_key(&self.data_id)
    }

    /// Extra attributes. `measurement_time` is RFC 3339 and only present
    /// when the value carries a timestamp.
    pub fn attributes(&self, snapshot: &DataSnapshot) -> BTreeMap<&'static str, String> {
        let mut attrs = BTreeMap::from([
            ("data_id", self.data_id.clone()),
            ("location_id", self.location_id.clone()),
            ("parameter_id", self.parameter_id.clone()),
        ]);
        if let Some(ts) = snapshot
            .data
            .get(&self.data_id)
            .and_then(|v| v.timestamp)
        {
            attrs.insert("measurement_time", ts.to_rfc3339());
        }
        attrs
    }
}

/// One sensor per available-data entry of each selected location.
///
/// Sensors come out grouped by location in selection order, then in
/// catalog order within a location.
pub fn build_sensors(coordinator: &Coordinator) -> Vec<SensorEntity> {
    coordinator
        .selected_locations()
        .iter()
        .flat_map(|location_id| {
            let device = DeviceInfo {
                identifier: location_id.clone(),
                name: coordinator.location_name(location_id),
                manufacturer: MANUFACTURER,
                model: MODEL,
            };
            coordinator
                .available_data_for_location(location_id)
                .into_iter()
                .map(move |ad| {
                    let description = description_for(&ad.parameter_id);
                    SensorEntity {
                        unique_id: format!("{UNIQUE_ID_PREFIX}_{}", ad.id),
                        name: description.map_or_else(
                            || coordinator.parameter_name(&ad.parameter_id),
                            |d| d.name.to_owned(),
                        ),
                        device_class: description.and_then(|d| d.device_class),
                        state_class: description.map(|d| d.state_class).unwrap_or_default(),
                        native_unit: description.map_or_else(
                            || coordinator.parameter_unit(&ad.parameter_id),
                            |d| Some(d.native_unit.to_owned()),
                        ),
                        icon: description.map_or(DEFAULT_ICON, |d| d.icon).to_owned(),
                        device: device.clone(),
                        data_id: ad.id,
                        location_id: ad.location_id,
                        parameter_id: ad.parameter_id,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use meetnet_api::{DataMap, DataValue};

    use super::*;

    fn entity(data_id: &str) -> SensorEntity {
        SensorEntity {
            unique_id: format!("{UNIQUE_ID_PREFIX}_{data_id}"),
            data_id: data_id.into(),
            location_id: "NPT".into(),
            parameter_id: "WVC".into(),
            name: "Wind Speed".into(),
            device_class: Some(DeviceClass::WindSpeed),
            state_class: StateClass::Measurement,
            native_unit: Some("m/s".into()),
            icon: "mdi:weather-windy".into(),
            device: DeviceInfo {
                identifier: "NPT".into(),
                name: "Nieuwpoort".into(),
                manufacturer: MANUFACTURER,
                model: MODEL,
            },
        }
    }

    fn snapshot(success: bool) -> DataSnapshot {
        let mut data = DataMap::new();
        data.insert(
            "NPTWVC".into(),
            DataValue {
                id: "NPTWVC".into(),
                value: Some(7.5),
                timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).single(),
                location_id: None,
                parameter_id: None,
                unit: None,
            },
        );
        data.insert(
            "NPTWT".into(),
            DataValue {
                id: "NPTWT".into(),
                value: None,
                timestamp: None,
                location_id: None,
                parameter_id: None,
                unit: None,
            },
        );
        DataSnapshot {
            data: Arc::new(data),
            last_update: Some(Utc::now()),
            last_update_success: success,
        }
    }

    #[test]
    fn table_covers_known_codes() {
        for code in ["WVC", "WRS", "WC3", "WC1", "WT", "LT", "LP", "WL", "GH"] {
            assert!(description_for(code).is_some(), "missing {code}");
        }
        assert!(description_for("XYZ").is_none());
        assert_eq!(description_for("LP").map(|d| d.native_unit), Some("hPa"));
    }

    #[test]
    fn value_and_availability_follow_snapshot() {
        let snap = snapshot(true);
        let wvc = entity("NPTWVC");
        assert_eq!(wvc.native_value(&snap), Some(7.5));
        assert!(wvc.available(&snap));

        let wt = entity("NPTWT");
        assert_eq!(wt.native_value(&snap), None);
        assert!(wt.available(&snap));

        let missing = entity("NPTGH");
        assert!(!missing.available(&snap));
        assert!(!wvc.available(&snapshot(false)));
    }

    #[test]
    fn attributes_include_measurement_time_when_known() {
        let snap = snapshot(true);
        let attrs = entity("NPTWVC").attributes(&snap);
        assert_eq!(attrs["data_id"], "NPTWVC");
        assert_eq!(attrs["measurement_time"], "2024-06-01T10:00:00+00:00");

        let attrs = entity("NPTWT").attributes(&snap);
        assert!(!attrs.contains_key("measurement_time"));
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn device_class_parses_from_snake_case() {
        assert_eq!("wind_speed".parse::<DeviceClass>(), Ok(DeviceClass::WindSpeed));
        assert_eq!(DeviceClass::Pressure.to_string(), "pressure");
    }
}
