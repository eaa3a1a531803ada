// Catalog endpoint
//
// Fetches locations, parameters, and available-data combinations, and
// caches the parsed catalog for the life of the client. Records are read
// through a `CatalogSchema` so the same code handles every API variant.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::client::MeetnetClient;
use crate::error::Error;
use crate::message::resolve_message;
use crate::models::{AvailableData, Catalog, Location, Parameter, Position};
use crate::schema::{
    CatalogSchema, PositionFields, f64_field, i64_field, opt_str_field, records, str_field,
};

impl MeetnetClient {
    /// The catalog, fetched on first call and cached afterwards.
    ///
    /// `force_refresh` re-fetches and swaps the cache. Readers holding the
    /// previous `Arc` keep a consistent snapshot.
    pub async fn get_catalog(&self, force_refresh: bool) -> Result<Arc<Catalog>, Error> {
        if !force_refresh {
            if let Some(cached) = self.catalog.load_full() {
                return Ok(cached);
            }
        }

        let url = self.endpoints().catalog_url()?;
        let body = self.authenticated_request(Method::GET, url, &[]).await?;
        let schema = self.schema.for_catalog(&body);
        let catalog = Arc::new(parse_catalog(&body, schema));

        debug!(
            locations = catalog.locations.len(),
            parameters = catalog.parameters.len(),
            available_data = catalog.available_data.len(),
            "loaded catalog"
        );

        self.catalog.store(Some(Arc::clone(&catalog)));
        Ok(catalog)
    }

    /// The cached catalog, without fetching.
    pub fn catalog(&self) -> Option<Arc<Catalog>> {
        self.catalog.load_full()
    }

    /// Available data for the given locations from the cached catalog.
    ///
    /// Empty when nothing has been fetched yet; never hits the network.
    pub fn get_available_data_for_locations<S: AsRef<str>>(
        &self,
        location_ids: &[S],
    ) -> Vec<AvailableData> {
        self.catalog
            .load()
            .as_ref()
            .map(|catalog| catalog.available_for_locations(location_ids))
            .unwrap_or_default()
    }
}

// ── Parsing ──────────────────────────────────────────────────────────

pub(crate) fn parse_catalog(body: &Value, schema: &CatalogSchema) -> Catalog {
    let locations = records(body, schema.locations)
        .iter()
        .filter(|r| r.is_object())
        .map(|r| {
            let loc = parse_location(r, schema);
            (loc.id.clone(), loc)
        })
        .collect();

    let parameters = records(body, schema.parameters)
        .iter()
        .filter(|r| r.is_object())
        .map(|r| {
            let param = parse_parameter(r, schema);
            (param.id.clone(), param)
        })
        .collect();

    let available_data = records(body, schema.available_data)
        .iter()
        .filter(|r| r.is_object())
        .map(|r| AvailableData {
            id: str_field(r, schema.id),
            location_id: str_field(r, schema.data_location),
            parameter_id: str_field(r, schema.data_parameter),
            current_interval: i64_field(r, schema.current_interval)
                .and_then(|m| u32::try_from(m).ok()),
        })
        .collect();

    Catalog {
        locations,
        parameters,
        available_data,
    }
}

fn parse_location(record: &Value, schema: &CatalogSchema) -> Location {
    let id = str_field(record, schema.id);
    let name = resolve_message(record.get(schema.name), &id);
    let description = Some(resolve_message(record.get(schema.description), ""))
        .filter(|d| !d.is_empty());

    let position = match schema.position {
        PositionFields::Wkt(key) => opt_str_field(record, key).map(Position::Wkt),
        PositionFields::LatLon { lat, lon } => f64_field(record, lat)
            .zip(f64_field(record, lon))
            .map(|(lat, lon)| Position::LatLon { lat, lon }),
    };

    Location {
        id,
        name,
        description,
        position,
    }
}

fn parse_parameter(record: &Value, schema: &CatalogSchema) -> Parameter {
    let id = str_field(record, schema.id);
    Parameter {
        name: resolve_message(record.get(schema.name), &id),
        unit: opt_str_field(record, schema.unit),
        parameter_type_id: i64_field(record, schema.parameter_type),
        id,
    }
}
