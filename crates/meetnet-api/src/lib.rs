// meetnet-api: Async Rust client for the Meetnet Vlaamse Banken monitoring API

pub mod auth;
pub mod catalog;
pub mod client;
pub mod current;
pub mod error;
pub mod message;
pub mod models;
pub mod schema;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use auth::{Clock, Credentials, SystemClock};
pub use client::{DEFAULT_BASE_URL, Endpoints, MeetnetClient};
pub use current::parse_timestamp;
pub use error::Error;
pub use message::resolve_message;
pub use models::{AvailableData, Catalog, DataMap, DataValue, Location, Parameter, Position};
pub use schema::{CatalogSchema, SchemaVariant};
pub use transport::{TlsMode, TransportConfig};
