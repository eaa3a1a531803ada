// meetnet-core: Polling coordinator and sensor projection between meetnet-api and hosts (CLI).

pub mod coordinator;
pub mod error;
pub mod sensor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorState, DEFAULT_SCAN_INTERVAL, DataSnapshot,
    spawn_polling,
};
pub use error::CoreError;
pub use sensor::{DeviceClass, DeviceInfo, SensorEntity, StateClass, build_sensors};
