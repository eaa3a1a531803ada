// ── Update coordinator ──
//
// Owns the poll filter and the latest measurements for one integration
// instance. The host drives it: `setup()` once, then `refresh()` on a
// schedule (or `spawn_polling`). Each successful tick publishes a fresh
// snapshot through a watch channel; failed ticks keep the last good data
// and mark it stale.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use meetnet_api::{AvailableData, Catalog, DataMap, MeetnetClient};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;

/// Poll interval used when none is configured.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Floor applied to the poll interval by [`spawn_polling`].
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(1);

// ── Configuration ────────────────────────────────────────────────

/// What to poll and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Selected location ids, e.g. `["NPT", "OST"]`.
    pub locations: Vec<String>,
    pub scan_interval: Duration,
}

impl CoordinatorConfig {
    pub fn new<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locations: locations.into_iter().map(Into::into).collect(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

// ── State ────────────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CoordinatorState {
    /// Constructed, `setup()` not yet run.
    Created,
    /// Setup failed with a recoverable error.
    NotReady,
    /// Set up; polling works.
    Ready,
    /// Credentials rejected. Ticks are refused until a new coordinator is built.
    AuthRequired,
}

/// Latest measurements as published to observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSnapshot {
    pub data: Arc<DataMap>,
    /// When the last tick finished, successful or not.
    pub last_update: Option<DateTime<Utc>>,
    /// Whether the last tick succeeded. `false` means `data` is stale.
    pub last_update_success: bool,
}

impl DataSnapshot {
    /// Whether non-empty data has been published. Readings kept after a
    /// failed tick still count; check `last_update_success` for freshness.
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// Schedules current-data fetches for the selected locations.
///
/// Ticks take `&mut self`, so two polls can never overlap.
pub struct Coordinator {
    client: Arc<MeetnetClient>,
    config: CoordinatorConfig,
    catalog: Option<Arc<Catalog>>,
    poll_ids: Option<Vec<String>>,
    snapshot: watch::Sender<DataSnapshot>,
    state: watch::Sender<CoordinatorState>,
    consecutive_failures: u32,
}

impl Coordinator {
    /// Create a coordinator. Does NOT fetch anything;
    /// call [`setup()`](Self::setup) first.
    pub fn new(client: Arc<MeetnetClient>, config: CoordinatorConfig) -> Self {
        let (snapshot, _) = watch::channel(DataSnapshot::default());
        let (state, _) = watch::channel(CoordinatorState::Created);
        Self {
            client,
            config,
            catalog: None,
            poll_ids: None,
            snapshot,
            state,
            consecutive_failures: 0,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Load the catalog and fix the poll filter for this session.
    pub async fn setup(&mut self) -> Result<(), CoreError> {
        let catalog = match self.client.get_catalog(false).await {
            Ok(catalog) => catalog,
            Err(e) => {
                let err = CoreError::from_setup(e);
                self.set_state(if err.is_auth_required() {
                    CoordinatorState::AuthRequired
                } else {
                    CoordinatorState::NotReady
                });
                return Err(err);
            }
        };

        let ids: Vec<String> = self
            .client
            .get_available_data_for_locations(self.config.locations.as_slice())
            .into_iter()
            .map(|ad| ad.id)
            .collect();

        debug!(
            data_points = ids.len(),
            locations = self.config.locations.len(),
            "coordinator setup complete"
        );

        self.catalog = Some(catalog);
        self.poll_ids = Some(ids);
        self.set_state(CoordinatorState::Ready);
        Ok(())
    }

    /// Run one poll tick.
    ///
    /// On success the snapshot is replaced wholesale. On failure the
    /// previous data stays published with `last_update_success = false`.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        match self.state() {
            CoordinatorState::AuthRequired => {
                return Err(CoreError::AuthenticationRequired {
                    message: "credentials were rejected; reconfigure before polling".into(),
                });
            }
            CoordinatorState::Created | CoordinatorState::NotReady => {
                return Err(CoreError::NotSetUp);
            }
            CoordinatorState::Ready => {}
        }
        let Some(ids) = self.poll_ids.as_deref() else {
            return Err(CoreError::NotSetUp);
        };

        // Nothing selected: publish an empty map instead of fetching everything.
        let result = if ids.is_empty() {
            Ok(DataMap::new())
        } else {
            self.client.get_current_data(ids).await
        };

        match result {
            Ok(data) => {
                debug!(values = data.len(), "fetched current data");
                self.consecutive_failures = 0;
                self.snapshot.send_replace(DataSnapshot {
                    data: Arc::new(data),
                    last_update: Some(Utc::now()),
                    last_update_success: true,
                });
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from_update(e);
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if err.is_auth_required() {
                    self.set_state(CoordinatorState::AuthRequired);
                }
                self.snapshot.send_modify(|snap| {
                    snap.last_update = Some(Utc::now());
                    snap.last_update_success = false;
                });
                Err(err)
            }
        }
    }

    fn set_state(&self, state: CoordinatorState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            info!(from = %current, to = %state, "coordinator state changed");
            *current = state;
            true
        });
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn client(&self) -> &Arc<MeetnetClient> {
        &self.client
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn state(&self) -> CoordinatorState {
        *self.state.borrow()
    }

    /// Receiver that sees every state transition.
    pub fn watch_state(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    /// Receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<DataSnapshot> {
        self.snapshot.subscribe()
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> DataSnapshot {
        self.snapshot.borrow().clone()
    }

    /// The currently published measurements.
    pub fn data(&self) -> Arc<DataMap> {
        Arc::clone(&self.snapshot.borrow().data)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn catalog(&self) -> Option<&Arc<Catalog>> {
        self.catalog.as_ref()
    }

    pub fn selected_locations(&self) -> &[String] {
        &self.config.locations
    }

    /// Data ids requested on each tick. Empty before setup.
    pub fn poll_ids(&self) -> &[String] {
        self.poll_ids.as_deref().unwrap_or_default()
    }

    pub fn available_data_for_location(&self, location_id: &str) -> Vec<AvailableData> {
        self.catalog
            .as_ref()
            .map(|c| c.available_for_location(location_id))
            .unwrap_or_default()
    }

    pub fn location_name(&self, location_id: &str) -> String {
        self.catalog
            .as_ref()
            .map_or_else(|| location_id.to_owned(), |c| c.location_name(location_id))
    }

    pub fn parameter_name(&self, parameter_id: &str) -> String {
        self.catalog
            .as_ref()
            .map_or_else(|| parameter_id.to_owned(), |c| c.parameter_name(parameter_id))
    }

    pub fn parameter_unit(&self, parameter_id: &str) -> Option<String> {
        self.catalog
            .as_ref()
            .and_then(|c| c.parameter_unit(parameter_id))
    }
}

// ── Background polling ───────────────────────────────────────────

/// Poll on `scan_interval` until `cancel` fires or credentials are rejected.
///
/// The first tick is deferred by one interval; callers run the initial
/// `refresh()` themselves. Transient failures are logged and polling
/// continues. Cancellation drops an in-flight request. The coordinator
/// is handed back when the task ends.
pub fn spawn_polling(
    mut coordinator: Coordinator,
    cancel: CancellationToken,
) -> JoinHandle<Coordinator> {
    tokio::spawn(async move {
        let period = coordinator.config.scan_interval.max(MIN_SCAN_INTERVAL);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = coordinator.refresh() => result,
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is_auth_required() => {
                    warn!(error = %e, "stopping polling until credentials are fixed");
                    break;
                }
                Err(e) => warn!(
                    error = %e,
                    failures = coordinator.consecutive_failures(),
                    "periodic refresh failed"
                ),
            }
        }

        debug!("polling stopped");
        coordinator
    })
}
