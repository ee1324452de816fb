use std::sync::Arc;

use kanda_core::analytics::AnalyticsStore;
use kanda_core::config::Config;
use kanda_duckdb::DuckDbBackend;
use kanda_metadata::MetadataStore;

use crate::geo::{locator_from_config, GeoLocator, NullLocator};

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// Handlers see the store only through its two traits. The concrete backend
/// is kept for the health check.
pub struct AppState {
    pub db: Arc<DuckDbBackend>,

    /// Sessions, events and the reporting bundle.
    pub analytics: Arc<dyn AnalyticsStore>,

    /// Leads, admin accounts and settings.
    pub metadata: Arc<dyn MetadataStore>,

    pub geo: Arc<dyn GeoLocator>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,
}

impl AppState {
    /// Wrap `db` and pick a geo locator from `config`.
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        let geo: Arc<dyn GeoLocator> = Arc::from(locator_from_config(&config));
        Self::with_geo(db, config, geo)
    }

    /// Like [`AppState::new`] with an explicit locator. Tests pass
    /// [`NullLocator`] or a fixed stub.
    pub fn with_geo(db: DuckDbBackend, config: Config, geo: Arc<dyn GeoLocator>) -> Self {
        let db = Arc::new(db);
        Self {
            analytics: db.clone(),
            metadata: db.clone(),
            db,
            geo,
            config: Arc::new(config),
        }
    }

    /// State with geolocation disabled.
    pub fn without_geo(db: DuckDbBackend, config: Config) -> Self {
        Self::with_geo(db, config, Arc::new(NullLocator))
    }
}
