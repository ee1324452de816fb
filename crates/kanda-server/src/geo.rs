//! IP geolocation.
//!
//! A [`GeoLocator`] answers `Ok(None)` when it has nothing to say about an
//! address (private ranges, provider "fail" status, unknown IPs) and `Err`
//! when the lookup itself broke. Callers on the ingestion path treat both the
//! same way via [`locate_or_empty`]: the pageview is stored without geo data.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use kanda_core::config::Config;
use kanda_core::geo::GeoLocation;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("geo lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geo database error: {0}")]
    Database(#[from] maxminddb::MaxMindDBError),
}

#[async_trait]
pub trait GeoLocator: Send + Sync + 'static {
    async fn locate(&self, ip: IpAddr) -> Result<Option<GeoLocation>, GeoError>;
}

/// Addresses no provider can place: loopback, private, link-local,
/// unspecified and the like.
pub fn is_routable(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation())
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}

/// Resolve `ip` to a location, degrading every failure to an empty
/// [`GeoLocation`].
pub async fn locate_or_empty(locator: &dyn GeoLocator, ip: Option<&str>) -> GeoLocation {
    let Some(raw) = ip else {
        return GeoLocation::default();
    };
    let Ok(addr) = raw.trim().parse::<IpAddr>() else {
        tracing::warn!(ip = %raw, "Unparseable client IP, skipping geolocation");
        return GeoLocation::default();
    };
    if !is_routable(addr) {
        tracing::debug!(ip = %addr, "Private or local IP, skipping geolocation");
        return GeoLocation::default();
    }

    match locator.locate(addr).await {
        Ok(Some(geo)) => geo,
        Ok(None) => GeoLocation::default(),
        Err(e) => {
            tracing::warn!(ip = %addr, error = %e, "Geolocation failed");
            GeoLocation::default()
        }
    }
}

/// Pick a locator from configuration: a local database when the file exists,
/// otherwise the HTTP API when a URL is configured, otherwise nothing.
pub fn locator_from_config(config: &Config) -> Box<dyn GeoLocator> {
    if Path::new(&config.geoip_path).exists() {
        match MaxMindLocator::open(&config.geoip_path) {
            Ok(locator) => {
                tracing::info!(path = %config.geoip_path, "Using local GeoIP database");
                return Box::new(locator);
            }
            Err(e) => {
                tracing::warn!(path = %config.geoip_path, error = %e, "Failed to open GeoIP database");
            }
        }
    }

    if !config.geo_api_url.trim().is_empty() {
        match IpApiLocator::new(&config.geo_api_url) {
            Ok(locator) => {
                tracing::info!(url = %config.geo_api_url, "Using HTTP geolocation API");
                return Box::new(locator);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build geolocation HTTP client");
            }
        }
    }

    tracing::warn!("No geolocation source configured. Pageviews are stored without geo fields.");
    Box::new(NullLocator)
}

/// Never knows anything. Used when no geo source is configured, and in tests.
pub struct NullLocator;

#[async_trait]
impl GeoLocator for NullLocator {
    async fn locate(&self, _ip: IpAddr) -> Result<Option<GeoLocation>, GeoError> {
        Ok(None)
    }
}

/// ip-api.com style JSON lookup: `GET {base_url}/{ip}`.
pub struct IpApiLocator {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region_name: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    query: Option<String>,
}

impl IpApiLocator {
    pub fn new(base_url: &str) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .user_agent(concat!("kanda/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeoLocator for IpApiLocator {
    async fn locate(&self, ip: IpAddr) -> Result<Option<GeoLocation>, GeoError> {
        let url = format!("{}/{}", self.base_url, ip);
        let body: IpApiResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.into_location())
    }
}

impl IpApiResponse {
    fn into_location(self) -> Option<GeoLocation> {
        if self.status != "success" {
            tracing::debug!(message = ?self.message, "Geolocation provider returned no data");
            return None;
        }
        Some(GeoLocation {
            country: self.country,
            country_code: self.country_code,
            city: self.city,
            region: self.region_name,
            latitude: self.lat,
            longitude: self.lon,
            timezone: self.timezone,
            ip: self.query,
        })
    }
}

/// Local MaxMind/DB-IP City database.
pub struct MaxMindLocator {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindLocator {
    pub fn open(path: &str) -> Result<Self, GeoError> {
        Ok(Self {
            reader: maxminddb::Reader::open_readfile(path)?,
        })
    }
}

#[async_trait]
impl GeoLocator for MaxMindLocator {
    async fn locate(&self, ip: IpAddr) -> Result<Option<GeoLocation>, GeoError> {
        let record: maxminddb::geoip2::City = match self.reader.lookup(ip) {
            Ok(record) => record,
            Err(maxminddb::MaxMindDBError::AddressNotFoundError(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let english = |names: Option<&std::collections::BTreeMap<&str, &str>>| {
            names.and_then(|n| n.get("en")).map(|s| s.to_string())
        };

        let country = record.country.as_ref();
        let location = record.location.as_ref();
        Ok(Some(GeoLocation {
            country: english(country.and_then(|c| c.names.as_ref())),
            country_code: country.and_then(|c| c.iso_code).map(str::to_string),
            city: english(record.city.as_ref().and_then(|c| c.names.as_ref())),
            region: english(
                record
                    .subdivisions
                    .as_ref()
                    .and_then(|subs| subs.first())
                    .and_then(|sub| sub.names.as_ref()),
            ),
            latitude: location.and_then(|l| l.latitude),
            longitude: location.and_then(|l| l.longitude),
            timezone: location.and_then(|l| l.time_zone).map(str::to_string),
            ip: Some(ip.to_string()),
        }))
    }
}
