use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;
use voucher_db::models::GeoPoint;
use voucher_shared::api::{Location, NearbyLocation};

use crate::config::NearbyConfig;
use crate::error::VoucherError;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Looks up provider locations close to a point. Best effort: callers treat
/// any error as "no hints".
#[async_trait]
pub trait NearbyLocator: Send + Sync {
    /// `Ok(None)` means the lookup is not configured.
    async fn nearby(
        &self,
        provider_id: Uuid,
        origin: GeoPoint,
    ) -> Result<Option<Vec<NearbyLocation>>, VoucherError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNearbyLocator;

#[async_trait]
impl NearbyLocator for DisabledNearbyLocator {
    async fn nearby(
        &self,
        _provider_id: Uuid,
        _origin: GeoPoint,
    ) -> Result<Option<Vec<NearbyLocation>>, VoucherError> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ProviderLocation {
    name: String,
    #[serde(default)]
    address: Option<String>,
    latitude: f64,
    longitude: f64,
}

/// Asks the catalog service for a provider's branches and keeps the ones
/// within the configured radius, closest first.
pub struct HttpNearbyLocator {
    client: reqwest::Client,
    base_url: String,
    radius_meters: f64,
    cache: Arc<Mutex<HashMap<Uuid, (Vec<ProviderLocation>, Instant)>>>,
}

impl HttpNearbyLocator {
    pub fn new(base_url: &str, timeout: Duration, radius_meters: f64) -> Result<Self, VoucherError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoucherError::ExternalService(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            radius_meters,
            cache: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn cached(&self, provider_id: Uuid) -> Option<Vec<ProviderLocation>> {
        let mut cache = self.cache.lock().ok()?;
        let fresh = cache
            .get(&provider_id)
            .filter(|(_, ts)| ts.elapsed() < CACHE_TTL)
            .map(|(locations, _)| locations.clone());
        if fresh.is_none() {
            cache.remove(&provider_id);
        }
        fresh
    }

    async fn fetch(&self, provider_id: Uuid) -> Result<Vec<ProviderLocation>, VoucherError> {
        if let Some(locations) = self.cached(provider_id) {
            return Ok(locations);
        }

        let url = format!("{}/providers/{}/locations", self.base_url, provider_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| VoucherError::ExternalService(format!("location lookup: {}", e)))?;
        if !resp.status().is_success() {
            return Err(VoucherError::ExternalService(format!(
                "location lookup returned {}",
                resp.status()
            )));
        }
        let locations: Vec<ProviderLocation> = resp
            .json()
            .await
            .map_err(|e| VoucherError::ExternalService(format!("location payload: {}", e)))?;

        debug!(%provider_id, count = locations.len(), "Fetched provider locations");
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(provider_id, (locations.clone(), Instant::now()));
        }
        Ok(locations)
    }
}

#[async_trait]
impl NearbyLocator for HttpNearbyLocator {
    async fn nearby(
        &self,
        provider_id: Uuid,
        origin: GeoPoint,
    ) -> Result<Option<Vec<NearbyLocation>>, VoucherError> {
        let locations = self.fetch(provider_id).await?;
        Ok(Some(within_radius(origin, locations, self.radius_meters)))
    }
}

fn within_radius(
    origin: GeoPoint,
    locations: Vec<ProviderLocation>,
    radius_meters: f64,
) -> Vec<NearbyLocation> {
    let mut nearby: Vec<NearbyLocation> = locations
        .into_iter()
        .map(|loc| {
            let point = GeoPoint {
                latitude: loc.latitude,
                longitude: loc.longitude,
            };
            NearbyLocation {
                name: loc.name,
                address: loc.address,
                location: Location {
                    latitude: loc.latitude,
                    longitude: loc.longitude,
                },
                distance_meters: haversine_meters(origin, point),
            }
        })
        .filter(|loc| loc.distance_meters <= radius_meters)
        .collect();
    nearby.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    nearby
}

pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Picks the HTTP locator when a catalog URL is configured.
pub fn locator_from_config(config: &NearbyConfig) -> Result<Arc<dyn NearbyLocator>, VoucherError> {
    match &config.service_url {
        Some(url) if !url.trim().is_empty() => Ok(Arc::new(HttpNearbyLocator::new(
            url,
            Duration::from_millis(config.timeout_ms),
            config.radius_meters,
        )?)),
        _ => Ok(Arc::new(DisabledNearbyLocator)),
    }
}
