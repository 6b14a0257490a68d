//! OSRM route provider adapter

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::application::ports::{RouteProvider, RouteSummary, TravelMode};
use crate::domain::geo::GeoPoint;
use crate::domain::DomainResult;

use super::{provider_err, REQUEST_TIMEOUT};

/// Thin HTTP client for an OSRM `route` service.
pub struct OsrmProvider {
    client: Client,
    base_url: String,
}

impl OsrmProvider {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn profile(mode: TravelMode) -> &'static str {
        match mode {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Cycling => "cycling",
        }
    }

    // OSRM wants lng,lat ordering.
    fn route_url(&self, origin: GeoPoint, destination: GeoPoint, mode: TravelMode) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=polyline",
            self.base_url,
            Self::profile(mode),
            origin.lng,
            origin.lat,
            destination.lng,
            destination.lat,
        )
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    /// polyline5-encoded when `geometries=polyline`
    geometry: Option<String>,
}

#[async_trait]
impl RouteProvider for OsrmProvider {
    fn name(&self) -> &'static str {
        "osrm"
    }

    async fn lookup(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> DomainResult<RouteSummary> {
        let url = self.route_url(origin, destination, mode);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| provider_err("osrm", None))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(provider_err("osrm", Some(status)));
        }

        let parsed: OsrmResponse = response
            .json()
            .await
            .map_err(|_| provider_err("osrm", Some(status)))?;
        if parsed.code != "Ok" {
            return Err(provider_err("osrm", Some(status)));
        }
        let route = parsed
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| provider_err("osrm", Some(status)))?;

        Ok(RouteSummary {
            distance_meters: route.distance,
            duration_seconds: route.duration,
            encoded_polyline: route.geometry,
            provider: "osrm",
        })
    }
}
