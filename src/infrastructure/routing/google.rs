//! Google Directions route provider adapter
//!
//! Aggregates leg distances/durations, preferring `duration_in_traffic`
//! when the API returns it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::application::ports::{RouteProvider, RouteSummary, TravelMode};
use crate::domain::geo::GeoPoint;
use crate::domain::DomainResult;

use super::{provider_err, REQUEST_TIMEOUT};

const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

pub struct GoogleProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DIRECTIONS_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            base_url: base_url.to_string(),
        }
    }

    fn mode_param(mode: TravelMode) -> &'static str {
        match mode {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Cycling => "bicycling",
        }
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
    overview_polyline: Option<OverviewPolyline>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: ValueField,
    duration: ValueField,
    duration_in_traffic: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

fn aggregate(route: &DirectionsRoute) -> (f64, f64) {
    let distance = route.legs.iter().map(|l| l.distance.value).sum();
    let duration = route
        .legs
        .iter()
        .map(|l| {
            l.duration_in_traffic
                .as_ref()
                .unwrap_or(&l.duration)
                .value
        })
        .sum();
    (distance, duration)
}

#[async_trait]
impl RouteProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn lookup(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> DomainResult<RouteSummary> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("origin", origin.canonical()),
                ("destination", destination.canonical()),
                ("mode", Self::mode_param(mode).to_string()),
                ("departure_time", "now".to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|_| provider_err("google", None))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(provider_err("google", Some(status)));
        }

        let parsed: DirectionsResponse = response
            .json()
            .await
            .map_err(|_| provider_err("google", Some(status)))?;
        if parsed.status != "OK" {
            return Err(provider_err("google", Some(status)));
        }
        let route = parsed
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| provider_err("google", Some(status)))?;

        let (distance_meters, duration_seconds) = aggregate(&route);
        Ok(RouteSummary {
            distance_meters,
            duration_seconds,
            encoded_polyline: route.overview_polyline.map(|p| p.points),
            provider: "google",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_prefers_duration_in_traffic() {
        let body = r#"{
            "status": "OK",
            "routes": [{
                "legs": [
                    {"distance": {"value": 5000.0}, "duration": {"value": 600.0},
                     "duration_in_traffic": {"value": 900.0}},
                    {"distance": {"value": 3000.0}, "duration": {"value": 400.0}}
                ],
                "overview_polyline": {"points": "xyz"}
            }]
        }"#;
        let parsed: DirectionsResponse = serde_json::from_str(body).unwrap();
        let (distance, duration) = aggregate(&parsed.routes[0]);
        assert_eq!(distance, 8000.0);
        assert_eq!(duration, 1300.0);
    }

    #[test]
    fn non_ok_status_detected() {
        let body = r#"{"status":"ZERO_RESULTS","routes":[]}"#;
        let parsed: DirectionsResponse = serde_json::from_str(body).unwrap();
        assert_ne!(parsed.status, "OK");
    }
}
