//! Maps and routing DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::routing::RouteCacheEntry;
use crate::domain::stop::{BusRoute, Station, Stop};
use crate::interfaces::http::modules::trips::dto::{GeoPointDto, TariffSuggestResponse};

/// `GET /maps/distance` and `GET /maps/route-suggest` query string;
/// coordinates come as `"lat,lng"` pairs.
#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub origin: String,
    pub destination: String,
    pub mode: Option<String>,
}

/// `POST /maps/calculate` body.
#[derive(Debug, Deserialize, Validate)]
pub struct CalculateRequest {
    pub origin: GeoPointDto,
    pub destination: GeoPointDto,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDto {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub encoded_polyline: Option<String>,
    pub provider: String,
    pub fetched_at: DateTime<Utc>,
}

impl From<RouteCacheEntry> for RouteDto {
    fn from(e: RouteCacheEntry) -> Self {
        Self {
            distance_meters: e.distance_meters,
            duration_seconds: e.duration_seconds,
            distance_km: e.distance_meters / 1000.0,
            duration_minutes: e.duration_seconds / 60.0,
            encoded_polyline: e.encoded_polyline,
            provider: e.provider.to_string(),
            fetched_at: e.fetched_at,
        }
    }
}

/// Route plus fare suggestion, for the trip form.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSuggestResponse {
    pub route: RouteDto,
    pub tariff: TariffSuggestResponse,
}

// ── Static catalog ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDto {
    pub id: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl From<&Station> for StationDto {
    fn from(s: &Station) -> Self {
        Self {
            id: s.id,
            name: s.name,
            lat: s.lat,
            lng: s.lng,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopDto {
    pub id: &'static str,
    pub station_id: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl From<&Stop> for StopDto {
    fn from(s: &Stop) -> Self {
        Self {
            id: s.id,
            station_id: s.station_id,
            name: s.name,
            lat: s.lat,
            lng: s.lng,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusRouteDto {
    pub id: &'static str,
    pub name: &'static str,
    pub stop_ids: Vec<&'static str>,
}

impl From<&BusRoute> for BusRouteDto {
    fn from(r: &BusRoute) -> Self {
        Self {
            id: r.id,
            name: r.name,
            stop_ids: r.stop_ids.to_vec(),
        }
    }
}
