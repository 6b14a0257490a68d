//! Maps REST API handlers: distance/route lookups and the stop catalog

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use super::dto::{
    BusRouteDto, CalculateRequest, RouteDto, RouteQuery, RouteSuggestResponse, StationDto,
    StopDto,
};
use crate::application::ports::TravelMode;
use crate::application::routing::RouteCache;
use crate::application::tariff::{self, TariffInput, TariffRates};
use crate::domain::geo::GeoPoint;
use crate::domain::stop::{ROUTES, STATIONS, STOPS};
use crate::interfaces::http::common::{ApiError, ApiResult, ValidatedJson};

/// Maps handler state
#[derive(Clone)]
pub struct MapsHandlerState {
    pub route_cache: Arc<RouteCache>,
    pub rates: TariffRates,
}

/// Parse a `"lat,lng"` coordinate pair.
fn parse_point(raw: &str) -> Result<GeoPoint, ApiError> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| ApiError::bad_request("INVALID_COORDINATES"))?;
    let point = GeoPoint::new(
        lat.trim()
            .parse()
            .map_err(|_| ApiError::bad_request("INVALID_COORDINATES"))?,
        lng.trim()
            .parse()
            .map_err(|_| ApiError::bad_request("INVALID_COORDINATES"))?,
    );
    if !point.in_bounds() {
        return Err(ApiError::bad_request("INVALID_COORDINATES"));
    }
    Ok(point)
}

fn parse_mode(raw: Option<&str>) -> Result<TravelMode, ApiError> {
    match raw {
        None => Ok(TravelMode::default()),
        Some(raw) => {
            TravelMode::parse(raw).ok_or_else(|| ApiError::bad_request("INVALID_TRAVEL_MODE"))
        }
    }
}

/// `GET /maps/distance?origin=lat,lng&destination=lat,lng[&mode=driving]`.
pub async fn distance(
    State(state): State<MapsHandlerState>,
    Query(query): Query<RouteQuery>,
) -> ApiResult<Json<RouteDto>> {
    let origin = parse_point(&query.origin)?;
    let destination = parse_point(&query.destination)?;
    let mode = parse_mode(query.mode.as_deref())?;

    let entry = state.route_cache.lookup(origin, destination, mode).await?;
    Ok(Json(entry.into()))
}

/// `POST /maps/calculate`: same lookup with a JSON body.
pub async fn calculate(
    State(state): State<MapsHandlerState>,
    ValidatedJson(request): ValidatedJson<CalculateRequest>,
) -> ApiResult<Json<RouteDto>> {
    let origin: GeoPoint = request.origin.into();
    let destination: GeoPoint = request.destination.into();
    if !origin.in_bounds() || !destination.in_bounds() {
        return Err(ApiError::bad_request("INVALID_COORDINATES"));
    }
    let mode = parse_mode(request.mode.as_deref())?;

    let entry = state.route_cache.lookup(origin, destination, mode).await?;
    Ok(Json(entry.into()))
}

/// `GET /maps/route-suggest` (public): route plus suggested tariff, used
/// by the trip-publication form.
pub async fn route_suggest(
    State(state): State<MapsHandlerState>,
    Query(query): Query<RouteQuery>,
) -> ApiResult<Json<RouteSuggestResponse>> {
    let origin = parse_point(&query.origin)?;
    let destination = parse_point(&query.destination)?;
    let mode = parse_mode(query.mode.as_deref())?;

    let entry = state.route_cache.lookup(origin, destination, mode).await?;
    let suggestion = tariff::suggest(
        &state.rates,
        TariffInput {
            distance_km: entry.distance_meters / 1000.0,
            duration_minutes: entry.duration_seconds / 60.0,
            demand_factor: None,
            occupancy: None,
        },
    )?;

    Ok(Json(RouteSuggestResponse {
        route: entry.into(),
        tariff: suggestion.into(),
    }))
}

// ── TransMilenio catalog (public, static) ──────────────────────

/// `GET /maps/transmilenio/routes`.
pub async fn transmilenio_routes() -> Json<Vec<BusRouteDto>> {
    Json(ROUTES.iter().map(Into::into).collect())
}

/// `GET /maps/transmilenio/stations`.
pub async fn transmilenio_stations() -> Json<Vec<StationDto>> {
    Json(STATIONS.iter().map(Into::into).collect())
}

/// `GET /maps/transmilenio/stops`.
pub async fn transmilenio_stops() -> Json<Vec<StopDto>> {
    Json(STOPS.iter().map(Into::into).collect())
}

// ── Tests ──────────────────────────────────────────────────────
