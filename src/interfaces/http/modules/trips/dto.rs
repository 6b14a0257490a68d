//! Trip engine DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::tariff::{TariffInput, TariffSuggestion};
use crate::application::trips::{
    CreateTripInput, ManifestEntry, ReserveInput, SuggestPickupInput, TripWithRating,
};
use crate::domain::geo::GeoPoint;
use crate::domain::rating::RatingSummary;
use crate::domain::trip::{
    PickupSuggestion, Reservation, Trip, TripFilter, TripPickupPoint,
};
use crate::interfaces::http::modules::vehicles::dto::PickupPointRequest;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeoPointDto {
    pub lat: f64,
    pub lng: f64,
}

impl From<GeoPointDto> for GeoPoint {
    fn from(p: GeoPointDto) -> Self {
        GeoPoint::new(p.lat, p.lng)
    }
}

/// `POST /trips`: legacy free-text shape or stops-plus-route shape.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    pub vehicle_id: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub origin_stop_id: Option<String>,
    pub destination_stop_id: Option<String>,
    #[serde(default)]
    pub route: Vec<GeoPointDto>,
    pub route_description: Option<String>,
    pub departure_at: DateTime<Utc>,
    pub seats_total: i32,
    pub price_per_seat: i64,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<f64>,
    #[serde(default)]
    pub pickup_points: Vec<PickupPointRequest>,
    pub suggested_tariff: Option<i64>,
}

impl From<CreateTripRequest> for CreateTripInput {
    fn from(r: CreateTripRequest) -> Self {
        CreateTripInput {
            vehicle_id: r.vehicle_id,
            origin: r.origin,
            destination: r.destination,
            origin_stop_id: r.origin_stop_id,
            destination_stop_id: r.destination_stop_id,
            route: r.route.into_iter().map(Into::into).collect(),
            route_description: r.route_description,
            departure_at: r.departure_at,
            seats_total: r.seats_total,
            price_per_seat: r.price_per_seat,
            distance_km: r.distance_km,
            duration_minutes: r.duration_minutes,
            pickup_points: r.pickup_points.into_iter().map(Into::into).collect(),
            suggested_tariff: r.suggested_tariff,
        }
    }
}

/// Query string of `GET /trips`.
#[derive(Debug, Default, Deserialize)]
pub struct ListTripsQuery {
    pub departure_point: Option<String>,
    pub min_seats: Option<i32>,
    pub max_price: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl From<ListTripsQuery> for TripFilter {
    fn from(q: ListTripsQuery) -> Self {
        TripFilter {
            departure_point: q.departure_point,
            min_seats: q.min_seats,
            max_price: q.max_price,
            start_time: q.start_time,
            end_time: q.end_time,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    pub seats: i32,
    /// One boarding point per seat.
    #[serde(default)]
    pub pickup_points: Vec<String>,
    #[validate(length(min = 1))]
    pub payment_method: String,
}

impl From<ReserveRequest> for ReserveInput {
    fn from(r: ReserveRequest) -> Self {
        ReserveInput {
            seats: r.seats,
            pickup_points: r.pickup_points,
            payment_method: r.payment_method,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SuggestPickupRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl From<SuggestPickupRequest> for SuggestPickupInput {
    fn from(r: SuggestPickupRequest) -> Self {
        SuggestPickupInput {
            name: r.name,
            description: r.description,
            lat: r.lat,
            lng: r.lng,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TariffSuggestRequest {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub demand_factor: Option<f64>,
    pub occupancy: Option<u32>,
}

impl From<TariffSuggestRequest> for TariffInput {
    fn from(r: TariffSuggestRequest) -> Self {
        TariffInput {
            distance_km: r.distance_km,
            duration_minutes: r.duration_minutes,
            demand_factor: r.demand_factor,
            occupancy: r.occupancy,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffSuggestResponse {
    pub suggested_tariff: i64,
    pub breakdown: TariffBreakdownDto,
    pub range: TariffRangeDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffBreakdownDto {
    pub base_boarding: i64,
    pub distance_component: i64,
    pub duration_component: i64,
}

#[derive(Debug, Serialize)]
pub struct TariffRangeDto {
    pub min: i64,
    pub max: i64,
}

impl From<TariffSuggestion> for TariffSuggestResponse {
    fn from(s: TariffSuggestion) -> Self {
        Self {
            suggested_tariff: s.suggested_tariff,
            breakdown: TariffBreakdownDto {
                base_boarding: s.breakdown.base_boarding,
                distance_component: s.breakdown.distance_component,
                duration_component: s.breakdown.duration_component,
            },
            range: TariffRangeDto {
                min: s.range.min,
                max: s.range.max,
            },
        }
    }
}

// ── Read models ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPickupPointDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub source: String,
    pub status: String,
}

impl From<TripPickupPoint> for TripPickupPointDto {
    fn from(p: TripPickupPoint) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            lat: p.lat,
            lng: p.lng,
            source: p.source.as_str().to_string(),
            status: p.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDto {
    pub id: String,
    pub passenger: String,
    pub seats: i32,
    pub pickup_points: Vec<String>,
    pub payment_method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub decision_at: Option<DateTime<Utc>>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            passenger: r.passenger_id,
            seats: r.seats,
            pickup_points: r.pickup_points,
            payment_method: r.payment_method.as_str().to_string(),
            status: r.status.as_str().to_string(),
            created_at: r.created_at,
            decision_at: r.decision_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupSuggestionDto {
    pub id: String,
    pub passenger: String,
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<PickupSuggestion> for PickupSuggestionDto {
    fn from(s: PickupSuggestion) -> Self {
        Self {
            id: s.id,
            passenger: s.passenger_id,
            name: s.name,
            description: s.description,
            lat: s.lat,
            lng: s.lng,
            status: s.status.as_str().to_string(),
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDto {
    pub id: String,
    pub driver: String,
    pub vehicle: String,
    pub origin: String,
    pub destination: String,
    pub route_description: Option<String>,
    pub departure_at: DateTime<Utc>,
    pub seats_total: i32,
    pub seats_available: i32,
    pub price_per_seat: i64,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub status: String,
    pub pickup_points: Vec<TripPickupPointDto>,
    pub pickup_suggestions: Vec<PickupSuggestionDto>,
    pub reservations: Vec<ReservationDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Trip> for TripDto {
    fn from(t: Trip) -> Self {
        Self {
            id: t.id,
            driver: t.driver_id,
            vehicle: t.vehicle_id,
            origin: t.origin,
            destination: t.destination,
            route_description: t.route_description,
            departure_at: t.departure_at,
            seats_total: t.seats_total,
            seats_available: t.seats_available,
            price_per_seat: t.price_per_seat,
            distance_km: t.distance_km,
            duration_minutes: t.duration_minutes,
            status: t.status.as_str().to_string(),
            pickup_points: t.pickup_points.into_iter().map(Into::into).collect(),
            pickup_suggestions: t.pickup_suggestions.into_iter().map(Into::into).collect(),
            reservations: t.reservations.into_iter().map(Into::into).collect(),
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRatingDto {
    pub average: f64,
    pub count: u64,
}

impl From<RatingSummary> for DriverRatingDto {
    fn from(r: RatingSummary) -> Self {
        Self {
            average: r.average,
            count: r.count,
        }
    }
}

/// Listing row: trip fields plus the driver's aggregate rating.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripListItemDto {
    #[serde(flatten)]
    pub trip: TripDto,
    pub driver_rating: DriverRatingDto,
}

impl From<TripWithRating> for TripListItemDto {
    fn from(t: TripWithRating) -> Self {
        Self {
            trip: t.trip.into(),
            driver_rating: t.driver_rating.into(),
        }
    }
}

/// Driver-only manifest row with minimal passenger PII.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntryDto {
    pub reservation_id: String,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub passenger_email: String,
    pub seats: i32,
    pub pickup_points: Vec<String>,
    pub payment_method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub decision_at: Option<DateTime<Utc>>,
}

impl From<ManifestEntry> for ManifestEntryDto {
    fn from(m: ManifestEntry) -> Self {
        Self {
            reservation_id: m.reservation.id,
            passenger_name: m.passenger_name,
            passenger_phone: m.passenger_phone,
            passenger_email: m.passenger_email,
            seats: m.reservation.seats,
            pickup_points: m.reservation.pickup_points,
            payment_method: m.reservation.payment_method.as_str().to_string(),
            status: m.reservation.status.as_str().to_string(),
            created_at: m.reservation.created_at,
            decision_at: m.reservation.decision_at,
        }
    }
}
