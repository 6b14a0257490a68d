//! Trip engine REST API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    CreateTripRequest, ListTripsQuery, ManifestEntryDto, PickupSuggestionDto, ReservationDto,
    ReserveRequest, SuggestPickupRequest, TariffSuggestRequest, TariffSuggestResponse,
    TripDto, TripListItemDto,
};
use crate::application::identity::IdentityService;
use crate::application::tariff;
use crate::application::trips::TripService;
use crate::domain::trip::ReservationAction;
use crate::domain::user::User;
use crate::interfaces::http::common::{ApiError, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Trip handler state
#[derive(Clone)]
pub struct TripHandlerState {
    pub trips: Arc<TripService>,
    pub identity: Arc<IdentityService>,
}

impl TripHandlerState {
    /// Resolve the authenticated caller to a full user.
    async fn caller(&self, auth: &AuthenticatedUser) -> ApiResult<User> {
        Ok(self.identity.current_user(&auth.user_id).await?)
    }
}

/// `POST /trips`.
pub async fn create_trip(
    State(state): State<TripHandlerState>,
    Extension(auth): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateTripRequest>,
) -> ApiResult<(StatusCode, Json<TripDto>)> {
    let caller = state.caller(&auth).await?;
    let trip = state.trips.create_trip(&caller, request.into()).await?;
    Ok((StatusCode::CREATED, Json(trip.into())))
}

/// `GET /trips`: open trips, departure ascending, rating-enriched.
pub async fn list_trips(
    State(state): State<TripHandlerState>,
    Query(query): Query<ListTripsQuery>,
) -> ApiResult<Json<Vec<TripListItemDto>>> {
    let rows = state.trips.list_trips(&query.into()).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// `POST /trips/:id/reservations`, the atomic seat booking.
pub async fn create_reservation(
    State(state): State<TripHandlerState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(trip_id): Path<String>,
    ValidatedJson(request): ValidatedJson<ReserveRequest>,
) -> ApiResult<(StatusCode, Json<TripDto>)> {
    let caller = state.caller(&auth).await?;
    let trip = state.trips.reserve(&trip_id, &caller, request.into()).await?;
    Ok((StatusCode::CREATED, Json(trip.into())))
}

/// `PUT /trips/:tripId/reservations/:resId/:action` with
/// action one of confirm, reject, cancel.
pub async fn transition_reservation(
    State(state): State<TripHandlerState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((trip_id, reservation_id, action)): Path<(String, String, String)>,
) -> ApiResult<Json<ReservationDto>> {
    let action = ReservationAction::parse(&action)
        .ok_or_else(|| ApiError::bad_request("UNKNOWN_RESERVATION_ACTION"))?;
    let caller = state.caller(&auth).await?;
    let (_, reservation) = state
        .trips
        .transition_reservation(&trip_id, &reservation_id, action, &caller)
        .await?;
    Ok(Json(reservation.into()))
}

/// `PUT /trips/:id/cancel`: driver cancels, passengers get emailed.
pub async fn cancel_trip(
    State(state): State<TripHandlerState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(trip_id): Path<String>,
) -> ApiResult<Json<TripDto>> {
    let caller = state.caller(&auth).await?;
    let trip = state.trips.cancel_trip(&trip_id, &caller).await?;
    Ok(Json(trip.into()))
}

/// `POST /trips/:id/pickup-suggestions`.
pub async fn suggest_pickup(
    State(state): State<TripHandlerState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(trip_id): Path<String>,
    ValidatedJson(request): ValidatedJson<SuggestPickupRequest>,
) -> ApiResult<(StatusCode, Json<PickupSuggestionDto>)> {
    let caller = state.caller(&auth).await?;
    let suggestion = state
        .trips
        .suggest_pickup(&trip_id, &caller, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(suggestion.into())))
}

/// `PUT /trips/:id/pickup-suggestions/:sid/:verdict` with
/// verdict either accept or reject.
pub async fn resolve_suggestion(
    State(state): State<TripHandlerState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((trip_id, suggestion_id, verdict)): Path<(String, String, String)>,
) -> ApiResult<Json<TripDto>> {
    let accept = match verdict.as_str() {
        "accept" => true,
        "reject" => false,
        _ => return Err(ApiError::bad_request("UNKNOWN_SUGGESTION_ACTION")),
    };
    let caller = state.caller(&auth).await?;
    let trip = state
        .trips
        .resolve_suggestion(&trip_id, &suggestion_id, accept, &caller)
        .await?;
    Ok(Json(trip.into()))
}

/// `GET /trips/:id/passengers`, the driver-only manifest.
pub async fn passenger_manifest(
    State(state): State<TripHandlerState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(trip_id): Path<String>,
) -> ApiResult<Json<Vec<ManifestEntryDto>>> {
    let caller = state.caller(&auth).await?;
    let manifest = state.trips.passenger_manifest(&trip_id, &caller).await?;
    Ok(Json(manifest.into_iter().map(Into::into).collect()))
}

/// `POST /trips/tariff/suggest`.
pub async fn tariff_suggest(
    State(state): State<TripHandlerState>,
    Extension(_auth): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<TariffSuggestRequest>,
) -> ApiResult<Json<TariffSuggestResponse>> {
    let suggestion = tariff::suggest(state.trips.tariff_rates(), request.into())?;
    Ok(Json(suggestion.into()))
}
