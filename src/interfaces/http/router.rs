//! API Router

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::application::ports::TokenRevocationStore;
use crate::application::routing::RouteCache;
use crate::application::{FleetService, IdentityService, TripService};
use crate::config::AppConfig;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::middleware::{auth_middleware, AuthState};

use super::modules::{auth, health, maps, metrics, trips, vehicles};

/// Create the API router with all routes
#[allow(clippy::too_many_arguments)]
pub fn create_api_router(
    identity: Arc<IdentityService>,
    fleet: Arc<FleetService>,
    trips: Arc<TripService>,
    route_cache: Arc<RouteCache>,
    jwt_config: JwtConfig,
    revocation: Arc<dyn TokenRevocationStore>,
    app_cfg: &AppConfig,
    prometheus_handle: PrometheusHandle,
) -> Router {
    let middleware_state = AuthState {
        jwt_config,
        revocation,
    };

    // CORS configuration
    let cors = build_cors_layer(&app_cfg.cors);

    // Rate limiting configuration
    let api_rpm = app_cfg.rate_limit.api_requests_per_minute.max(1);
    let api_replenish = (60.0 / api_rpm as f64) as u64;
    let api_governor_conf = GovernorConfigBuilder::default()
        .per_second(api_replenish.max(1))
        .burst_size(api_rpm)
        .use_headers()
        .finish()
        .expect("Failed to build API rate limiter config");
    info!("Rate limit (API): {} req/min per IP", api_rpm);

    let login_rpm = app_cfg.rate_limit.login_attempts_per_minute.max(1);
    let login_replenish = (60.0 / login_rpm as f64) as u64;
    let login_governor_conf = GovernorConfigBuilder::default()
        .per_second(login_replenish.max(1))
        .burst_size(login_rpm)
        .use_headers()
        .finish()
        .expect("Failed to build login rate limiter config");
    info!("Rate limit (login): {} req/min per IP", login_rpm);

    // ── Auth ───────────────────────────────────────────────────
    let auth_state = auth::AuthHandlerState {
        identity: identity.clone(),
    };

    // Public auth routes, with the stricter rate limit on credential endpoints
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .layer(GovernorLayer::new(login_governor_conf))
        .with_state(auth_state.clone());

    let auth_protected_routes = Router::new()
        .route(
            "/me",
            get(auth::get_current_user).put(auth::update_profile),
        )
        .route("/logout", post(auth::logout))
        .route("/role", put(auth::switch_role))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(auth_state);

    // ── Vehicles (multipart uploads allowed, capped) ───────────
    let vehicle_state = vehicles::VehicleHandlerState { fleet };
    // Body cap: three document files plus form fields.
    let vehicle_body_cap = app_cfg.max_upload_bytes() * 3 + 64 * 1024;
    let vehicle_routes = Router::new()
        .route("/", get(vehicles::list_vehicles).post(vehicles::create_vehicle))
        .route("/validate", post(vehicles::validate_vehicle))
        .route(
            "/{vehicle_id}",
            put(vehicles::update_vehicle).delete(vehicles::delete_vehicle),
        )
        .route("/{vehicle_id}/activate", put(vehicles::activate_vehicle))
        .route(
            "/{vehicle_id}/request-review",
            post(vehicles::request_review),
        )
        .route(
            "/{vehicle_id}/pickup-points",
            post(vehicles::add_pickup_point),
        )
        .route(
            "/{vehicle_id}/pickup-points/{point_id}",
            put(vehicles::update_pickup_point).delete(vehicles::delete_pickup_point),
        )
        .layer(DefaultBodyLimit::max(vehicle_body_cap))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(vehicle_state);

    // ── Trips ──────────────────────────────────────────────────
    let trip_state = trips::TripHandlerState {
        trips,
        identity,
    };
    let trip_routes = Router::new()
        .route("/", get(trips::list_trips).post(trips::create_trip))
        .route("/tariff/suggest", post(trips::tariff_suggest))
        .route("/{trip_id}/reservations", post(trips::create_reservation))
        .route(
            "/{trip_id}/reservations/{reservation_id}/{action}",
            put(trips::transition_reservation),
        )
        .route("/{trip_id}/cancel", put(trips::cancel_trip))
        .route(
            "/{trip_id}/pickup-suggestions",
            post(trips::suggest_pickup),
        )
        .route(
            "/{trip_id}/pickup-suggestions/{suggestion_id}/{verdict}",
            put(trips::resolve_suggestion),
        )
        .route("/{trip_id}/passengers", get(trips::passenger_manifest))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(trip_state);

    // ── Maps ───────────────────────────────────────────────────
    let maps_state = maps::MapsHandlerState {
        route_cache,
        rates: app_cfg.tariff.clone(),
    };
    let maps_protected_routes = Router::new()
        .route("/distance", get(maps::distance))
        .route("/calculate", post(maps::calculate))
        .layer(middleware::from_fn_with_state(
            middleware_state,
            auth_middleware,
        ))
        .with_state(maps_state.clone());
    // Route suggestion and the stop catalog feed pre-login screens.
    let maps_public_routes = Router::new()
        .route("/route-suggest", get(maps::route_suggest))
        .route("/transmilenio/routes", get(maps::transmilenio_routes))
        .route("/transmilenio/stations", get(maps::transmilenio_stations))
        .route("/transmilenio/stops", get(maps::transmilenio_stops))
        .with_state(maps_state);

    // ── Health / metrics ───────────────────────────────────────
    let health_routes = Router::new().route("/health", get(health::health_check));

    let metrics_state = metrics::MetricsState {
        handle: prometheus_handle,
    };
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .with_state(metrics_state);

    // Build router
    Router::new()
        .merge(health_routes)
        .merge(metrics_routes)
        .nest("/auth", auth_routes)
        .nest("/auth", auth_protected_routes)
        .nest("/vehicles", vehicle_routes)
        .nest("/trips", trip_routes)
        .nest("/maps", maps_protected_routes)
        .nest("/maps", maps_public_routes)
        // Middleware
        .layer(GovernorLayer::new(api_governor_conf))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(metrics::http_metrics_middleware))
}

/// Build the CORS layer from application configuration.
///
/// - If `allowed_origins` is empty or contains `"*"` → allow any origin (dev mode).
/// - Otherwise → restrict to the explicit list of origins.
fn build_cors_layer(cors_cfg: &crate::config::CorsConfig) -> CorsLayer {
    let is_any = cors_cfg.allowed_origins.is_empty()
        || cors_cfg.allowed_origins.iter().any(|o| o.trim() == "*");

    if is_any {
        info!("CORS: allowing ANY origin (dev mode). Set [cors].allowed_origins for production.");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = cors_cfg
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        info!("CORS: allowed origins: {:?}", cors_cfg.allowed_origins);
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Minimal router served when the database is unreachable: health stays up,
/// everything else answers 503.
pub fn create_degraded_router() -> Router {
    use axum::http::StatusCode;
    use axum::Json;
    use serde_json::json;

    Router::new()
        .route("/health", get(health::health_check))
        .fallback(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "DATABASE_UNAVAILABLE" })),
            )
        })
}
