//!
//! University ride-sharing REST backend.
//! Reads configuration from TOML file (~/.config/rides-service/config.toml).

use std::sync::Arc;
use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use sabana_rides::application::ports::EmailSender;
use sabana_rides::application::routing::RouteCache;
use sabana_rides::application::{FleetService, IdentityService, TripService};
use sabana_rides::application::fleet::VehicleLimits;
use sabana_rides::config::AppConfig;
use sabana_rides::domain::RepositoryProvider;
use sabana_rides::infrastructure::crypto::jwt::JwtConfig;
use sabana_rides::infrastructure::database::migrator::Migrator;
use sabana_rides::infrastructure::email::{ConsoleMailer, SmtpMailer};
use sabana_rides::infrastructure::routing::build_route_provider;
use sabana_rides::infrastructure::storage::FsBlobStore;
use sabana_rides::infrastructure::InMemoryRevocationStore;
use sabana_rides::{
    create_api_router, create_degraded_router, default_config_path, init_database,
    DatabaseConfig, SeaOrmRepositoryProvider,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("RIDES_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .init();
            warn!("Failed to load config: {}. Using defaults + env.", e);
            AppConfig::from_env()
        }
    };

    info!("Starting Wheels Sabana backend...");

    let jwt_secret = app_cfg.jwt_secret().map_err(|e| {
        error!("{}", e);
        e
    })?;
    let jwt_config = JwtConfig::new(jwt_secret, app_cfg.security.jwt_expiration_days);
    info!(
        "JWT configured with {}d token expiration",
        app_cfg.security.jwt_expiration_days
    );

    // ── Prometheus metrics recorder (before any metrics calls) ─
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    info!("Prometheus metrics recorder installed");

    let addr = format!("{}:{}", app_cfg.server.host, app_cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // ── Database (absent/unreachable → degraded mode) ──────────
    let db = match &app_cfg.database.url {
        Some(url) => {
            let db_config = DatabaseConfig { url: url.clone() };
            match init_database(&db_config).await {
                Ok(db) => Some(db),
                Err(e) => {
                    error!("Failed to connect to database: {}", e);
                    None
                }
            }
        }
        None => {
            warn!("No database URL configured");
            None
        }
    };

    let Some(db) = db else {
        warn!("Serving degraded API (health only) on http://{}", addr);
        let router = create_degraded_router();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        return Ok(());
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    // ── Repositories and outbound adapters ─────────────────────
    let repos: Arc<dyn RepositoryProvider> =
        Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

    let mailer: Arc<dyn EmailSender> = if app_cfg.mail.driver == "smtp" {
        Arc::new(SmtpMailer::new(
            &app_cfg.mail.smtp_server,
            app_cfg.mail.smtp_port,
            app_cfg.mail.username.clone(),
            app_cfg.mail.password.clone(),
            app_cfg.mail.from.clone(),
        )?)
    } else {
        info!("Mail driver: console (emails are logged, not sent)");
        Arc::new(ConsoleMailer)
    };

    let blobs = Arc::new(FsBlobStore::new(app_cfg.uploads.dir.clone()));
    let revocation = Arc::new(InMemoryRevocationStore::new());

    let route_provider = build_route_provider(&app_cfg.routing)?;
    info!("Route provider: {}", route_provider.name());
    let route_cache = Arc::new(RouteCache::new(
        route_provider,
        Duration::from_secs(app_cfg.routing.cache_ttl_minutes * 60),
    ));

    // ── Services ───────────────────────────────────────────────
    let limits = VehicleLimits {
        min_capacity: app_cfg.vehicles.min_capacity,
        max_capacity: app_cfg.vehicles.max_capacity,
        max_upload_bytes: app_cfg.max_upload_bytes(),
    };
    let fleet = Arc::new(FleetService::new(repos.clone(), blobs, limits));
    let identity = Arc::new(IdentityService::new(
        repos.clone(),
        fleet.clone(),
        mailer.clone(),
        revocation.clone(),
        jwt_config.clone(),
    ));
    let trips = Arc::new(TripService::new(
        repos,
        mailer,
        app_cfg.tariff.clone(),
    ));

    // ── REST API ───────────────────────────────────────────────
    let router = create_api_router(
        identity,
        fleet,
        trips,
        route_cache,
        jwt_config,
        revocation,
        &app_cfg,
        prometheus_handle,
    );

    info!("REST API server listening on http://{}", addr);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Performing final cleanup...");
    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    } else {
        info!("Database connection closed");
    }

    info!("Wheels Sabana backend shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
