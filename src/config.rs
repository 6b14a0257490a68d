//! Application configuration (TOML-based with environment overrides)
//!
//! A TOML file provides the baseline; secrets and deploy-specific knobs are
//! overridable through environment variables (`JWT_SECRET`, `DATABASE_URL`,
//! `UPLOADS_DIR`, provider API keys, mail credentials).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::application::tariff::TariffRates;

/// Default location: `~/.config/rides-service/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rides-service")
        .join("config.toml")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Connection URL; absent means the API starts degraded (health only).
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// HS256 signing key. Required at startup.
    pub jwt_secret: Option<String>,
    pub jwt_expiration_days: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_days: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VehiclesConfig {
    pub min_capacity: i32,
    pub max_capacity: i32,
}

impl Default for VehiclesConfig {
    fn default() -> Self {
        Self {
            min_capacity: 1,
            max_capacity: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    pub max_size_mb: usize,
    pub dir: String,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_size_mb: 5,
            dir: "./uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// `osrm`, `ors` or `google`.
    pub provider: String,
    pub osrm_base_url: String,
    pub ors_base_url: String,
    pub ors_api_key: Option<String>,
    pub google_api_key: Option<String>,
    /// Cache TTL; floored at 10 minutes by the cache itself.
    pub cache_ttl_minutes: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            provider: "osrm".to_string(),
            osrm_base_url: "https://router.project-osrm.org".to_string(),
            ors_base_url: "https://api.openrouteservice.org".to_string(),
            ors_api_key: None,
            google_api_key: None,
            cache_ttl_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// `console` (log only) or `smtp`.
    pub driver: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            driver: "console".to_string(),
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from: "Wheels Sabana <no-reply@unisabana.edu.co>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub api_requests_per_minute: u32,
    pub login_attempts_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api_requests_per_minute: 300,
            login_attempts_per_minute: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Empty or `"*"` means any origin (dev mode).
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub security: SecurityConfig,
    pub vehicles: VehiclesConfig,
    pub uploads: UploadsConfig,
    pub routing: RoutingConfig,
    pub mail: MailConfig,
    pub tariff: TariffRates,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("read {}: {}", path.display(), e))?;
        let mut config: AppConfig =
            toml::from_str(&raw).map_err(|e| format!("parse {}: {}", path.display(), e))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides, for when no file exists.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.security.jwt_secret = Some(secret);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(min) = env_parse("VEHICLE_MIN_CAPACITY") {
            self.vehicles.min_capacity = min;
        }
        if let Some(max) = env_parse("VEHICLE_MAX_CAPACITY") {
            self.vehicles.max_capacity = max;
        }
        if let Some(mb) = env_parse("UPLOAD_MAX_SIZE_MB") {
            self.uploads.max_size_mb = mb;
        }
        if let Ok(dir) = std::env::var("UPLOADS_DIR") {
            self.uploads.dir = dir;
        }
        if let Ok(provider) = std::env::var("ROUTE_PROVIDER") {
            self.routing.provider = provider;
        }
        if let Ok(key) = std::env::var("ORS_API_KEY") {
            self.routing.ors_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GOOGLE_MAPS_API_KEY") {
            self.routing.google_api_key = Some(key);
        }
        if let Ok(from) = std::env::var("MAIL_FROM") {
            self.mail.from = from;
        }
        if let Ok(user) = std::env::var("SMTP_USERNAME") {
            self.mail.username = user;
        }
        if let Ok(password) = std::env::var("SMTP_PASSWORD") {
            self.mail.password = password;
        }
    }

    /// The signing key, required before serving anything authenticated.
    pub fn jwt_secret(&self) -> Result<&str, String> {
        self.security
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "JWT_SECRET is required (env var or [security].jwt_secret)".to_string())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.uploads.max_size_mb * 1024 * 1024
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

// ── Tests ──────────────────────────────────────────────────────
