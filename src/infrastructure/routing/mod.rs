//! Route provider adapters (OSRM, OpenRouteService, Google Directions)

pub mod google;
pub mod ors;
pub mod osrm;

use std::sync::Arc;
use std::time::Duration;

pub use google::GoogleProvider;
pub use ors::OrsProvider;
pub use osrm::OsrmProvider;

use crate::application::ports::RouteProvider;
use crate::config::RoutingConfig;
use crate::domain::{DomainError, DomainResult};

/// Per-request timeout for every provider call.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn provider_err(provider: &'static str, upstream_status: Option<u16>) -> DomainError {
    DomainError::Dependency {
        code: "ROUTE_PROVIDER_ERROR".into(),
        provider,
        upstream_status,
    }
}

/// Instantiate the configured provider.
pub fn build_route_provider(cfg: &RoutingConfig) -> DomainResult<Arc<dyn RouteProvider>> {
    match cfg.provider.as_str() {
        "osrm" => Ok(Arc::new(OsrmProvider::new(&cfg.osrm_base_url))),
        "ors" => {
            let api_key = cfg
                .ors_api_key
                .clone()
                .ok_or_else(|| DomainError::validation("ORS_API_KEY_REQUIRED"))?;
            Ok(Arc::new(OrsProvider::new(&cfg.ors_base_url, api_key)))
        }
        "google" => {
            let api_key = cfg
                .google_api_key
                .clone()
                .ok_or_else(|| DomainError::validation("GOOGLE_API_KEY_REQUIRED"))?;
            Ok(Arc::new(GoogleProvider::new(api_key)))
        }
        other => Err(DomainError::Validation(format!(
            "unknown route provider: {}",
            other
        ))),
    }
}
