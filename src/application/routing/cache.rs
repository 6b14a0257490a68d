//! Memoized route lookups with single-flight miss handling

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::application::ports::{RouteProvider, TravelMode};
use crate::domain::geo::GeoPoint;
use crate::domain::DomainResult;

/// Floor for the configured TTL; must stay at or above the provider
/// rate-limit window.
pub const MIN_TTL: Duration = Duration::from_secs(10 * 60);

/// Immutable snapshot of one provider answer.
#[derive(Debug, Clone)]
pub struct RouteCacheEntry {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub encoded_polyline: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub provider: &'static str,
}

/// Memoizes provider calls by `(origin, destination, mode)`.
///
/// Concurrent misses on the same key collapse into a single upstream call:
/// the first task holds a per-key async mutex while the rest queue on it
/// and then hit the cache.
pub struct RouteCache {
    provider: Arc<dyn RouteProvider>,
    ttl: Duration,
    entries: DashMap<String, RouteCacheEntry>,
    inflight: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl RouteCache {
    pub fn new(provider: Arc<dyn RouteProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl: ttl.max(MIN_TTL),
            entries: DashMap::new(),
            inflight: DashMap::new(),
        }
    }

    /// TTL floor bypassed; only for tests that need fast expiry.
    #[cfg(test)]
    pub fn with_raw_ttl(provider: Arc<dyn RouteProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            entries: DashMap::new(),
            inflight: DashMap::new(),
        }
    }

    fn key(origin: GeoPoint, destination: GeoPoint, mode: TravelMode) -> String {
        format!(
            "{}|{}|{}",
            origin.canonical(),
            destination.canonical(),
            mode.as_str()
        )
    }

    fn fresh(&self, key: &str) -> Option<RouteCacheEntry> {
        let entry = self.entries.get(key)?;
        let age = Utc::now().signed_duration_since(entry.fetched_at);
        if age.to_std().map(|a| a < self.ttl).unwrap_or(false) {
            Some(entry.clone())
        } else {
            None
        }
    }

    pub async fn lookup(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> DomainResult<RouteCacheEntry> {
        let key = Self::key(origin, destination, mode);

        if let Some(entry) = self.fresh(&key) {
            return Ok(entry);
        }

        let gate = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _held = gate.lock().await;

        // A queued task finds the entry the leader just inserted.
        if let Some(entry) = self.fresh(&key) {
            return Ok(entry);
        }

        debug!("route cache miss: {}", key);
        let summary = self.provider.lookup(origin, destination, mode).await?;
        let entry = RouteCacheEntry {
            distance_meters: summary.distance_meters,
            duration_seconds: summary.duration_seconds,
            encoded_polyline: summary.encoded_polyline,
            fetched_at: Utc::now(),
            provider: summary.provider,
        };
        self.entries.insert(key.clone(), entry.clone());
        drop(_held);
        self.inflight.remove(&key);
        Ok(entry)
    }
}

// ── Tests ──────────────────────────────────────────────────────
