//! Rating repository interface (read-only in this core)

use std::collections::HashMap;

use async_trait::async_trait;

use super::model::RatingSummary;
use crate::domain::DomainResult;

#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Aggregate for one driver; `RatingSummary::empty()` when unrated.
    async fn summary_for_driver(&self, driver_id: &str) -> DomainResult<RatingSummary>;

    /// Aggregates for a batch of drivers (trip listing enrichment).
    /// Unrated drivers are absent from the map.
    async fn summaries_for_drivers(
        &self,
        driver_ids: &[String],
    ) -> DomainResult<HashMap<String, RatingSummary>>;
}
