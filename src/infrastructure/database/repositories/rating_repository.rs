//! SeaORM implementation of RatingRepository (read-only)

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::domain::rating::{RatingRepository, RatingSummary};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::rating;

use super::user_repository::db_err;

pub struct SeaOrmRatingRepository {
    db: DatabaseConnection,
}

impl SeaOrmRatingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn summarize(scores: &[i32]) -> RatingSummary {
    if scores.is_empty() {
        return RatingSummary::empty();
    }
    let sum: i64 = scores.iter().map(|s| *s as i64).sum();
    RatingSummary {
        average: sum as f64 / scores.len() as f64,
        count: scores.len() as u64,
    }
}

#[async_trait]
impl RatingRepository for SeaOrmRatingRepository {
    async fn summary_for_driver(&self, driver_id: &str) -> DomainResult<RatingSummary> {
        let scores: Vec<i32> = rating::Entity::find()
            .filter(rating::Column::DriverId.eq(driver_id))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| m.score)
            .collect();
        Ok(summarize(&scores))
    }

    async fn summaries_for_drivers(
        &self,
        driver_ids: &[String],
    ) -> DomainResult<HashMap<String, RatingSummary>> {
        if driver_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut by_driver: HashMap<String, Vec<i32>> = HashMap::new();
        for m in rating::Entity::find()
            .filter(rating::Column::DriverId.is_in(driver_ids.iter().cloned()))
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            by_driver.entry(m.driver_id).or_default().push(m.score);
        }
        Ok(by_driver
            .into_iter()
            .map(|(driver, scores)| (driver, summarize(&scores)))
            .collect())
    }
}
