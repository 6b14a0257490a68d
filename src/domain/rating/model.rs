//! Driver rating read model
//!
//! The rating write path lives outside this core; only the aggregate used to
//! enrich trip listings is modelled here.

/// Aggregate rating of a driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    /// Average score in [1, 5], 0.0 when unrated.
    pub average: f64,
    pub count: u64,
}

impl RatingSummary {
    pub fn empty() -> Self {
        Self {
            average: 0.0,
            count: 0,
        }
    }
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self::empty()
    }
}
