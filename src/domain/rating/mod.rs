pub mod model;
pub mod repository;

pub use model::RatingSummary;
pub use repository::RatingRepository;
