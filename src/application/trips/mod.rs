pub mod service;

pub use service::{
    CreateTripInput, ManifestEntry, ReserveInput, SuggestPickupInput, TripService, TripWithRating,
};
