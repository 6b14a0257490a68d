pub mod model;
pub mod repository;

pub use model::{
    PickupPointStatus, PickupSource, PickupSuggestion, Reservation, ReservationAction,
    ReservationStatus, SuggestionStatus, TransitionOutcome, Trip, TripPickupPoint, TripStatus,
    MAX_PENDING_SUGGESTIONS,
};
pub use repository::{TripFilter, TripRepository};
