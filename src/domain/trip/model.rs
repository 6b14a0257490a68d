//! Trip aggregate: embedded reservations, pickup points and suggestions

use chrono::{DateTime, Utc};

use crate::domain::user::PaymentMethod;
use crate::domain::{DomainError, DomainResult};

/// Trip lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripStatus {
    Scheduled,
    /// No seats left; flips back to `Scheduled` when seats return.
    Full,
    Cancelled,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Full => "full",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "full" => Some(Self::Full),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Open for discovery and booking.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Full)
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who put a pickup point on the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupSource {
    Driver,
    Passenger,
    /// Derived from the route by stop snapping.
    System,
}

impl PickupSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Passenger => "passenger",
            Self::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "driver" => Some(Self::Driver),
            "passenger" => Some(Self::Passenger),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Whether a snapshot pickup point is still offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupPointStatus {
    Active,
    Rejected,
}

impl PickupPointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Pickup point snapshot owned by the trip.
#[derive(Debug, Clone)]
pub struct TripPickupPoint {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub source: PickupSource,
    pub status: PickupPointStatus,
}

/// Reservation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Seats are held only while pending or confirmed.
    pub fn holds_seats(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action requested against a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationAction {
    Confirm,
    Reject,
    Cancel,
}

impl ReservationAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirm" => Some(Self::Confirm),
            "reject" => Some(Self::Reject),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Result of applying an action to a reservation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The machine moves; `returns_seats` tells the caller to hand the
    /// reserved seats back to the trip.
    Applied {
        next: ReservationStatus,
        returns_seats: bool,
    },
    /// Terminal or repeated call; respond 200 with the unchanged body.
    AlreadyFinal,
}

impl ReservationStatus {
    /// Pure transition table of the reservation machine.
    pub fn apply(&self, action: ReservationAction) -> DomainResult<TransitionOutcome> {
        use ReservationAction::*;
        use ReservationStatus::*;

        if self.is_terminal() {
            return Ok(TransitionOutcome::AlreadyFinal);
        }
        match (self, action) {
            (Pending, Confirm) => Ok(TransitionOutcome::Applied {
                next: Confirmed,
                returns_seats: false,
            }),
            (Confirmed, Confirm) => Ok(TransitionOutcome::AlreadyFinal),
            (Pending, Reject) => Ok(TransitionOutcome::Applied {
                next: Rejected,
                returns_seats: true,
            }),
            (Confirmed, Reject) => Err(DomainError::precondition("RESERVATION_NOT_PENDING")),
            (Pending | Confirmed, Cancel) => Ok(TransitionOutcome::Applied {
                next: Cancelled,
                returns_seats: true,
            }),
            _ => Err(DomainError::precondition("INVALID_RESERVATION_STATE")),
        }
    }
}

/// Seat reservation embedded in a trip.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: String,
    pub trip_id: String,
    pub passenger_id: String,
    pub seats: i32,
    /// One boarding point per reserved seat.
    pub pickup_points: Vec<String>,
    pub payment_method: PaymentMethod,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub decision_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.status.holds_seats()
    }
}

/// Passenger-proposed pickup point waiting for the driver's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Maximum pending suggestions one passenger may hold per trip.
pub const MAX_PENDING_SUGGESTIONS: u64 = 3;

#[derive(Debug, Clone)]
pub struct PickupSuggestion {
    pub id: String,
    pub trip_id: String,
    pub passenger_id: String,
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
}

/// Scheduled trip published by a driver.
#[derive(Debug, Clone)]
pub struct Trip {
    pub id: String,
    pub driver_id: String,
    pub vehicle_id: String,
    pub origin: String,
    pub destination: String,
    pub route_description: Option<String>,
    pub departure_at: DateTime<Utc>,
    pub seats_total: i32,
    pub seats_available: i32,
    /// Fare per seat in COP.
    pub price_per_seat: i64,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub status: TripStatus,
    pub pickup_points: Vec<TripPickupPoint>,
    pub pickup_suggestions: Vec<PickupSuggestion>,
    pub reservations: Vec<Reservation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// `scheduled ⇄ full` from the seat counter; terminal states untouched.
    pub fn normalized_status(status: TripStatus, seats_available: i32) -> TripStatus {
        if status.is_terminal() {
            return status;
        }
        if seats_available <= 0 {
            TripStatus::Full
        } else {
            TripStatus::Scheduled
        }
    }

    /// Seats held by active reservations.
    pub fn seats_held(&self) -> i32 {
        self.reservations
            .iter()
            .filter(|r| r.status.holds_seats())
            .map(|r| r.seats)
            .sum()
    }

    /// The accounting invariant every mutation must preserve.
    pub fn seats_conserved(&self) -> bool {
        self.seats_available == self.seats_total - self.seats_held()
    }

    pub fn reservation(&self, reservation_id: &str) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == reservation_id)
    }

    /// Active (pending or confirmed) reservation held by a passenger.
    pub fn active_reservation_for(&self, passenger_id: &str) -> Option<&Reservation> {
        self.reservations
            .iter()
            .find(|r| r.passenger_id == passenger_id && r.is_active())
    }

    pub fn pending_suggestions_by(&self, passenger_id: &str) -> u64 {
        self.pickup_suggestions
            .iter()
            .filter(|s| s.passenger_id == passenger_id && s.status == SuggestionStatus::Pending)
            .count() as u64
    }
}

// ── Tests ──────────────────────────────────────────────────────
