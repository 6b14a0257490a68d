//! Application layer - use-case services and outbound ports

pub mod fleet;
pub mod identity;
pub mod ports;
pub mod routing;
pub mod tariff;
pub mod trips;

pub use fleet::FleetService;
pub use identity::IdentityService;
pub use routing::RouteCache;
pub use trips::TripService;
