pub mod model;
pub mod repository;

pub use model::{
    normalize_plate, plate_is_valid, DocumentStatus, PickupPoint, Vehicle, VehicleMeta,
    VehicleStatus, EXPIRING_WINDOW_DAYS,
};
pub use repository::VehicleRepository;
