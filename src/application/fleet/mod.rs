pub mod service;

pub use service::{
    FleetService, NewPickupPointInput, NewVehicleInput, UpdateVehicleInput, UploadKind,
    UploadedFile, VehicleLimits, ALLOWED_UPLOAD_TYPES,
};
