pub mod service;

pub use service::{
    IdentityService, RegisterInput, Session, UpdateProfileInput, MIN_PASSWORD_LEN,
};
