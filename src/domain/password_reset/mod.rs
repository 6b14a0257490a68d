pub mod model;
pub mod repository;

pub use model::{PasswordReset, RESET_TOKEN_TTL_MINUTES};
pub use repository::PasswordResetRepository;
