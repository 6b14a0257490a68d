pub mod model;
pub mod repository;

pub use model::{
    is_institutional_email, PaymentMethod, Role, RoleSet, User, INSTITUTIONAL_DOMAIN,
};
pub use repository::UserRepository;
