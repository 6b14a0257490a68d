//! Vehicle registry endpoints

pub mod dto;
pub mod handlers;
pub mod payload;

pub use dto::*;
pub use handlers::*;
