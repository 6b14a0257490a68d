//! HTTP REST API interfaces
//!
//! - `middleware`: Bearer-token authentication with revocation checks
//! - `modules`: Request handlers per resource
//! - `router`: API router assembly

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::{create_api_router, create_degraded_router};
