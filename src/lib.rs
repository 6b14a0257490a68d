//! # Wheels Sabana Core
//!
//! University ride-sharing backend: drivers publish scheduled trips from a
//! vehicle they own, passengers discover trips and reserve seats, drivers
//! confirm or reject, either side may cancel.
//!
//! ## Architecture (Clean / SOLID)
//!
//! - **domain**: Core business entities, state machines and repository traits
//! - **application**: Use-case services, tariff calculator, route cache, outbound ports
//! - **infrastructure**: External concerns (database, crypto, email, blobs, route providers)
//! - **interfaces**: Delivery mechanisms (HTTP REST)
//! - **config**: Application configuration (TOML-based)

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

// Re-export commonly used types at crate root
pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use interfaces::http::{create_api_router, create_degraded_router};
