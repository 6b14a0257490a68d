//! Delivery mechanisms (HTTP REST)

pub mod http;
