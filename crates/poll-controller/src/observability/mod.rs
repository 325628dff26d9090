//! Observability: health endpoints and Prometheus metrics exposure.

pub mod health;

pub use health::{health_router, HealthState};
