//! Status API: liveness, readiness, scan statistics and Prometheus metrics.

pub mod handlers;
pub mod routes;

pub use handlers::{AppState, StatusResponse};
pub use routes::create_router;
