pub mod budget;
pub mod health;

pub use budget::{generate_budget, method_not_allowed, preflight, PLACEHOLDER_CONTENT};
pub use health::{health_check, metrics_endpoint, readiness_check};
