//! HTTP handlers for recurring-service.

pub mod health;
pub mod recurring;

pub use health::{health_check, metrics_handler, readiness_check};
pub use recurring::{list_due_templates, run_batch};
