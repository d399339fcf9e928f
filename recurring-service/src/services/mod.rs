//! Services module for recurring-service.

pub mod database;
pub mod metrics;
pub mod runner;
pub mod schedule;
pub mod scheduler;
pub mod store;

pub use database::Database;
pub use metrics::{
    get_metrics, init_metrics, record_batch_run, record_invoice_materialized,
    record_schedule_advance_failure, record_template_outcome,
};
pub use runner::spawn_periodic_runner;
pub use schedule::{due_date, next_occurrence};
pub use scheduler::Scheduler;
pub use store::{ClientDirectory, InvoiceStore, TemplateStore};
