//! Recurring Service - materializes recurring invoice templates into invoices.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
