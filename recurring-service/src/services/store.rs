//! Storage collaborators consumed by the scheduler.
//!
//! The scheduler only sees these traits, so the Postgres implementation and
//! in-memory test doubles are interchangeable.

use crate::models::{Client, NewInvoice, TemplateRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Every template, active or not, in a stable order.
    async fn read_all_templates(&self) -> Result<Vec<TemplateRecord>, AppError>;

    /// Persist a template's advanced schedule. This is the only template
    /// field the engine writes.
    async fn update_template_next_date(
        &self,
        template_id: i64,
        next_invoice_date: NaiveDate,
    ) -> Result<(), AppError>;

    /// Readiness probe for the backing store.
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn read_client(&self, client_id: i64) -> Result<Option<Client>, AppError>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Total number of invoices; seeds invoice-number generation.
    async fn count_invoices(&self) -> Result<i64, AppError>;

    /// Insert an invoice and return its id.
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<i64, AppError>;
}
