//! Domain models for recurring-service.

mod batch_run;
mod client;
mod invoice;
mod template;

pub use batch_run::{BatchReport, Materialization, RunTrigger, SkipReason, TemplateOutcome};
pub use client::{Client, ClientSnapshot};
pub use invoice::{invoice_number, InvoiceStatus, NewInvoice};
pub use template::{parse_schedule_date, Frequency, PaymentTerms, ScheduledTemplate, TemplateRecord};
