//! Invoice model for materialized recurring invoices.

use crate::models::{ClientSnapshot, ScheduledTemplate};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
        }
    }
}

/// Invoice number for the `count + 1`-th invoice, e.g. `INV-00042`.
pub fn invoice_number(existing_count: i64) -> String {
    format!("INV-{:05}", existing_count + 1)
}

/// Input for inserting an invoice materialized from a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub template_id: i64,
    pub client_id: i64,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub client_address: String,
    pub amount: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub line_items: serde_json::Value,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewInvoice {
    /// Draft invoice for one cycle of `template`, issued on `issue_date`.
    pub fn from_template(
        template: &ScheduledTemplate,
        client: ClientSnapshot,
        invoice_number: String,
        issue_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            invoice_number,
            template_id: template.id,
            client_id: template.client_id,
            client_name: client.name,
            client_email: client.email,
            client_phone: client.phone,
            client_address: client.address,
            amount: template.amount,
            tax_amount: template.tax_amount,
            shipping_amount: template.shipping_amount,
            status: InvoiceStatus::Draft,
            issue_date,
            due_date,
            line_items: template.line_items.clone(),
            notes: template.notes.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}
