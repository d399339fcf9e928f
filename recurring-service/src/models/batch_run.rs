//! Batch run model: what triggered a run and what happened to each template.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What started a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    Scheduled,
    Manual,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Scheduled => "scheduled",
            RunTrigger::Manual => "manual",
        }
    }
}

/// Why a template produced no invoice in a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("template is inactive")]
    Inactive,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unparseable next_invoice_date `{0}`")]
    InvalidNextInvoiceDate(String),

    #[error("not due until {0}")]
    NotDue(NaiveDate),

    #[error("client {0} not found")]
    ClientNotFound(i64),

    #[error("client lookup failed: {0}")]
    ClientLookupFailed(String),

    #[error("could not count invoices: {0}")]
    InvoiceCountFailed(String),

    #[error("invalid client_id {0}")]
    InvalidClientId(i64),

    #[error("invalid amount {0}")]
    InvalidAmount(Decimal),

    #[error("date arithmetic out of range")]
    DateOutOfRange,

    #[error("invoice insert failed: {0}")]
    InsertFailed(String),
}

impl SkipReason {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::Inactive => "inactive",
            SkipReason::MissingField(_) => "missing_field",
            SkipReason::InvalidNextInvoiceDate(_) => "invalid_date",
            SkipReason::NotDue(_) => "not_due",
            SkipReason::ClientNotFound(_) => "client_not_found",
            SkipReason::ClientLookupFailed(_) => "client_lookup_failed",
            SkipReason::InvoiceCountFailed(_) => "invoice_count_failed",
            SkipReason::InvalidClientId(_) => "invalid_client_id",
            SkipReason::InvalidAmount(_) => "invalid_amount",
            SkipReason::DateOutOfRange => "date_out_of_range",
            SkipReason::InsertFailed(_) => "insert_failed",
        }
    }
}

/// An invoice created for one template cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialization {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub due_date: NaiveDate,
    /// `None` when the invoice was created but the schedule could not be
    /// advanced; the template stays due and will be picked up again.
    pub next_invoice_date: Option<NaiveDate>,
}

/// Result of processing a single template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOutcome {
    pub template_id: i64,
    pub result: Result<Materialization, SkipReason>,
}

/// Outcome of one batch run across the whole template set.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub run_date: NaiveDate,
    pub trigger: RunTrigger,
    pub outcomes: Vec<TemplateOutcome>,
}

impl BatchReport {
    /// Number of invoices created in this run.
    pub fn processed(&self) -> usize {
        self.materializations().count()
    }

    /// Templates skipped for any reason other than not being due yet.
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| match &o.result {
                Ok(_) | Err(SkipReason::NotDue(_)) | Err(SkipReason::Inactive) => false,
                Err(_) => true,
            })
            .count()
    }

    /// Invoices created whose template schedule was left unadvanced.
    pub fn unadvanced(&self) -> usize {
        self.materializations()
            .filter(|m| m.next_invoice_date.is_none())
            .count()
    }

    pub fn materializations(&self) -> impl Iterator<Item = &Materialization> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn outcome_for(&self, template_id: i64) -> Option<&TemplateOutcome> {
        self.outcomes.iter().find(|o| o.template_id == template_id)
    }
}
