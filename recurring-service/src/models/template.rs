//! Recurring invoice template model.

use crate::models::SkipReason;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Recurrence interval of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }

    /// Unknown or missing values fall back to monthly.
    pub fn from_string(s: &str) -> Self {
        match s {
            "weekly" => Frequency::Weekly,
            "quarterly" => Frequency::Quarterly,
            "yearly" => Frequency::Yearly,
            _ => Frequency::Monthly,
        }
    }
}

/// Payment terms, i.e. the gap between issue date and due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    DueOnReceipt,
    Net15,
    Net30,
    Net60,
}

impl PaymentTerms {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentTerms::DueOnReceipt => "due_on_receipt",
            PaymentTerms::Net15 => "net_15",
            PaymentTerms::Net30 => "net_30",
            PaymentTerms::Net60 => "net_60",
        }
    }

    /// Unknown or missing values fall back to due on receipt.
    pub fn from_string(s: &str) -> Self {
        match s {
            "net_15" => PaymentTerms::Net15,
            "net_30" => PaymentTerms::Net30,
            "net_60" => PaymentTerms::Net60,
            _ => PaymentTerms::DueOnReceipt,
        }
    }

    /// Days between issue date and due date.
    pub fn days(&self) -> u64 {
        match self {
            PaymentTerms::DueOnReceipt => 0,
            PaymentTerms::Net15 => 15,
            PaymentTerms::Net30 => 30,
            PaymentTerms::Net60 => 60,
        }
    }
}

/// Template row as stored by the CRUD layer.
///
/// Every column is optional here; required fields are enforced when the row
/// is converted into a [`ScheduledTemplate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct TemplateRecord {
    pub id: i64,
    pub client_id: Option<i64>,
    pub amount: Option<Decimal>,
    pub frequency: Option<String>,
    pub payment_terms: Option<String>,
    pub next_invoice_date: Option<String>,
    pub is_active: Option<bool>,
    pub line_items: Option<serde_json::Value>,
    pub tax_amount: Option<Decimal>,
    pub shipping_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl TemplateRecord {
    /// Null counts as active.
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }
}

/// A template whose required scheduling fields are present and well formed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledTemplate {
    pub id: i64,
    pub client_id: i64,
    pub amount: Decimal,
    pub frequency: Frequency,
    pub payment_terms: PaymentTerms,
    pub next_invoice_date: NaiveDate,
    pub line_items: serde_json::Value,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub notes: Option<String>,
}

impl ScheduledTemplate {
    /// Due on or before `today`.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_invoice_date <= today
    }
}

impl TryFrom<&TemplateRecord> for ScheduledTemplate {
    type Error = SkipReason;

    fn try_from(record: &TemplateRecord) -> Result<Self, Self::Error> {
        let client_id = record
            .client_id
            .ok_or(SkipReason::MissingField("client_id"))?;
        let amount = record.amount.ok_or(SkipReason::MissingField("amount"))?;
        let raw_date = record
            .next_invoice_date
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SkipReason::MissingField("next_invoice_date"))?;
        let next_invoice_date = parse_schedule_date(raw_date)
            .ok_or_else(|| SkipReason::InvalidNextInvoiceDate(raw_date.to_string()))?;

        Ok(Self {
            id: record.id,
            client_id,
            amount,
            frequency: Frequency::from_string(record.frequency.as_deref().unwrap_or_default()),
            payment_terms: PaymentTerms::from_string(
                record.payment_terms.as_deref().unwrap_or_default(),
            ),
            next_invoice_date,
            line_items: record
                .line_items
                .clone()
                .unwrap_or_else(|| serde_json::Value::Array(Vec::new())),
            tax_amount: record.tax_amount.unwrap_or(Decimal::ZERO),
            shipping_amount: record.shipping_amount.unwrap_or(Decimal::ZERO),
            notes: record.notes.clone(),
        })
    }
}

/// Parse a stored schedule date, discarding any time-of-day component.
pub fn parse_schedule_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z")
                .ok()
                .map(|dt| dt.date_naive())
        })
}
