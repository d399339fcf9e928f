//! Batch runner that materializes due recurring templates into invoices.

use crate::models::{
    invoice_number, BatchReport, Materialization, NewInvoice, RunTrigger, ScheduledTemplate,
    SkipReason, TemplateOutcome, TemplateRecord,
};
use crate::services::metrics::{
    record_batch_run, record_invoice_materialized, record_schedule_advance_failure,
    record_template_outcome,
};
use crate::services::schedule::{due_date, next_occurrence};
use crate::services::store::{ClientDirectory, InvoiceStore, TemplateStore};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Recurring invoice scheduler.
///
/// Templates are processed one at a time and a failure on one template never
/// stops the rest of the batch. Only a failure to enumerate templates fails
/// the run as a whole.
pub struct Scheduler {
    templates: Arc<dyn TemplateStore>,
    clients: Arc<dyn ClientDirectory>,
    invoices: Arc<dyn InvoiceStore>,
    // Held for a whole batch: overlapping runs would both see the same
    // pre-advance next_invoice_date and invoice the same cycle twice.
    run_lock: Mutex<()>,
}

impl Scheduler {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        clients: Arc<dyn ClientDirectory>,
        invoices: Arc<dyn InvoiceStore>,
    ) -> Self {
        Self {
            templates,
            clients,
            invoices,
            run_lock: Mutex::new(()),
        }
    }

    /// Readiness of the template store.
    pub async fn health_check(&self) -> Result<(), AppError> {
        self.templates.health_check().await
    }

    /// Run a batch for the current UTC date.
    pub async fn run_batch(&self, trigger: RunTrigger) -> Result<BatchReport, AppError> {
        self.run_batch_on(Utc::now().date_naive(), trigger).await
    }

    /// Run a batch treating `today` as the run date.
    #[instrument(skip_all, fields(trigger = trigger.as_str(), run_date = %today))]
    pub async fn run_batch_on(
        &self,
        today: NaiveDate,
        trigger: RunTrigger,
    ) -> Result<BatchReport, AppError> {
        let _guard = self.run_lock.lock().await;
        let start = Instant::now();

        let records = match self.templates.read_all_templates().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to load templates, aborting batch run");
                record_batch_run(trigger.as_str(), "failed", start.elapsed().as_secs_f64());
                return Err(e);
            }
        };

        info!(templates = records.len(), "Starting batch run");

        let mut outcomes = Vec::with_capacity(records.len());
        for record in &records {
            let result = self.process_template(record, today).await;
            log_outcome(record.id, &result);
            outcomes.push(TemplateOutcome {
                template_id: record.id,
                result,
            });
        }

        let report = BatchReport {
            run_date: today,
            trigger,
            outcomes,
        };

        info!(
            processed = report.processed(),
            skipped = report.skipped(),
            unadvanced = report.unadvanced(),
            templates = records.len(),
            "Batch run completed"
        );
        record_batch_run(trigger.as_str(), "completed", start.elapsed().as_secs_f64());

        Ok(report)
    }

    /// Validated, active templates due on or before `today`. Read only.
    pub async fn due_templates(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledTemplate>, AppError> {
        let records = self.templates.read_all_templates().await?;
        Ok(records
            .iter()
            .filter(|r| r.is_active())
            .filter_map(|r| ScheduledTemplate::try_from(r).ok())
            .filter(|t| t.is_due(today))
            .collect())
    }

    async fn process_template(
        &self,
        record: &TemplateRecord,
        today: NaiveDate,
    ) -> Result<Materialization, SkipReason> {
        if !record.is_active() {
            return Err(SkipReason::Inactive);
        }

        let template = ScheduledTemplate::try_from(record)?;
        if !template.is_due(today) {
            return Err(SkipReason::NotDue(template.next_invoice_date));
        }

        let client = self
            .clients
            .read_client(template.client_id)
            .await
            .map_err(|e| SkipReason::ClientLookupFailed(e.to_string()))?
            .ok_or(SkipReason::ClientNotFound(template.client_id))?;

        let existing = self
            .invoices
            .count_invoices()
            .await
            .map_err(|e| SkipReason::InvoiceCountFailed(e.to_string()))?;
        let number = invoice_number(existing);

        let due = due_date(template.payment_terms, today).ok_or(SkipReason::DateOutOfRange)?;
        let snapshot = client.snapshot();

        if template.client_id <= 0 {
            return Err(SkipReason::InvalidClientId(template.client_id));
        }
        if template.amount <= Decimal::ZERO {
            return Err(SkipReason::InvalidAmount(template.amount));
        }

        // Anchored on the previous scheduled date, never on the run date.
        let next = next_occurrence(template.frequency, template.next_invoice_date)
            .ok_or(SkipReason::DateOutOfRange)?;

        let invoice = NewInvoice::from_template(&template, snapshot, number, today, due);
        let invoice_id = self
            .invoices
            .insert_invoice(&invoice)
            .await
            .map_err(|e| SkipReason::InsertFailed(e.to_string()))?;

        let next_invoice_date = match self
            .templates
            .update_template_next_date(template.id, next)
            .await
        {
            Ok(()) => Some(next),
            Err(e) => {
                error!(
                    template_id = template.id,
                    invoice_number = %invoice.invoice_number,
                    error = %e,
                    "Invoice created but schedule not advanced; template will be due again next run"
                );
                record_schedule_advance_failure();
                None
            }
        };

        Ok(Materialization {
            invoice_id,
            invoice_number: invoice.invoice_number,
            due_date: due,
            next_invoice_date,
        })
    }
}

fn log_outcome(template_id: i64, result: &Result<Materialization, SkipReason>) {
    match result {
        Ok(m) => {
            record_invoice_materialized();
            record_template_outcome("materialized");
            info!(
                template_id,
                invoice_id = m.invoice_id,
                invoice_number = %m.invoice_number,
                due_date = %m.due_date,
                next_invoice_date = ?m.next_invoice_date,
                "Recurring invoice created"
            );
        }
        Err(reason) => {
            record_template_outcome(reason.label());
            let message = skip_message(reason);
            match reason {
                SkipReason::NotDue(_) | SkipReason::Inactive => {
                    debug!(template_id, reason = %reason, "{}", message)
                }
                SkipReason::InsertFailed(_) => error!(template_id, reason = %reason, "{}", message),
                _ => warn!(template_id, reason = %reason, "{}", message),
            }
        }
    }
}

fn skip_message(reason: &SkipReason) -> &'static str {
    match reason {
        SkipReason::NotDue(_) => "Template not due",
        SkipReason::Inactive => "Template inactive",
        _ => "Skipping template",
    }
}
