//! Database service for recurring-service.

use crate::models::{Client, NewInvoice, TemplateRecord};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{ClientDirectory, InvoiceStore, TemplateStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "recurring-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }
}

#[async_trait]
impl TemplateStore for Database {
    /// Load every template. `next_invoice_date` is read as text so a corrupted
    /// value surfaces as a per-template skip rather than a failed query.
    #[instrument(skip(self))]
    async fn read_all_templates(&self) -> Result<Vec<TemplateRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["read_all_templates"])
            .start_timer();

        let templates = sqlx::query_as::<_, TemplateRecord>(
            r#"
            SELECT id, client_id, amount, frequency, payment_terms,
                   next_invoice_date::text AS next_invoice_date, is_active, line_items,
                   tax_amount, shipping_amount, notes
            FROM templates
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to read templates: {}", e)))?;

        timer.observe_duration();

        Ok(templates)
    }

    #[instrument(skip(self), fields(template_id = %template_id))]
    async fn update_template_next_date(
        &self,
        template_id: i64,
        next_invoice_date: NaiveDate,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_template_next_date"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE templates
            SET next_invoice_date = $2
            WHERE id = $1
            "#,
        )
        .bind(template_id)
        .bind(next_invoice_date)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to advance template schedule: {}", e))
        })?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Template {} not found",
                template_id
            )));
        }

        Ok(())
    }

    /// Check database health.
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }
}

#[async_trait]
impl ClientDirectory for Database {
    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn read_client(&self, client_id: i64) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["read_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, name, email, phone, address, city, state, zip_code, country
            FROM clients
            WHERE id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to read client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }
}

#[async_trait]
impl InvoiceStore for Database {
    #[instrument(skip(self))]
    async fn count_invoices(&self) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_invoices"])
            .start_timer();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e))
            })?;

        timer.observe_duration();

        Ok(count)
    }

    #[instrument(skip(self, invoice), fields(template_id = %invoice.template_id, invoice_number = %invoice.invoice_number))]
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        let invoice_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (invoice_number, template_id, client_id, client_name, client_email, client_phone, client_address, amount, tax_amount, shipping_amount, status, issue_date, due_date, line_items, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING id
            "#,
        )
        .bind(&invoice.invoice_number)
        .bind(invoice.template_id)
        .bind(invoice.client_id)
        .bind(&invoice.client_name)
        .bind(&invoice.client_email)
        .bind(&invoice.client_phone)
        .bind(&invoice.client_address)
        .bind(invoice.amount)
        .bind(invoice.tax_amount)
        .bind(invoice.shipping_amount)
        .bind(invoice.status.as_str())
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(&invoice.line_items)
        .bind(&invoice.notes)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert invoice: {}", e)))?;

        timer.observe_duration();
        info!(invoice_id = invoice_id, "Invoice inserted");

        Ok(invoice_id)
    }
}
