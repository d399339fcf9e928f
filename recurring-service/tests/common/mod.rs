//! Test helper module for recurring-service integration tests.
//!
//! Provides an in-memory implementation of the storage collaborators with
//! failure injection, plus a spawned HTTP application wired to it.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use recurring_service::config::{DatabaseConfig, RecurringConfig, SchedulerConfig};
use recurring_service::models::{Client, NewInvoice, TemplateRecord};
use recurring_service::services::{ClientDirectory, InvoiceStore, Scheduler, TemplateStore};
use recurring_service::startup::Application;
use rust_decimal::Decimal;
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct StoreState {
    templates: Vec<TemplateRecord>,
    clients: HashMap<i64, Client>,
    invoices: Vec<NewInvoice>,
    fail_template_read: bool,
    yield_on_read: bool,
    fail_client_lookup_for: HashSet<i64>,
    failing_counts: usize,
    fail_insert_for: HashSet<i64>,
    fail_advance_for: HashSet<i64>,
}

/// In-memory template store, client directory and invoice store.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_template(&self, template: TemplateRecord) {
        self.state.lock().unwrap().templates.push(template);
    }

    pub fn add_client(&self, client: Client) {
        self.state.lock().unwrap().clients.insert(client.id, client);
    }

    pub fn fail_template_read(&self) {
        self.state.lock().unwrap().fail_template_read = true;
    }

    pub fn heal_template_read(&self) {
        self.state.lock().unwrap().fail_template_read = false;
    }

    /// Suspend once inside every template read so concurrent runs interleave.
    pub fn yield_on_read(&self) {
        self.state.lock().unwrap().yield_on_read = true;
    }

    pub fn fail_client_lookup_for(&self, client_id: i64) {
        self.state.lock().unwrap().fail_client_lookup_for.insert(client_id);
    }

    /// Fail the next `times` invoice counts, then recover.
    pub fn fail_count(&self, times: usize) {
        self.state.lock().unwrap().failing_counts = times;
    }

    pub fn fail_insert_for(&self, template_id: i64) {
        self.state.lock().unwrap().fail_insert_for.insert(template_id);
    }

    pub fn fail_advance_for(&self, template_id: i64) {
        self.state.lock().unwrap().fail_advance_for.insert(template_id);
    }

    pub fn heal_advance_for(&self, template_id: i64) {
        self.state.lock().unwrap().fail_advance_for.remove(&template_id);
    }

    pub fn invoices(&self) -> Vec<NewInvoice> {
        self.state.lock().unwrap().invoices.clone()
    }

    pub fn invoices_for(&self, template_id: i64) -> Vec<NewInvoice> {
        self.invoices()
            .into_iter()
            .filter(|i| i.template_id == template_id)
            .collect()
    }

    pub fn next_invoice_date(&self, template_id: i64) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .templates
            .iter()
            .find(|t| t.id == template_id)
            .and_then(|t| t.next_invoice_date.clone())
    }
}

#[async_trait]
impl TemplateStore for InMemoryStore {
    async fn read_all_templates(&self) -> Result<Vec<TemplateRecord>, AppError> {
        let (templates, yield_on_read) = {
            let state = self.state.lock().unwrap();
            if state.fail_template_read {
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "templates table unavailable"
                )));
            }
            (state.templates.clone(), state.yield_on_read)
        };
        if yield_on_read {
            tokio::task::yield_now().await;
        }
        Ok(templates)
    }

    async fn update_template_next_date(
        &self,
        template_id: i64,
        next_invoice_date: NaiveDate,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_advance_for.contains(&template_id) {
            return Err(AppError::DatabaseError(anyhow::anyhow!("update timed out")));
        }
        let template = state
            .templates
            .iter_mut()
            .find(|t| t.id == template_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;
        template.next_invoice_date = Some(next_invoice_date.format("%Y-%m-%d").to_string());
        Ok(())
    }
}

#[async_trait]
impl ClientDirectory for InMemoryStore {
    async fn read_client(&self, client_id: i64) -> Result<Option<Client>, AppError> {
        let state = self.state.lock().unwrap();
        if state.fail_client_lookup_for.contains(&client_id) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "connection reset by peer"
            )));
        }
        Ok(state.clients.get(&client_id).cloned())
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn count_invoices(&self) -> Result<i64, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_counts > 0 {
            state.failing_counts -= 1;
            return Err(AppError::DatabaseError(anyhow::anyhow!("statement timeout")));
        }
        Ok(state.invoices.len() as i64)
    }

    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<i64, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_insert_for.contains(&invoice.template_id) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "duplicate key value violates unique constraint"
            )));
        }
        state.invoices.push(invoice.clone());
        Ok(state.invoices.len() as i64)
    }
}

/// Scheduler wired to `store` for all three collaborators.
pub fn scheduler(store: &Arc<InMemoryStore>) -> Scheduler {
    Scheduler::new(store.clone(), store.clone(), store.clone())
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn money(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Active monthly, net-30 template for `client_id` due on `next_invoice_date`.
pub fn template(id: i64, client_id: i64, next_invoice_date: &str) -> TemplateRecord {
    TemplateRecord {
        id,
        client_id: Some(client_id),
        amount: Some(money("100.00")),
        frequency: Some("monthly".to_string()),
        payment_terms: Some("net_30".to_string()),
        next_invoice_date: Some(next_invoice_date.to_string()),
        is_active: Some(true),
        line_items: Some(serde_json::json!([
            { "description": "Bookkeeping retainer", "quantity": 1, "rate": "100.00" }
        ])),
        tax_amount: Some(money("8.00")),
        shipping_amount: None,
        notes: Some("Thank you for your business".to_string()),
    }
}

pub fn client(id: i64) -> Client {
    Client {
        id,
        name: format!("Client {}", id),
        email: Some(format!("billing{}@example.com", id)),
        phone: Some("555-0100".to_string()),
        address: Some("1 Main St".to_string()),
        city: Some("Springfield".to_string()),
        state: Some("IL".to_string()),
        zip_code: Some("62701".to_string()),
        country: Some("USA".to_string()),
    }
}

/// Config for a test instance on a random local port with the periodic runner off.
pub fn test_config() -> RecurringConfig {
    RecurringConfig {
        common: CoreConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        },
        service_name: "recurring-service-test".to_string(),
        service_version: "0.1.0-test".to_string(),
        log_level: "warn".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        scheduler: SchedulerConfig {
            interval_secs: 0,
            run_on_startup: false,
        },
    }
}

/// Test application wrapper for HTTP integration tests.
pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    /// Spawn a new test application on a random port backed by `store`.
    pub async fn spawn_with(store: Arc<InMemoryStore>) -> Self {
        let config = test_config();

        let app = Application::build_with_scheduler(config, Arc::new(scheduler(&store)))
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let http_address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", http_address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            http_port,
            store,
        }
    }

    pub async fn spawn() -> Self {
        Self::spawn_with(InMemoryStore::new()).await
    }
}
