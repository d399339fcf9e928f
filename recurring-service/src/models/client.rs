//! Client model and the contact snapshot copied onto invoices.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Client as stored by the CRUD layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

/// Client contact details frozen at materialization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
}

impl Client {
    /// Joins the non-blank address parts with `", "`.
    pub fn address_line(&self) -> String {
        [
            &self.address,
            &self.city,
            &self.state,
            &self.zip_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address_line(),
        }
    }
}
