//! Trigger and preview endpoints for recurring invoice batches.
//!
//! Responses use the `{success, data, message}` envelope; individual skip
//! reasons stay in the logs and are never returned to the caller.

use crate::models::RunTrigger;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use serde_json::json;
use service_core::middleware::RequestId;

/// Run one batch now.
pub async fn run_batch(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
) -> impl IntoResponse {
    let request_id = request_id.map(|Extension(id)| id.0).unwrap_or_default();
    tracing::info!(request_id = %request_id, "Manual batch run requested");

    match state.scheduler.run_batch(RunTrigger::Manual).await {
        Ok(report) => {
            let processed = report.processed();
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "data": {
                        "processed": processed,
                        "timestamp": Utc::now().to_rfc3339(),
                    },
                    "message": format!("Generated {} recurring invoice(s)", processed),
                })),
            )
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Manual batch run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}

/// Templates that the next run would materialize. Writes nothing.
pub async fn list_due_templates(State(state): State<AppState>) -> impl IntoResponse {
    let today = Utc::now().date_naive();

    match state.scheduler.due_templates(today).await {
        Ok(templates) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "run_date": today,
                    "templates": templates,
                },
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list due templates");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}
