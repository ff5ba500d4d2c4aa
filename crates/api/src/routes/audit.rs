//! Audit trail routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::{AppState, middleware::AuthUser};
use tally_db::HistoryRepository;

/// Creates the audit routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/audit/summary", get(audit_summary))
}

/// Query parameters for the audit summary.
#[derive(Debug, Deserialize)]
pub struct AuditSummaryQuery {
    /// Start of the booking-date range (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// End of the booking-date range (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
}

/// GET `/audit/summary` - Aggregates over the user's audit trail.
async fn audit_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<AuditSummaryQuery>,
) -> impl IntoResponse {
    let repo = HistoryRepository::new((*state.db).clone());

    match repo
        .audit_summary(auth.user_id(), query.from, query.to)
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!(error = %e, "Audit summary failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred"
                })),
            )
                .into_response()
        }
    }
}
