//! Account balance routes.
//!
//! Accounts are managed elsewhere; the engine only exposes their current
//! balances so clients can show the effect of mutations.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser};
use tally_db::{AccountRepository, entities::accounts, repositories::account::AccountError};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/accounts/{account_id}", get(get_account))
}

/// Response for an account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: Uuid,
    /// Account name.
    pub name: String,
    /// Currency code.
    pub currency: String,
    /// Current balance as a decimal string.
    pub balance: String,
    /// Whether the account accepts new transactions.
    pub is_active: bool,
}

impl From<accounts::Model> for AccountResponse {
    fn from(a: accounts::Model) -> Self {
        Self {
            id: a.id,
            name: a.name,
            currency: a.currency,
            balance: a.balance.to_string(),
            is_active: a.is_active,
        }
    }
}

/// GET `/accounts` - List the user's accounts with balances.
async fn list_accounts(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let repo = AccountRepository::new((*state.db).clone());

    match repo.list_for_user(auth.user_id()).await {
        Ok(rows) => {
            let items: Vec<AccountResponse> =
                rows.into_iter().map(AccountResponse::from).collect();
            (StatusCode::OK, Json(json!({ "accounts": items }))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// GET `/accounts/{account_id}` - Fetch one account.
async fn get_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(account_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = AccountRepository::new((*state.db).clone());

    match repo.find_for_user(auth.user_id(), account_id).await {
        Ok(row) => (StatusCode::OK, Json(AccountResponse::from(row))).into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &AccountError) -> axum::response::Response {
    match err {
        AccountError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "account_not_found",
                "message": format!("Account not found: {id}")
            })),
        )
            .into_response(),
        AccountError::Database(e) => {
            error!(error = %e, "Account query failed");
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
