//! Transaction lifecycle routes: create, edit, soft delete, restore.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::{error, info};
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser};
use tally_core::currency::convert_amount;
use tally_core::ledger::TransactionKind;
use tally_db::{
    AccountRepository, TransactionRepository,
    entities::transactions,
    repositories::account::AccountError,
    repositories::transaction::{TransactionError, TransactionFilter, TransactionInput},
};

/// Scale used for computed converted amounts, matching the balance columns.
const BALANCE_SCALE: u32 = 4;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions", post(create_transaction))
        .route("/transactions/trash", get(list_trash))
        .route("/transactions/{transaction_id}", get(get_transaction))
        .route("/transactions/{transaction_id}", put(edit_transaction))
        .route("/transactions/{transaction_id}", delete(delete_transaction))
        .route(
            "/transactions/{transaction_id}/restore",
            post(restore_transaction),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by transaction kind.
    pub kind: Option<String>,
    /// Filter by date range start (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Filter by date range end (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
}

/// Request body for creating or replacing a transaction.
///
/// Amounts travel as decimal strings so client float formatting can never
/// corrupt them.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    /// Transaction kind: income, expense, transfer, or conversion.
    pub kind: String,
    /// Amount in the source currency (positive decimal string).
    pub amount: String,
    /// ISO 4217 currency code of the amount.
    pub currency: String,
    /// Destination amount, conversions only. Computed from the current
    /// exchange rate when omitted.
    pub converted_amount: Option<String>,
    /// Exchange rate, conversions only. Fetched when omitted.
    pub exchange_rate: Option<String>,
    /// Source account.
    pub account_id: Option<Uuid>,
    /// Destination account, transfers and conversions.
    pub destination_account_id: Option<Uuid>,
    /// Optional category label.
    pub category: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Booking date (YYYY-MM-DD).
    pub transaction_date: NaiveDate,
}

/// Request body for deleting a transaction.
#[derive(Debug, Deserialize, Default)]
pub struct DeleteTransactionRequest {
    /// Why the transaction is being deleted.
    pub reason: Option<String>,
}

/// Response for a transaction.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: Uuid,
    /// Transaction kind.
    pub kind: String,
    /// Amount as a decimal string.
    pub amount: String,
    /// Currency code.
    pub currency: String,
    /// Converted amount, conversions only.
    pub converted_amount: Option<String>,
    /// Exchange rate, conversions only.
    pub exchange_rate: Option<String>,
    /// Source account.
    pub account_id: Option<Uuid>,
    /// Destination account.
    pub destination_account_id: Option<Uuid>,
    /// Category label.
    pub category: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Booking date.
    pub transaction_date: String,
    /// Soft-delete timestamp, if deleted.
    pub deleted_at: Option<String>,
    /// Deletion reason, if deleted.
    pub deleted_reason: Option<String>,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

impl From<transactions::Model> for TransactionResponse {
    fn from(t: transactions::Model) -> Self {
        Self {
            id: t.id,
            kind: kind_to_string(t.kind.into()).to_string(),
            amount: t.amount.to_string(),
            currency: t.currency,
            converted_amount: t.converted_amount.map(|a| a.to_string()),
            exchange_rate: t.exchange_rate.map(|r| r.to_string()),
            account_id: t.account_id,
            destination_account_id: t.destination_account_id,
            category: t.category,
            description: t.description,
            transaction_date: t.transaction_date.to_string(),
            deleted_at: t.deleted_at.map(|d| d.to_rfc3339()),
            deleted_reason: t.deleted_reason,
            created_at: t.created_at.to_rfc3339(),
            updated_at: t.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/transactions` - List active transactions.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> impl IntoResponse {
    let kind = match query.kind.as_deref().map(string_to_kind) {
        Some(None) => return invalid_kind_response(),
        Some(parsed) => parsed,
        None => None,
    };

    let repo = TransactionRepository::new((*state.db).clone());
    let filter = TransactionFilter {
        kind,
        date_from: query.from,
        date_to: query.to,
    };

    match repo.list_transactions(auth.user_id(), filter).await {
        Ok(rows) => {
            let items: Vec<TransactionResponse> =
                rows.into_iter().map(TransactionResponse::from).collect();
            (StatusCode::OK, Json(json!({ "transactions": items }))).into_response()
        }
        Err(e) => transaction_error_response(&e, false),
    }
}

/// GET `/transactions/trash` - List soft-deleted transactions.
async fn list_trash(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let repo = TransactionRepository::new((*state.db).clone());

    match repo.list_trash(auth.user_id()).await {
        Ok(rows) => {
            let items: Vec<TransactionResponse> =
                rows.into_iter().map(TransactionResponse::from).collect();
            (StatusCode::OK, Json(json!({ "transactions": items }))).into_response()
        }
        Err(e) => transaction_error_response(&e, false),
    }
}

/// GET `/transactions/{transaction_id}` - Fetch one transaction.
async fn get_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = TransactionRepository::new((*state.db).clone());

    match repo.get_transaction(auth.user_id(), transaction_id).await {
        Ok(row) => (StatusCode::OK, Json(TransactionResponse::from(row))).into_response(),
        Err(e) => transaction_error_response(&e, false),
    }
}

/// POST `/transactions` - Create a transaction.
async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TransactionRequest>,
) -> impl IntoResponse {
    let input = match build_input(&state, auth.user_id(), payload).await {
        Ok(input) => input,
        Err(response) => return response,
    };

    let repo = TransactionRepository::new((*state.db).clone());
    match repo.create_transaction(auth.user_id(), input).await {
        Ok(row) => {
            info!(user_id = %auth.user_id(), transaction_id = %row.id, "Transaction created");
            (StatusCode::CREATED, Json(TransactionResponse::from(row))).into_response()
        }
        Err(e) => transaction_error_response(&e, false),
    }
}

/// PUT `/transactions/{transaction_id}` - Replace a transaction's state.
async fn edit_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<TransactionRequest>,
) -> impl IntoResponse {
    let input = match build_input(&state, auth.user_id(), payload).await {
        Ok(input) => input,
        Err(response) => return response,
    };

    let repo = TransactionRepository::new((*state.db).clone());
    match repo
        .edit_transaction(auth.user_id(), transaction_id, input)
        .await
    {
        Ok(row) => {
            info!(user_id = %auth.user_id(), transaction_id = %row.id, "Transaction edited");
            (StatusCode::OK, Json(TransactionResponse::from(row))).into_response()
        }
        Err(e) => transaction_error_response(&e, false),
    }
}

/// DELETE `/transactions/{transaction_id}` - Soft delete.
async fn delete_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
    payload: Option<Json<DeleteTransactionRequest>>,
) -> impl IntoResponse {
    let reason = payload.and_then(|Json(body)| body.reason);

    let repo = TransactionRepository::new((*state.db).clone());
    match repo
        .delete_transaction(auth.user_id(), transaction_id, reason)
        .await
    {
        Ok(row) => {
            info!(user_id = %auth.user_id(), transaction_id = %row.id, "Transaction deleted");
            (StatusCode::OK, Json(TransactionResponse::from(row))).into_response()
        }
        Err(e) => transaction_error_response(&e, false),
    }
}

/// POST `/transactions/{transaction_id}/restore` - Undo a soft delete.
async fn restore_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = TransactionRepository::new((*state.db).clone());
    match repo
        .restore_transaction(auth.user_id(), transaction_id)
        .await
    {
        Ok(row) => {
            info!(user_id = %auth.user_id(), transaction_id = %row.id, "Transaction restored");
            (StatusCode::OK, Json(TransactionResponse::from(row))).into_response()
        }
        Err(e) => transaction_error_response(&e, true),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses the request into a repository input, resolving the exchange rate
/// for conversions that did not supply one.
async fn build_input(
    state: &AppState,
    user_id: Uuid,
    payload: TransactionRequest,
) -> Result<TransactionInput, Response> {
    let Some(kind) = string_to_kind(&payload.kind) else {
        return Err(invalid_kind_response());
    };

    let amount = parse_amount(&payload.amount, "amount")?;
    let mut converted_amount = payload
        .converted_amount
        .as_deref()
        .map(|a| parse_amount(a, "converted_amount"))
        .transpose()?;
    let mut exchange_rate = payload
        .exchange_rate
        .as_deref()
        .map(|r| parse_amount(r, "exchange_rate"))
        .transpose()?;

    // Conversions without explicit figures get the current market rate.
    // This happens before the mutation's atomic unit opens.
    if kind == TransactionKind::Conversion && (converted_amount.is_none() || exchange_rate.is_none())
    {
        let (source_id, destination_id) = match (payload.account_id, payload.destination_account_id)
        {
            (Some(s), Some(d)) => (s, d),
            _ => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_transaction",
                        "message": "Conversion requires both account_id and destination_account_id"
                    })),
                )
                    .into_response());
            }
        };

        let accounts = AccountRepository::new((*state.db).clone());
        let source = accounts
            .find_for_user(user_id, source_id)
            .await
            .map_err(account_error_response)?;
        let destination = accounts
            .find_for_user(user_id, destination_id)
            .await
            .map_err(account_error_response)?;

        let rate = match exchange_rate {
            Some(rate) => rate,
            None => {
                state
                    .rates
                    .rate(&source.currency, &destination.currency)
                    .await
                    .rate
            }
        };
        exchange_rate = Some(rate);
        if converted_amount.is_none() {
            converted_amount = Some(convert_amount(amount, rate, BALANCE_SCALE));
        }
    }

    Ok(TransactionInput {
        kind,
        amount,
        currency: payload.currency,
        converted_amount,
        exchange_rate,
        account_id: payload.account_id,
        destination_account_id: payload.destination_account_id,
        category: payload.category,
        description: payload.description,
        transaction_date: payload.transaction_date,
    })
}

/// Parses a decimal string field, rejecting malformed values.
fn parse_amount(raw: &str, field: &str) -> Result<Decimal, Response> {
    Decimal::from_str(raw.trim()).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_amount",
                "message": format!("Field '{field}' is not a valid decimal")
            })),
        )
            .into_response()
    })
}

/// Maps repository errors to HTTP responses.
///
/// `restoring` switches the rejection message so clients can tell a failed
/// restore apart from a failed create or edit.
fn transaction_error_response(err: &TransactionError, restoring: bool) -> Response {
    match err {
        TransactionError::Rejected(details) => {
            let message = if restoring {
                "Cannot restore: Insufficient funds"
            } else {
                "Insufficient funds"
            };
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": message,
                    "availableBalance": details.available_balance.to_string(),
                    "attemptedAmount": details.attempted_amount.to_string(),
                    "shortfall": details.shortfall.to_string(),
                })),
            )
                .into_response()
        }
        TransactionError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "not_found",
                "message": "Transaction not found"
            })),
        )
            .into_response(),
        TransactionError::AccountNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "account_not_found",
                "message": format!("Account not found: {id}")
            })),
        )
            .into_response(),
        TransactionError::AccountInactive(id) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "account_inactive",
                "message": format!("Account is inactive: {id}")
            })),
        )
            .into_response(),
        TransactionError::InvalidInput(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_transaction",
                "message": e.to_string()
            })),
        )
            .into_response(),
        TransactionError::Database(e) => {
            error!(error = %e, "Transaction operation failed");
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

fn account_error_response(err: AccountError) -> Response {
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
            error!(error = %e, "Account lookup failed");
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

fn invalid_kind_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "invalid_kind",
            "message": "Kind must be one of: income, expense, transfer, conversion"
        })),
    )
        .into_response()
}

fn string_to_kind(s: &str) -> Option<TransactionKind> {
    match s {
        "income" => Some(TransactionKind::Income),
        "expense" => Some(TransactionKind::Expense),
        "transfer" => Some(TransactionKind::Transfer),
        "conversion" => Some(TransactionKind::Conversion),
        _ => None,
    }
}

fn kind_to_string(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Income => "income",
        TransactionKind::Expense => "expense",
        TransactionKind::Transfer => "transfer",
        TransactionKind::Conversion => "conversion",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use tally_core::ledger::InsufficientFunds;

    #[rstest]
    #[case("income", Some(TransactionKind::Income))]
    #[case("expense", Some(TransactionKind::Expense))]
    #[case("transfer", Some(TransactionKind::Transfer))]
    #[case("conversion", Some(TransactionKind::Conversion))]
    #[case("Income", None)]
    #[case("withdrawal", None)]
    fn test_string_to_kind(#[case] input: &str, #[case] expected: Option<TransactionKind>) {
        assert_eq!(string_to_kind(input), expected);
    }

    #[test]
    fn test_kind_round_trips_through_strings() {
        for kind in [
            TransactionKind::Income,
            TransactionKind::Expense,
            TransactionKind::Transfer,
            TransactionKind::Conversion,
        ] {
            assert_eq!(string_to_kind(kind_to_string(kind)), Some(kind));
        }
    }

    #[test]
    fn test_parse_amount_accepts_decimal_strings() {
        assert_eq!(parse_amount("1500.75", "amount").unwrap(), dec!(1500.75));
        assert_eq!(parse_amount(" 10 ", "amount").unwrap(), dec!(10));
        assert!(parse_amount("1,500", "amount").is_err());
        assert!(parse_amount("abc", "amount").is_err());
    }

    #[test]
    fn test_rejection_payload_shape() {
        let err = TransactionError::Rejected(InsufficientFunds {
            available_balance: dec!(500),
            attempted_amount: dec!(750),
            shortfall: dec!(250),
        });

        let response = transaction_error_response(&err, false);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let restore = transaction_error_response(&err, true);
        assert_eq!(restore.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
