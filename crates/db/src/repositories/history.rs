//! Transaction history: the append-only audit trail.
//!
//! Writes happen exclusively through [`record`], inside the caller's
//! database transaction, so a history row exists iff the mutation it
//! documents committed. A database trigger rejects UPDATE and DELETE on
//! the table, so the write side here is insert-only by construction.

use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::{
    sea_orm_active_enums::HistoryAction, transaction_history, transactions,
};

/// Appends one audit row snapshotting the transaction after `action`.
///
/// Must run inside the same database transaction as the mutation itself.
/// `reason` is set for delete actions only.
pub(crate) async fn record(
    txn: &DatabaseTransaction,
    transaction: &transactions::Model,
    action: HistoryAction,
    reason: Option<&str>,
) -> Result<transaction_history::Model, DbErr> {
    let row = transaction_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        transaction_id: Set(transaction.id),
        user_id: Set(transaction.user_id),
        action: Set(action),
        kind: Set(transaction.kind.clone()),
        amount: Set(transaction.amount),
        currency: Set(transaction.currency.clone()),
        converted_amount: Set(transaction.converted_amount),
        exchange_rate: Set(transaction.exchange_rate),
        account_id: Set(transaction.account_id),
        destination_account_id: Set(transaction.destination_account_id),
        category: Set(transaction.category.clone()),
        description: Set(transaction.description.clone()),
        transaction_date: Set(transaction.transaction_date),
        reason: Set(reason.map(ToString::to_string)),
        recorded_at: Set(chrono::Utc::now().into()),
    };

    row.insert(txn).await
}

/// Count of deletions sharing one reason.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReasonCount {
    /// The recorded deletion reason.
    pub reason: String,
    /// How many deletions carried it.
    pub count: u64,
}

/// Edit count for a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EditCount {
    /// The edited transaction.
    pub transaction_id: Uuid,
    /// How many edit actions were recorded for it.
    pub count: u64,
}

/// Aggregates over the audit trail for one user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AuditSummary {
    /// Delete actions in range.
    pub deleted_count: u64,
    /// Deletion reasons with their frequencies, most common first.
    pub deletion_reasons: Vec<ReasonCount>,
    /// Edit actions in range.
    pub edit_count: u64,
    /// Most-edited transactions, at most five.
    pub most_edited: Vec<EditCount>,
}

/// How many most-edited transactions the summary reports.
const MOST_EDITED_LIMIT: usize = 5;

/// Read side of the audit trail.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    db: DatabaseConnection,
}

impl HistoryRepository {
    /// Creates a new history repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Summarizes a user's audit trail over an optional booking-date range.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn audit_summary(
        &self,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AuditSummary, DbErr> {
        let mut query = transaction_history::Entity::find()
            .filter(transaction_history::Column::UserId.eq(user_id));

        if let Some(from) = from {
            query = query.filter(transaction_history::Column::TransactionDate.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(transaction_history::Column::TransactionDate.lte(to));
        }

        let rows = query.all(&self.db).await?;
        Ok(summarize(&rows))
    }
}

/// Folds history rows into the summary aggregates.
fn summarize(rows: &[transaction_history::Model]) -> AuditSummary {
    let mut deleted_count = 0u64;
    let mut edit_count = 0u64;
    let mut reasons: HashMap<String, u64> = HashMap::new();
    let mut edits_per_transaction: HashMap<Uuid, u64> = HashMap::new();

    for row in rows {
        match row.action {
            HistoryAction::Delete => {
                deleted_count += 1;
                if let Some(reason) = &row.reason {
                    *reasons.entry(reason.clone()).or_insert(0) += 1;
                }
            }
            HistoryAction::Edit => {
                edit_count += 1;
                *edits_per_transaction.entry(row.transaction_id).or_insert(0) += 1;
            }
            HistoryAction::Create | HistoryAction::Restore => {}
        }
    }

    let mut deletion_reasons: Vec<ReasonCount> = reasons
        .into_iter()
        .map(|(reason, count)| ReasonCount { reason, count })
        .collect();
    deletion_reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));

    let mut most_edited: Vec<EditCount> = edits_per_transaction
        .into_iter()
        .map(|(transaction_id, count)| EditCount {
            transaction_id,
            count,
        })
        .collect();
    most_edited.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.transaction_id.cmp(&b.transaction_id))
    });
    most_edited.truncate(MOST_EDITED_LIMIT);

    AuditSummary {
        deleted_count,
        deletion_reasons,
        edit_count,
        most_edited,
    }
}
