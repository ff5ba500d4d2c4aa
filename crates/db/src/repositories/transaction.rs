//! Transaction repository: the mutation orchestrator.
//!
//! Every mutating method runs the reverse → validate → apply pipeline from
//! `tally-core` inside one database transaction, together with the history
//! insert. If the plan is rejected the transaction is dropped unbegun, so
//! no balance, row, or history write survives a failed mutation.

use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use tally_core::ledger::{
    plan_create, plan_delete, plan_edit, plan_restore, BalanceDelta, BalanceView,
    EffectDescriptor, InsufficientFunds, LedgerError, LifecycleState, TransactionKind,
};

use crate::entities::{accounts, sea_orm_active_enums::HistoryAction, transactions};

use super::history;

/// Reason recorded when a delete request carries none.
const DEFAULT_DELETE_REASON: &str = "Deleted by user";

/// Error types for transaction mutations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Transaction not found (or not in the lifecycle state the operation
    /// requires: mutations want active rows, restore wants deleted ones).
    #[error("Transaction not found: {0}")]
    NotFound(Uuid),

    /// Account not found for this user.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Account exists but is deactivated.
    #[error("Account is inactive: {0}")]
    AccountInactive(Uuid),

    /// The mutation would drive a balance below zero.
    #[error("Insufficient funds: short by {}", .0.shortfall)]
    Rejected(InsufficientFunds),

    /// Malformed effect descriptor.
    #[error(transparent)]
    InvalidInput(LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<LedgerError> for TransactionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds(details) => Self::Rejected(details),
            LedgerError::AccountNotFound(id) => Self::AccountNotFound(id),
            other => Self::InvalidInput(other),
        }
    }
}

/// Input for creating or editing a transaction.
///
/// Edits take the full replacement state, not a patch: the stored row is
/// reversed and this input's effect applied in its place.
#[derive(Debug, Clone)]
pub struct TransactionInput {
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Positive amount in the source currency.
    pub amount: rust_decimal::Decimal,
    /// ISO 4217 currency code of the amount.
    pub currency: String,
    /// Destination-currency amount, conversions only.
    pub converted_amount: Option<rust_decimal::Decimal>,
    /// Rate used to derive `converted_amount`, conversions only.
    pub exchange_rate: Option<rust_decimal::Decimal>,
    /// Source account (debited side, or credited for income).
    pub account_id: Option<Uuid>,
    /// Destination account, transfers and conversions only.
    pub destination_account_id: Option<Uuid>,
    /// Optional category label.
    pub category: Option<String>,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Date the transaction is booked on.
    pub transaction_date: NaiveDate,
}

impl TransactionInput {
    /// The effect descriptor this input describes.
    #[must_use]
    pub fn descriptor(&self) -> EffectDescriptor {
        EffectDescriptor {
            kind: self.kind,
            amount: self.amount,
            currency: self.currency.clone(),
            converted_amount: self.converted_amount,
            exchange_rate: self.exchange_rate,
            account_id: self.account_id,
            destination_account_id: self.destination_account_id,
        }
    }
}

/// Filter options for listing active transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Filter by transaction kind.
    pub kind: Option<TransactionKind>,
    /// Filter by date range start (inclusive).
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end (inclusive).
    pub date_to: Option<NaiveDate>,
}

/// Transaction repository for lifecycle mutations and queries.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a transaction and applies its balance effect.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` if the source debit exceeds the available
    /// balance, `AccountNotFound`/`AccountInactive` for bad account
    /// references, `InvalidInput` for a malformed descriptor, or a
    /// database error.
    pub async fn create_transaction(
        &self,
        user_id: Uuid,
        input: TransactionInput,
    ) -> Result<transactions::Model, TransactionError> {
        let descriptor = input.descriptor();

        let txn = self.db.begin().await?;

        let involved = self
            .load_accounts(&txn, user_id, descriptor_accounts(&[&descriptor]), true)
            .await?;
        let plan = plan_create(&balance_view(&involved), &descriptor)?;

        apply_deltas(&txn, &involved, &plan.deltas).await?;
        let model = insert_transaction(&txn, user_id, &input).await?;
        history::record(&txn, &model, HistoryAction::Create, None).await?;

        txn.commit().await?;
        Ok(model)
    }

    /// Edits an active transaction: reverses the stored effect, validates
    /// the new one against the post-reversal balance, applies both as one
    /// merged delta set.
    ///
    /// # Errors
    ///
    /// `NotFound` if the transaction does not exist or is deleted;
    /// otherwise the same taxonomy as [`Self::create_transaction`].
    pub async fn edit_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        input: TransactionInput,
    ) -> Result<transactions::Model, TransactionError> {
        let txn = self.db.begin().await?;

        let current = find_active(&txn, user_id, transaction_id).await?;
        let stored = current.descriptor();
        let new = input.descriptor();

        let involved = self
            .load_accounts(&txn, user_id, descriptor_accounts(&[&stored, &new]), true)
            .await?;
        let plan = plan_edit(&balance_view(&involved), &stored, &new)?;

        apply_deltas(&txn, &involved, &plan.deltas).await?;

        let now = Utc::now().into();
        let mut active: transactions::ActiveModel = current.into();
        active.kind = Set(input.kind.into());
        active.amount = Set(input.amount);
        active.currency = Set(input.currency.clone());
        active.converted_amount = Set(input.converted_amount);
        active.exchange_rate = Set(input.exchange_rate);
        active.account_id = Set(input.account_id);
        active.destination_account_id = Set(input.destination_account_id);
        active.category = Set(input.category.clone());
        active.description = Set(input.description.clone());
        active.transaction_date = Set(input.transaction_date);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        history::record(&txn, &updated, HistoryAction::Edit, None).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Soft-deletes an active transaction, reversing its stored effect.
    ///
    /// Never rejected for balance reasons: reversal of a debit only
    /// credits, and blocking the reversal of a credit would trap the user.
    ///
    /// # Errors
    ///
    /// `NotFound` if the transaction does not exist or is already deleted.
    pub async fn delete_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        reason: Option<String>,
    ) -> Result<transactions::Model, TransactionError> {
        let txn = self.db.begin().await?;

        let current = find_active(&txn, user_id, transaction_id).await?;
        let stored = current.descriptor();

        let involved = self
            .load_accounts(&txn, user_id, descriptor_accounts(&[&stored]), false)
            .await?;
        let plan = plan_delete(&stored);

        apply_deltas(&txn, &involved, &plan.deltas).await?;

        let reason = reason.unwrap_or_else(|| DEFAULT_DELETE_REASON.to_string());
        let now = Utc::now().into();
        let mut active: transactions::ActiveModel = current.into();
        active.deleted_at = Set(Some(now));
        active.deleted_reason = Set(Some(reason.clone()));
        active.updated_at = Set(now);
        let deleted = active.update(&txn).await?;

        history::record(&txn, &deleted, HistoryAction::Delete, Some(&reason)).await?;

        txn.commit().await?;
        Ok(deleted)
    }

    /// Restores a soft-deleted transaction, re-applying its stored effect.
    ///
    /// # Errors
    ///
    /// `NotFound` if the transaction does not exist or is not deleted;
    /// `Rejected` if the balance has drifted below the stored debit since
    /// deletion, in which case the transaction stays deleted.
    pub async fn restore_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<transactions::Model, TransactionError> {
        let txn = self.db.begin().await?;

        let current = find_deleted(&txn, user_id, transaction_id).await?;
        let stored = current.descriptor();

        let involved = self
            .load_accounts(&txn, user_id, descriptor_accounts(&[&stored]), false)
            .await?;
        let plan = plan_restore(&balance_view(&involved), &stored)?;

        apply_deltas(&txn, &involved, &plan.deltas).await?;

        let now = Utc::now().into();
        let mut active: transactions::ActiveModel = current.into();
        active.deleted_at = Set(None);
        active.deleted_reason = Set(None);
        active.updated_at = Set(now);
        let restored = active.update(&txn).await?;

        history::record(&txn, &restored, HistoryAction::Restore, None).await?;

        txn.commit().await?;
        Ok(restored)
    }

    /// Fetches a single transaction in any lifecycle state.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such transaction exists for this user.
    pub async fn get_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<transactions::Model, TransactionError> {
        transactions::Entity::find_by_id(transaction_id)
            .filter(transactions::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(TransactionError::NotFound(transaction_id))
    }

    /// Lists active transactions, newest booking date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: TransactionFilter,
    ) -> Result<Vec<transactions::Model>, TransactionError> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::DeletedAt.is_null());

        if let Some(kind) = filter.kind {
            let kind: crate::entities::sea_orm_active_enums::TransactionKind = kind.into();
            query = query.filter(transactions::Column::Kind.eq(kind));
        }

        if let Some(date_from) = filter.date_from {
            query = query.filter(transactions::Column::TransactionDate.gte(date_from));
        }

        if let Some(date_to) = filter.date_to {
            query = query.filter(transactions::Column::TransactionDate.lte(date_to));
        }

        let rows = query
            .order_by_desc(transactions::Column::TransactionDate)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(rows)
    }

    /// Lists soft-deleted transactions, most recently deleted first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_trash(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<transactions::Model>, TransactionError> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::DeletedAt.is_not_null())
            .order_by_desc(transactions::Column::DeletedAt)
            .all(&self.db)
            .await?;

        Ok(rows)
    }

    /// Loads the referenced accounts for this user with `SELECT ... FOR
    /// UPDATE`, so concurrent mutations touching the same account serialize
    /// on the row lock and each validation sees the latest committed
    /// balance. The id set is ordered, so locks are always taken in
    /// ascending id order and two mutations over the same accounts cannot
    /// deadlock.
    ///
    /// Unknown accounts are always rejected. Inactive accounts are rejected
    /// only when `require_active` is set: create and edit book new activity
    /// onto an account, but delete and restore operate on activity the
    /// account already carries.
    async fn load_accounts(
        &self,
        txn: &DatabaseTransaction,
        user_id: Uuid,
        ids: BTreeSet<Uuid>,
        require_active: bool,
    ) -> Result<HashMap<Uuid, accounts::Model>, TransactionError> {
        let mut loaded = HashMap::with_capacity(ids.len());

        for id in ids {
            let account = accounts::Entity::find_by_id(id)
                .filter(accounts::Column::UserId.eq(user_id))
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(TransactionError::AccountNotFound(id))?;

            if require_active && !account.is_active {
                return Err(TransactionError::AccountInactive(id));
            }

            loaded.insert(id, account);
        }

        Ok(loaded)
    }
}

/// Collects the distinct account ids the given descriptors reference.
fn descriptor_accounts(descriptors: &[&EffectDescriptor]) -> BTreeSet<Uuid> {
    descriptors
        .iter()
        .flat_map(|d| [d.account_id, d.destination_account_id])
        .flatten()
        .collect()
}

/// Snapshots the loaded accounts' balances for the planners.
fn balance_view(accounts: &HashMap<Uuid, accounts::Model>) -> BalanceView {
    let mut view = BalanceView::new();
    for (id, account) in accounts {
        view.set(*id, account.balance);
    }
    view
}

/// Writes the planned balance changes back to the account rows.
///
/// Plans carry at most one delta per account, so each row is updated once.
async fn apply_deltas(
    txn: &DatabaseTransaction,
    accounts: &HashMap<Uuid, accounts::Model>,
    deltas: &[BalanceDelta],
) -> Result<(), TransactionError> {
    let now = Utc::now().into();

    for delta in deltas {
        let account = accounts
            .get(&delta.account_id)
            .ok_or(TransactionError::AccountNotFound(delta.account_id))?;

        let mut active: accounts::ActiveModel = account.clone().into();
        active.balance = Set(account.balance + delta.delta);
        active.updated_at = Set(now);
        active.update(txn).await?;
    }

    Ok(())
}

/// Inserts the transaction row.
async fn insert_transaction(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    input: &TransactionInput,
) -> Result<transactions::Model, TransactionError> {
    let now = Utc::now().into();

    let model = transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        kind: Set(input.kind.into()),
        amount: Set(input.amount),
        currency: Set(input.currency.clone()),
        converted_amount: Set(input.converted_amount),
        exchange_rate: Set(input.exchange_rate),
        account_id: Set(input.account_id),
        destination_account_id: Set(input.destination_account_id),
        category: Set(input.category.clone()),
        description: Set(input.description.clone()),
        transaction_date: Set(input.transaction_date),
        deleted_at: Set(None),
        deleted_reason: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let inserted = model.insert(txn).await?;
    Ok(inserted)
}

/// Finds a transaction in the lifecycle state the caller needs.
///
/// Edits and deletes require an active row; restores a deleted one. A row
/// in the wrong state is reported as `NotFound`, matching what a filtered
/// query would say.
async fn find_in_state(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    transaction_id: Uuid,
    wanted: LifecycleState,
) -> Result<transactions::Model, TransactionError> {
    let row = transactions::Entity::find_by_id(transaction_id)
        .filter(transactions::Column::UserId.eq(user_id))
        .one(txn)
        .await?
        .ok_or(TransactionError::NotFound(transaction_id))?;

    let state = LifecycleState::from_deleted_marker(row.deleted_at.as_ref());
    if state == wanted {
        Ok(row)
    } else {
        Err(TransactionError::NotFound(transaction_id))
    }
}

async fn find_active(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    transaction_id: Uuid,
) -> Result<transactions::Model, TransactionError> {
    find_in_state(txn, user_id, transaction_id, LifecycleState::Active).await
}

async fn find_deleted(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    transaction_id: Uuid,
) -> Result<transactions::Model, TransactionError> {
    find_in_state(txn, user_id, transaction_id, LifecycleState::Deleted).await
}
