//! Account repository for balance reads scoped to the owning user.
//!
//! Account creation and settings belong to the account-management service;
//! this engine only reads accounts and mutates their balances inside the
//! transaction orchestrator.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::entities::accounts;

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account not found for this user.
    #[error("Account not found: {0}")]
    NotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Account repository for read operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an account by id, scoped to the owning user.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist or belongs to a
    /// different user.
    pub async fn find_for_user(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<accounts::Model, AccountError> {
        accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(AccountError::NotFound(account_id))
    }

    /// Lists a user's accounts with their current balances.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<accounts::Model>, AccountError> {
        let accounts = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::Name)
            .all(&self.db)
            .await?;

        Ok(accounts)
    }
}
