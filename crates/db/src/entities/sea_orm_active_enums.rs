//! Database enum mappings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction kind stored in the `transaction_kind` Postgres enum.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_kind")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming into an account.
    #[sea_orm(string_value = "income")]
    Income,
    /// Money leaving an account.
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Same-currency move between two accounts.
    #[sea_orm(string_value = "transfer")]
    Transfer,
    /// Cross-currency move between two accounts.
    #[sea_orm(string_value = "conversion")]
    Conversion,
}

/// Audit action stored in the `history_action` Postgres enum.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "history_action")]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    /// Initial creation.
    #[sea_orm(string_value = "create")]
    Create,
    /// Descriptor fields changed.
    #[sea_orm(string_value = "edit")]
    Edit,
    /// Soft delete.
    #[sea_orm(string_value = "delete")]
    Delete,
    /// Restore from soft delete.
    #[sea_orm(string_value = "restore")]
    Restore,
}

impl From<tally_core::ledger::TransactionKind> for TransactionKind {
    fn from(kind: tally_core::ledger::TransactionKind) -> Self {
        match kind {
            tally_core::ledger::TransactionKind::Income => Self::Income,
            tally_core::ledger::TransactionKind::Expense => Self::Expense,
            tally_core::ledger::TransactionKind::Transfer => Self::Transfer,
            tally_core::ledger::TransactionKind::Conversion => Self::Conversion,
        }
    }
}

impl From<TransactionKind> for tally_core::ledger::TransactionKind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Income => Self::Income,
            TransactionKind::Expense => Self::Expense,
            TransactionKind::Transfer => Self::Transfer,
            TransactionKind::Conversion => Self::Conversion,
        }
    }
}
