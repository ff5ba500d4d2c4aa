//! `SeaORM` Entity for the transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::TransactionKind;
use tally_core::ledger::EffectDescriptor;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    /// Positive amount in the source account's currency.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub currency: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub converted_amount: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 8)))", nullable)]
    pub exchange_rate: Option<Decimal>,
    pub account_id: Option<Uuid>,
    pub destination_account_id: Option<Uuid>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub transaction_date: Date,
    /// Soft-delete marker. Null means the transaction is active and its
    /// effect is applied to account balances.
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub deleted_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Extracts the persisted effect descriptor.
    ///
    /// Reversals must be computed from this, never from an incoming
    /// request.
    #[must_use]
    pub fn descriptor(&self) -> EffectDescriptor {
        EffectDescriptor {
            kind: self.kind.clone().into(),
            amount: self.amount,
            currency: self.currency.clone(),
            converted_amount: self.converted_amount,
            exchange_rate: self.exchange_rate,
            account_id: self.account_id,
            destination_account_id: self.destination_account_id,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
    #[sea_orm(has_many = "super::transaction_history::Entity")]
    TransactionHistory,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::transaction_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
