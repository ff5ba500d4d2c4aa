//! `SeaORM` entity definitions.

pub mod accounts;
pub mod sea_orm_active_enums;
pub mod transaction_history;
pub mod transactions;
pub mod users;
