//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations, hiding
//! the `SeaORM` implementation details from the rest of the application.

pub mod account;
pub mod history;
pub mod transaction;

pub use account::{AccountError, AccountRepository};
pub use history::{AuditSummary, EditCount, HistoryRepository, ReasonCount};
pub use transaction::{TransactionError, TransactionFilter, TransactionInput, TransactionRepository};
