//! Ledger error types for validation and input errors.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::validation::InsufficientFunds;

/// Errors that can occur while planning a ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation rejections ==========
    /// A debit would drive the source account's balance below zero.
    #[error(
        "Insufficient funds: available {}, attempted {}, shortfall {}",
        .0.available_balance, .0.attempted_amount, .0.shortfall
    )]
    InsufficientFunds(InsufficientFunds),

    // ========== Input errors ==========
    /// Amount must be positive.
    #[error("Amount must be positive")]
    NonPositiveAmount,

    /// Converted amount must be positive when present.
    #[error("Converted amount must be positive")]
    NonPositiveConvertedAmount,

    /// Exchange rate must be positive when present.
    #[error("Exchange rate must be positive")]
    NonPositiveExchangeRate,

    /// Transfer and conversion require a source account.
    #[error("A source account is required for this transaction kind")]
    MissingSourceAccount,

    /// Transfer and conversion require a destination account.
    #[error("A destination account is required for this transaction kind")]
    MissingDestinationAccount,

    /// Income and expense must not carry a destination account.
    #[error("A destination account is not allowed for this transaction kind")]
    UnexpectedDestinationAccount,

    /// Source and destination accounts must differ.
    #[error("Source and destination accounts must differ")]
    SameAccountTransfer,

    // ========== Account errors ==========
    /// A referenced account is missing from the balance view.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),
}

impl LedgerError {
    /// Builds the insufficient-funds rejection from its parts.
    #[must_use]
    pub fn insufficient_funds(available: Decimal, attempted: Decimal) -> Self {
        Self::InsufficientFunds(InsufficientFunds::new(available, attempted))
    }

    /// Returns true if this error is a business-rule rejection the caller
    /// can recover from by adjusting the request, as opposed to malformed
    /// input.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::InsufficientFunds(_))
    }
}
