//! Balance Validator and descriptor input validation.
//!
//! `check_debit` decides whether a candidate debit is allowed against an
//! account's current balance, and computes the shortfall when it is not.
//! It never mutates state; callers apply effects only after acceptance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::{EffectDescriptor, TransactionKind};

/// Structured rejection for a debit that exceeds the available balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientFunds {
    /// The account's balance before the mutation.
    pub available_balance: Decimal,
    /// The debit that was attempted.
    pub attempted_amount: Decimal,
    /// How far the attempt overshot: `attempted - available`.
    pub shortfall: Decimal,
}

impl InsufficientFunds {
    /// Builds the rejection from the pre-mutation balance and the attempt.
    #[must_use]
    pub fn new(available_balance: Decimal, attempted_amount: Decimal) -> Self {
        Self {
            available_balance,
            attempted_amount,
            shortfall: attempted_amount - available_balance,
        }
    }
}

/// Outcome of a balance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitCheck {
    /// The debit is allowed.
    Accepted,
    /// The debit would drive the balance negative.
    Rejected(InsufficientFunds),
}

impl DebitCheck {
    /// Converts the check into a `Result`, mapping rejection to
    /// [`LedgerError::InsufficientFunds`].
    ///
    /// # Errors
    ///
    /// Returns the structured rejection when the debit was refused.
    pub fn into_result(self) -> Result<(), LedgerError> {
        match self {
            Self::Accepted => Ok(()),
            Self::Rejected(details) => Err(LedgerError::InsufficientFunds(details)),
        }
    }
}

/// Checks a candidate debit against an account's current balance.
///
/// Spending exactly the available balance is accepted; the resulting
/// balance of an accepted debit is never negative.
#[must_use]
pub fn check_debit(available_balance: Decimal, attempted_amount: Decimal) -> DebitCheck {
    if available_balance - attempted_amount < Decimal::ZERO {
        DebitCheck::Rejected(InsufficientFunds::new(available_balance, attempted_amount))
    } else {
        DebitCheck::Accepted
    }
}

/// Validates an effect descriptor's shape before any ledger interaction.
///
/// Enforced rules:
/// - amount, converted amount, and exchange rate are positive
/// - transfer/conversion carry both a source and a destination account
/// - income/expense carry no destination account
/// - source and destination accounts differ
///
/// # Errors
///
/// Returns the first violated rule; no side effects have occurred yet.
pub fn validate_descriptor(descriptor: &EffectDescriptor) -> Result<(), LedgerError> {
    if descriptor.amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount);
    }
    if matches!(descriptor.converted_amount, Some(a) if a <= Decimal::ZERO) {
        return Err(LedgerError::NonPositiveConvertedAmount);
    }
    if matches!(descriptor.exchange_rate, Some(r) if r <= Decimal::ZERO) {
        return Err(LedgerError::NonPositiveExchangeRate);
    }

    match descriptor.kind {
        TransactionKind::Income | TransactionKind::Expense => {
            if descriptor.destination_account_id.is_some() {
                return Err(LedgerError::UnexpectedDestinationAccount);
            }
        }
        TransactionKind::Transfer | TransactionKind::Conversion => {
            let Some(source) = descriptor.account_id else {
                return Err(LedgerError::MissingSourceAccount);
            };
            let Some(destination) = descriptor.destination_account_id else {
                return Err(LedgerError::MissingDestinationAccount);
            };
            if source == destination {
                return Err(LedgerError::SameAccountTransfer);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_debit_within_balance_accepted() {
        assert_eq!(check_debit(dec!(1000), dec!(200)), DebitCheck::Accepted);
    }

    #[test]
    fn test_debit_equal_to_balance_accepted() {
        // Spending exactly the available balance is valid.
        assert_eq!(check_debit(dec!(1000), dec!(1000)), DebitCheck::Accepted);
    }

    #[test]
    fn test_debit_over_balance_rejected_with_shortfall() {
        let DebitCheck::Rejected(details) = check_debit(dec!(500), dec!(750)) else {
            panic!("expected rejection");
        };
        assert_eq!(details.available_balance, dec!(500));
        assert_eq!(details.attempted_amount, dec!(750));
        assert_eq!(details.shortfall, dec!(250));
    }

    #[test]
    fn test_rejection_precision_preserved() {
        let DebitCheck::Rejected(details) = check_debit(dec!(10.25), dec!(10.26)) else {
            panic!("expected rejection");
        };
        assert_eq!(details.shortfall, dec!(0.01));
    }

    fn transfer(source: Option<Uuid>, destination: Option<Uuid>) -> EffectDescriptor {
        EffectDescriptor {
            kind: TransactionKind::Transfer,
            amount: dec!(100),
            currency: "USD".to_string(),
            converted_amount: None,
            exchange_rate: None,
            account_id: source,
            destination_account_id: destination,
        }
    }

    #[test]
    fn test_transfer_requires_both_accounts() {
        let destination = Uuid::new_v4();
        assert_eq!(
            validate_descriptor(&transfer(None, Some(destination))),
            Err(LedgerError::MissingSourceAccount)
        );
        assert_eq!(
            validate_descriptor(&transfer(Some(Uuid::new_v4()), None)),
            Err(LedgerError::MissingDestinationAccount)
        );
    }

    #[test]
    fn test_transfer_to_self_rejected() {
        let account = Uuid::new_v4();
        assert_eq!(
            validate_descriptor(&transfer(Some(account), Some(account))),
            Err(LedgerError::SameAccountTransfer)
        );
    }

    #[test]
    fn test_expense_with_destination_rejected() {
        let mut d = transfer(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        d.kind = TransactionKind::Expense;
        assert_eq!(
            validate_descriptor(&d),
            Err(LedgerError::UnexpectedDestinationAccount)
        );
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let mut d = transfer(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        d.amount = Decimal::ZERO;
        assert_eq!(validate_descriptor(&d), Err(LedgerError::NonPositiveAmount));

        d.amount = dec!(100);
        d.converted_amount = Some(dec!(-5));
        assert_eq!(
            validate_descriptor(&d),
            Err(LedgerError::NonPositiveConvertedAmount)
        );

        d.converted_amount = Some(dec!(5));
        d.exchange_rate = Some(Decimal::ZERO);
        assert_eq!(
            validate_descriptor(&d),
            Err(LedgerError::NonPositiveExchangeRate)
        );
    }

    #[test]
    fn test_valid_conversion_accepted() {
        let mut d = transfer(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        d.kind = TransactionKind::Conversion;
        d.converted_amount = Some(dec!(1500000));
        d.exchange_rate = Some(dec!(15000));
        assert!(validate_descriptor(&d).is_ok());
    }

    #[test]
    fn test_accountless_expense_accepted() {
        let mut d = transfer(None, None);
        d.kind = TransactionKind::Expense;
        assert!(validate_descriptor(&d).is_ok());
    }
}
