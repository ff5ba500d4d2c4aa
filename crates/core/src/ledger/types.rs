//! Ledger domain types for transaction mutations.
//!
//! The central type is the [`EffectDescriptor`]: the tuple of fields that
//! fully determines a transaction's impact on account balances. A stored
//! transaction's descriptor is what gets reversed on edit and delete, and
//! re-applied on restore.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction kind classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming into an account.
    Income,
    /// Money leaving an account.
    Expense,
    /// Same-currency move between two accounts.
    Transfer,
    /// Cross-currency move between two accounts.
    Conversion,
}

impl TransactionKind {
    /// Returns true if this kind moves money between two accounts.
    #[must_use]
    pub const fn is_two_sided(self) -> bool {
        matches!(self, Self::Transfer | Self::Conversion)
    }

    /// Returns true if this kind debits its source account.
    ///
    /// Income only credits; it can never produce a negative balance on its
    /// own and is therefore exempt from balance validation.
    #[must_use]
    pub const fn debits_source(self) -> bool {
        matches!(self, Self::Expense | Self::Transfer | Self::Conversion)
    }
}

/// The fields that fully determine a transaction's effect on balances.
///
/// `amount` is always expressed in the source account's currency. For
/// conversions, `converted_amount` is the amount credited to the
/// destination account and `exchange_rate` records the rate used. The rate
/// is carried as its own field; currency codes are never overloaded to
/// smuggle numeric rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Positive amount in the source account's currency.
    pub amount: Decimal,
    /// ISO 4217 currency code of `amount`.
    pub currency: String,
    /// Destination-side amount for conversions.
    pub converted_amount: Option<Decimal>,
    /// Exchange rate in effect when the transaction was recorded.
    pub exchange_rate: Option<Decimal>,
    /// Source account. May be absent for pure income/expense entries that
    /// are logged without an account.
    pub account_id: Option<Uuid>,
    /// Destination account. Required for transfer/conversion, absent
    /// otherwise.
    pub destination_account_id: Option<Uuid>,
}

impl EffectDescriptor {
    /// Returns the amount the destination account receives.
    ///
    /// Conversions credit `converted_amount` when one was recorded and fall
    /// back to `amount` otherwise.
    #[must_use]
    pub fn effective_destination_amount(&self) -> Decimal {
        self.converted_amount.unwrap_or(self.amount)
    }

    /// Returns the source account and debit amount, if this descriptor
    /// debits a source account at all.
    #[must_use]
    pub fn source_debit(&self) -> Option<(Uuid, Decimal)> {
        if self.kind.debits_source() {
            self.account_id.map(|id| (id, self.amount))
        } else {
            None
        }
    }
}

/// A signed balance change against a single account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    /// The account affected.
    pub account_id: Uuid,
    /// The signed change to apply to its balance.
    pub delta: Decimal,
}

impl BalanceDelta {
    /// Creates a new balance delta.
    #[must_use]
    pub const fn new(account_id: Uuid, delta: Decimal) -> Self {
        Self { account_id, delta }
    }

    /// Returns the negation of this delta.
    #[must_use]
    pub fn negate(self) -> Self {
        Self {
            account_id: self.account_id,
            delta: -self.delta,
        }
    }
}

/// Lifecycle state of a transaction, derived from its soft-delete marker.
///
/// Both states are reachable from each other indefinitely; there is no
/// terminal state short of a hard delete, which this engine never performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// The transaction's effect is applied to account balances.
    Active,
    /// Soft-deleted; its effect has been reversed out.
    Deleted,
}

impl LifecycleState {
    /// Derives the state from a `deleted_at` marker.
    #[must_use]
    pub const fn from_deleted_marker<T>(deleted_at: Option<&T>) -> Self {
        match deleted_at {
            None => Self::Active,
            Some(_) => Self::Deleted,
        }
    }

    /// Returns true if the transaction can be edited or deleted.
    #[must_use]
    pub const fn can_mutate(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns true if the transaction can be restored.
    #[must_use]
    pub const fn can_restore(self) -> bool {
        matches!(self, Self::Deleted)
    }
}
