//! Mutation planning: the reverse → validate → apply pipeline.
//!
//! Each planner takes the balances of the accounts involved and returns
//! either the net deltas to apply or a structured error. Planners are pure;
//! the orchestrator in the db crate wraps a plan in one database
//! transaction so that "abort leaves no trace" holds structurally: if a
//! plan is rejected, nothing was written at all.
//!
//! Validation semantics per transition:
//! - **create**: validate the new descriptor's source debit against the
//!   current balance.
//! - **edit**: tentatively reverse the stored descriptor, then validate the
//!   new descriptor's debit against that post-reversal balance. The
//!   reversal and the new effect are merged into one delta set so the plan
//!   commits or aborts as a unit.
//! - **delete**: reverse the stored descriptor. Never validated: reversing
//!   a debit only credits, and reversing a credit cannot be blocked without
//!   trapping the user.
//! - **restore**: validate the stored descriptor's debit against the
//!   current balance (which may have drifted since deletion), then
//!   re-apply its effect.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use super::effect::{effect_of, reverse_of};
use super::error::LedgerError;
use super::types::{BalanceDelta, EffectDescriptor};
use super::validation::{check_debit, validate_descriptor};

/// Read-only snapshot of the balances of the accounts a mutation touches.
///
/// The orchestrator populates this from rows loaded inside the atomic unit,
/// so the snapshot reflects the most recent committed values.
#[derive(Debug, Clone, Default)]
pub struct BalanceView {
    balances: HashMap<Uuid, Decimal>,
}

impl BalanceView {
    /// Creates an empty balance view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account's current balance to the view.
    #[must_use]
    pub fn with_account(mut self, account_id: Uuid, balance: Decimal) -> Self {
        self.balances.insert(account_id, balance);
        self
    }

    /// Inserts or replaces an account's balance.
    pub fn set(&mut self, account_id: Uuid, balance: Decimal) {
        self.balances.insert(account_id, balance);
    }

    /// Returns the balance of an account.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if the account is not in the
    /// view.
    pub fn balance_of(&self, account_id: Uuid) -> Result<Decimal, LedgerError> {
        self.balances
            .get(&account_id)
            .copied()
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Applies a set of deltas, mutating the view in place.
    pub fn apply(&mut self, deltas: &[BalanceDelta]) {
        for delta in deltas {
            *self.balances.entry(delta.account_id).or_insert(Decimal::ZERO) += delta.delta;
        }
    }
}

/// The net per-account balance changes a mutation will apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPlan {
    /// One delta per affected account, zero-net accounts removed.
    pub deltas: Vec<BalanceDelta>,
}

impl MutationPlan {
    fn from_deltas(deltas: Vec<BalanceDelta>) -> Self {
        Self {
            deltas: merge_deltas(deltas),
        }
    }
}

/// Merges deltas per account, preserving first-seen order and dropping
/// accounts whose net change is zero.
fn merge_deltas(deltas: Vec<BalanceDelta>) -> Vec<BalanceDelta> {
    let mut order: Vec<Uuid> = Vec::with_capacity(deltas.len());
    let mut net: HashMap<Uuid, Decimal> = HashMap::with_capacity(deltas.len());

    for delta in deltas {
        if !net.contains_key(&delta.account_id) {
            order.push(delta.account_id);
        }
        *net.entry(delta.account_id).or_insert(Decimal::ZERO) += delta.delta;
    }

    order
        .into_iter()
        .filter_map(|account_id| {
            let delta = net[&account_id];
            (delta != Decimal::ZERO).then_some(BalanceDelta::new(account_id, delta))
        })
        .collect()
}

/// Ensures every account a delta set touches is present in the view.
fn require_accounts(balances: &BalanceView, deltas: &[BalanceDelta]) -> Result<(), LedgerError> {
    for delta in deltas {
        balances.balance_of(delta.account_id)?;
    }
    Ok(())
}

/// Plans the creation of a new transaction.
///
/// # Errors
///
/// Returns an input error for a malformed descriptor, `AccountNotFound`
/// for an unknown account, or `InsufficientFunds` if the source debit
/// exceeds the available balance.
pub fn plan_create(
    balances: &BalanceView,
    descriptor: &EffectDescriptor,
) -> Result<MutationPlan, LedgerError> {
    validate_descriptor(descriptor)?;

    let effect = effect_of(descriptor);
    require_accounts(balances, &effect)?;

    if let Some((account_id, amount)) = descriptor.source_debit() {
        check_debit(balances.balance_of(account_id)?, amount).into_result()?;
    }

    Ok(MutationPlan::from_deltas(effect))
}

/// Plans an edit of an active transaction.
///
/// The stored descriptor must be the one read from persistence before any
/// new values were written; it is what gets reversed.
///
/// # Errors
///
/// Same taxonomy as [`plan_create`]; validation runs against the balance
/// after the stored effect has been tentatively reversed.
pub fn plan_edit(
    balances: &BalanceView,
    stored: &EffectDescriptor,
    new: &EffectDescriptor,
) -> Result<MutationPlan, LedgerError> {
    validate_descriptor(new)?;

    let reversal = reverse_of(stored);
    let effect = effect_of(new);
    require_accounts(balances, &reversal)?;
    require_accounts(balances, &effect)?;

    if let Some((account_id, amount)) = new.source_debit() {
        let reversal_on_source: Decimal = reversal
            .iter()
            .filter(|d| d.account_id == account_id)
            .map(|d| d.delta)
            .sum();
        let post_reversal = balances.balance_of(account_id)? + reversal_on_source;
        check_debit(post_reversal, amount).into_result()?;
    }

    let mut deltas = reversal;
    deltas.extend(effect);
    Ok(MutationPlan::from_deltas(deltas))
}

/// Plans the soft delete of an active transaction: pure reversal.
#[must_use]
pub fn plan_delete(stored: &EffectDescriptor) -> MutationPlan {
    MutationPlan::from_deltas(reverse_of(stored))
}

/// Plans the restore of a soft-deleted transaction.
///
/// # Errors
///
/// Returns `InsufficientFunds` if the stored descriptor's source debit no
/// longer fits the current balance, or `AccountNotFound` for an unknown
/// account. On rejection the transaction stays deleted.
pub fn plan_restore(
    balances: &BalanceView,
    stored: &EffectDescriptor,
) -> Result<MutationPlan, LedgerError> {
    let effect = effect_of(stored);
    require_accounts(balances, &effect)?;

    if let Some((account_id, amount)) = stored.source_debit() {
        check_debit(balances.balance_of(account_id)?, amount).into_result()?;
    }

    Ok(MutationPlan::from_deltas(effect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::TransactionKind;
    use rust_decimal_macros::dec;

    fn expense(account: Uuid, amount: Decimal) -> EffectDescriptor {
        EffectDescriptor {
            kind: TransactionKind::Expense,
            amount,
            currency: "USD".to_string(),
            converted_amount: None,
            exchange_rate: None,
            account_id: Some(account),
            destination_account_id: None,
        }
    }

    fn transfer(source: Uuid, destination: Uuid, amount: Decimal) -> EffectDescriptor {
        EffectDescriptor {
            kind: TransactionKind::Transfer,
            amount,
            currency: "USD".to_string(),
            converted_amount: None,
            exchange_rate: None,
            account_id: Some(source),
            destination_account_id: Some(destination),
        }
    }

    // Scenario: balance 1000, expense 1000 -> accepted, balance 0.
    #[test]
    fn test_create_expense_exactly_balance() {
        let account = Uuid::new_v4();
        let mut balances = BalanceView::new().with_account(account, dec!(1000));

        let plan = plan_create(&balances, &expense(account, dec!(1000))).unwrap();
        balances.apply(&plan.deltas);

        assert_eq!(balances.balance_of(account).unwrap(), dec!(0));
    }

    // Scenario: balance 500, expense 750 -> rejected with shortfall 250.
    #[test]
    fn test_create_expense_over_balance() {
        let account = Uuid::new_v4();
        let balances = BalanceView::new().with_account(account, dec!(500));

        let err = plan_create(&balances, &expense(account, dec!(750))).unwrap_err();
        let LedgerError::InsufficientFunds(details) = err else {
            panic!("expected insufficient funds");
        };
        assert_eq!(details.available_balance, dec!(500));
        assert_eq!(details.attempted_amount, dec!(750));
        assert_eq!(details.shortfall, dec!(250));
    }

    // Scenario: source 100, destination 0, transfer 250 -> rejected,
    // destination untouched.
    #[test]
    fn test_create_transfer_insufficient_source() {
        let source = Uuid::new_v4();
        let destination = Uuid::new_v4();
        let balances = BalanceView::new()
            .with_account(source, dec!(100))
            .with_account(destination, dec!(0));

        let err = plan_create(&balances, &transfer(source, destination, dec!(250))).unwrap_err();
        let LedgerError::InsufficientFunds(details) = err else {
            panic!("expected insufficient funds");
        };
        assert_eq!(details.shortfall, dec!(150));
        assert_eq!(balances.balance_of(destination).unwrap(), dec!(0));
    }

    // Scenario: expense 200 on 1000 (-> 800); edit amount to 150 -> 850.
    #[test]
    fn test_edit_amount_nets_correctly() {
        let account = Uuid::new_v4();
        let mut balances = BalanceView::new().with_account(account, dec!(1000));

        let stored = expense(account, dec!(200));
        let create = plan_create(&balances, &stored).unwrap();
        balances.apply(&create.deltas);
        assert_eq!(balances.balance_of(account).unwrap(), dec!(800));

        let edited = expense(account, dec!(150));
        let plan = plan_edit(&balances, &stored, &edited).unwrap();
        balances.apply(&plan.deltas);
        assert_eq!(balances.balance_of(account).unwrap(), dec!(850));
    }

    // Edit validation runs against the post-reversal balance: an expense of
    // 900 on a balance of 100 is fine when it replaces a stored expense of
    // 900 (reversal frees the funds first).
    #[test]
    fn test_edit_validates_after_reversal() {
        let account = Uuid::new_v4();
        let stored = expense(account, dec!(900));

        // Current committed balance: 1000 - 900 = 100.
        let balances = BalanceView::new().with_account(account, dec!(100));

        let edited = expense(account, dec!(1000));
        let plan = plan_edit(&balances, &stored, &edited).unwrap();

        let mut after = balances.clone();
        after.apply(&plan.deltas);
        assert_eq!(after.balance_of(account).unwrap(), dec!(0));

        let too_big = expense(account, dec!(1001));
        let err = plan_edit(&balances, &stored, &too_big).unwrap_err();
        let LedgerError::InsufficientFunds(details) = err else {
            panic!("expected insufficient funds");
        };
        assert_eq!(details.available_balance, dec!(1000));
        assert_eq!(details.shortfall, dec!(1));
    }

    // Editing a conversion reverses the stored converted amount and applies
    // the new one; the two must never be conflated.
    #[test]
    fn test_edit_conversion_uses_stored_converted_amount_for_reversal() {
        let source = Uuid::new_v4();
        let destination = Uuid::new_v4();

        let mut stored = transfer(source, destination, dec!(100));
        stored.kind = TransactionKind::Conversion;
        stored.converted_amount = Some(dec!(1500000));
        stored.exchange_rate = Some(dec!(15000));

        let mut new = stored.clone();
        new.converted_amount = Some(dec!(1600000));
        new.exchange_rate = Some(dec!(16000));

        // Post-create balances: source 900, destination 1_500_000.
        let mut balances = BalanceView::new()
            .with_account(source, dec!(900))
            .with_account(destination, dec!(1500000));

        let plan = plan_edit(&balances, &stored, &new).unwrap();
        balances.apply(&plan.deltas);

        assert_eq!(balances.balance_of(source).unwrap(), dec!(900));
        assert_eq!(balances.balance_of(destination).unwrap(), dec!(1600000));
    }

    // Scenario: expense 75 on balance B; delete -> B; restore -> B - 75.
    #[test]
    fn test_delete_then_restore_round_trip() {
        let account = Uuid::new_v4();
        let initial = dec!(480);
        let mut balances = BalanceView::new().with_account(account, initial - dec!(75));

        let stored = expense(account, dec!(75));

        let delete = plan_delete(&stored);
        balances.apply(&delete.deltas);
        assert_eq!(balances.balance_of(account).unwrap(), initial);

        let restore = plan_restore(&balances, &stored).unwrap();
        balances.apply(&restore.deltas);
        assert_eq!(balances.balance_of(account).unwrap(), initial - dec!(75));
    }

    // Scenario: restore rejected when the balance drifted down to 50
    // against a stored 100-unit expense.
    #[test]
    fn test_restore_rejected_after_drift() {
        let account = Uuid::new_v4();
        let balances = BalanceView::new().with_account(account, dec!(50));

        let stored = expense(account, dec!(100));
        let err = plan_restore(&balances, &stored).unwrap_err();
        let LedgerError::InsufficientFunds(details) = err else {
            panic!("expected insufficient funds");
        };
        assert_eq!(details.available_balance, dec!(50));
        assert_eq!(details.attempted_amount, dec!(100));
        assert_eq!(details.shortfall, dec!(50));
    }

    #[test]
    fn test_delete_income_is_never_validated() {
        let account = Uuid::new_v4();
        let mut stored = expense(account, dec!(100));
        stored.kind = TransactionKind::Income;

        // Deleting an income debits the account; the plan is produced even
        // though the view says the balance is lower than the income amount.
        let plan = plan_delete(&stored);
        assert_eq!(plan.deltas.len(), 1);
        assert_eq!(plan.deltas[0].delta, dec!(-100));
    }

    #[test]
    fn test_restore_income_never_validated() {
        let account = Uuid::new_v4();
        let mut stored = expense(account, dec!(100));
        stored.kind = TransactionKind::Income;

        let balances = BalanceView::new().with_account(account, dec!(0));
        let plan = plan_restore(&balances, &stored).unwrap();
        assert_eq!(plan.deltas[0].delta, dec!(100));
    }

    #[test]
    fn test_plan_create_unknown_account() {
        let balances = BalanceView::new();
        let err = plan_create(&balances, &expense(Uuid::new_v4(), dec!(10))).unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));
    }

    #[test]
    fn test_merge_drops_zero_net_accounts() {
        let account = Uuid::new_v4();
        let other = Uuid::new_v4();
        let merged = merge_deltas(vec![
            BalanceDelta::new(account, dec!(100)),
            BalanceDelta::new(other, dec!(5)),
            BalanceDelta::new(account, dec!(-100)),
        ]);
        assert_eq!(merged, vec![BalanceDelta::new(other, dec!(5))]);
    }

    #[test]
    fn test_edit_with_same_source_merges_to_difference() {
        let account = Uuid::new_v4();
        let balances = BalanceView::new().with_account(account, dec!(800));

        let stored = expense(account, dec!(200));
        let edited = expense(account, dec!(150));
        let plan = plan_edit(&balances, &stored, &edited).unwrap();

        // Net change is a single +50 delta on the source account.
        assert_eq!(plan.deltas, vec![BalanceDelta::new(account, dec!(50))]);
    }
}
