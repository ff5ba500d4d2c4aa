//! Property tests for the mutation planning pipeline.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::effect::{effect_of, reverse_of};
use super::error::LedgerError;
use super::mutation::{BalanceView, plan_create, plan_delete, plan_edit, plan_restore};
use super::types::{BalanceDelta, EffectDescriptor, TransactionKind};
use super::validation::{DebitCheck, check_debit};

/// Strategy for positive decimal amounts with cent precision.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for non-negative balances with cent precision.
fn balance_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![
        Just(TransactionKind::Income),
        Just(TransactionKind::Expense),
        Just(TransactionKind::Transfer),
        Just(TransactionKind::Conversion),
    ]
}

/// Strategy for well-formed descriptors over two fixed accounts.
fn descriptor_strategy(
    source: Uuid,
    destination: Uuid,
) -> impl Strategy<Value = EffectDescriptor> {
    (kind_strategy(), amount_strategy(), proptest::option::of(amount_strategy())).prop_map(
        move |(kind, amount, converted)| {
            let two_sided = kind.is_two_sided();
            EffectDescriptor {
                kind,
                amount,
                currency: "USD".to_string(),
                converted_amount: if kind == TransactionKind::Conversion {
                    converted
                } else {
                    None
                },
                exchange_rate: None,
                account_id: Some(source),
                destination_account_id: two_sided.then_some(destination),
            }
        },
    )
}

fn delta_on(deltas: &[BalanceDelta], account: Uuid) -> Decimal {
    deltas
        .iter()
        .filter(|d| d.account_id == account)
        .map(|d| d.delta)
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// `reverse_of` is the exact element-wise negation of `effect_of`.
    #[test]
    fn prop_reverse_is_negation(
        descriptor in descriptor_strategy(Uuid::new_v4(), Uuid::new_v4()),
    ) {
        let forward = effect_of(&descriptor);
        let reverse = reverse_of(&descriptor);

        prop_assert_eq!(forward.len(), reverse.len());
        for (f, r) in forward.iter().zip(reverse.iter()) {
            prop_assert_eq!(f.account_id, r.account_id);
            prop_assert_eq!(f.delta, -r.delta);
        }
    }

    /// Transfers conserve value: source and destination deltas cancel.
    #[test]
    fn prop_transfer_conserves_value(
        amount in amount_strategy(),
    ) {
        let source = Uuid::new_v4();
        let destination = Uuid::new_v4();
        let descriptor = EffectDescriptor {
            kind: TransactionKind::Transfer,
            amount,
            currency: "USD".to_string(),
            converted_amount: None,
            exchange_rate: None,
            account_id: Some(source),
            destination_account_id: Some(destination),
        };

        let deltas = effect_of(&descriptor);
        prop_assert_eq!(
            delta_on(&deltas, source) + delta_on(&deltas, destination),
            Decimal::ZERO
        );
    }

    /// Rejection reports shortfall exactly as `attempted - available`,
    /// and the boundary case `attempted == available` is accepted.
    #[test]
    fn prop_shortfall_precision(
        available in balance_strategy(),
        attempted in amount_strategy(),
    ) {
        match check_debit(available, attempted) {
            DebitCheck::Accepted => prop_assert!(attempted <= available),
            DebitCheck::Rejected(details) => {
                prop_assert!(attempted > available);
                prop_assert_eq!(details.available_balance, available);
                prop_assert_eq!(details.attempted_amount, attempted);
                prop_assert_eq!(details.shortfall, attempted - available);
            }
        }

        prop_assert_eq!(check_debit(available, available), DebitCheck::Accepted);
    }

    /// An accepted plan never drives a tracked balance negative.
    #[test]
    fn prop_accepted_plan_keeps_balances_non_negative(
        source_balance in balance_strategy(),
        destination_balance in balance_strategy(),
        descriptor in descriptor_strategy(Uuid::new_v4(), Uuid::new_v4()),
    ) {
        let source = descriptor.account_id.unwrap();
        let mut balances = BalanceView::new().with_account(source, source_balance);
        if let Some(destination) = descriptor.destination_account_id {
            balances.set(destination, destination_balance);
        }

        if let Ok(plan) = plan_create(&balances, &descriptor) {
            balances.apply(&plan.deltas);
            prop_assert!(balances.balance_of(source).unwrap() >= Decimal::ZERO);
            if let Some(destination) = descriptor.destination_account_id {
                prop_assert!(balances.balance_of(destination).unwrap() >= Decimal::ZERO);
            }
        }
    }

    /// An edit's net balance change equals effect(new) - effect(stored)
    /// element-wise over the affected accounts.
    #[test]
    fn prop_edit_net_change_is_effect_difference(
        stored in descriptor_strategy(Uuid::new_v4(), Uuid::new_v4()),
        new_amount in amount_strategy(),
    ) {
        let source = stored.account_id.unwrap();
        let mut new = stored.clone();
        new.amount = new_amount;

        // Balances large enough that validation always accepts.
        let big = Decimal::new(i64::MAX / 4, 2);
        let mut balances = BalanceView::new().with_account(source, big);
        if let Some(destination) = stored.destination_account_id {
            balances.set(destination, big);
        }

        let plan = plan_edit(&balances, &stored, &new).unwrap();

        let old_effect = effect_of(&stored);
        let new_effect = effect_of(&new);
        for account in [stored.account_id, stored.destination_account_id]
            .into_iter()
            .flatten()
        {
            prop_assert_eq!(
                delta_on(&plan.deltas, account),
                delta_on(&new_effect, account) - delta_on(&old_effect, account)
            );
        }
    }

    /// delete + restore round-trips the balance when nothing happens in
    /// between and restore validation succeeds.
    #[test]
    fn prop_delete_restore_round_trip(
        balance in balance_strategy(),
        descriptor in descriptor_strategy(Uuid::new_v4(), Uuid::new_v4()),
    ) {
        let source = descriptor.account_id.unwrap();
        let mut balances = BalanceView::new().with_account(source, balance);
        if let Some(destination) = descriptor.destination_account_id {
            balances.set(destination, balance);
        }

        let Ok(create) = plan_create(&balances, &descriptor) else {
            // Rejected creations have nothing to round-trip.
            return Ok(());
        };
        balances.apply(&create.deltas);
        let after_create = balances.clone();

        balances.apply(&plan_delete(&descriptor).deltas);
        let restore = plan_restore(&balances, &descriptor).unwrap();
        balances.apply(&restore.deltas);

        prop_assert_eq!(
            balances.balance_of(source).unwrap(),
            after_create.balance_of(source).unwrap()
        );
        if let Some(destination) = descriptor.destination_account_id {
            prop_assert_eq!(
                balances.balance_of(destination).unwrap(),
                after_create.balance_of(destination).unwrap()
            );
        }
    }

    /// A rejected plan carries the full structured payload.
    #[test]
    fn prop_rejection_payload_complete(
        balance in balance_strategy(),
        extra in amount_strategy(),
    ) {
        let account = Uuid::new_v4();
        let balances = BalanceView::new().with_account(account, balance);

        let descriptor = EffectDescriptor {
            kind: TransactionKind::Expense,
            amount: balance + extra,
            currency: "USD".to_string(),
            converted_amount: None,
            exchange_rate: None,
            account_id: Some(account),
            destination_account_id: None,
        };

        let err = plan_create(&balances, &descriptor).unwrap_err();
        let LedgerError::InsufficientFunds(details) = err else {
            return Err(TestCaseError::fail("expected insufficient funds"));
        };
        prop_assert_eq!(details.available_balance, balance);
        prop_assert_eq!(details.attempted_amount, balance + extra);
        prop_assert_eq!(details.shortfall, extra);
    }
}
