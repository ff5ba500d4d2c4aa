//! Balance Effect Calculator.
//!
//! Maps an effect descriptor to the set of per-account balance deltas it
//! causes, and the exact structural inverse of that set. Both functions are
//! pure: no hidden state, no I/O.
//!
//! Reversal must always be computed from the descriptor as it was
//! persisted, never from an incoming request. An edit that re-fetches an
//! exchange rate uses the fresh rate only for the new application step; the
//! reversal uses whatever `converted_amount` was stored.

use super::types::{BalanceDelta, EffectDescriptor, TransactionKind};

/// Computes the per-account balance deltas caused by a descriptor.
///
/// | kind       | source    | destination                      |
/// |------------|-----------|----------------------------------|
/// | income     | `+amount` | -                                |
/// | expense    | `-amount` | -                                |
/// | transfer   | `-amount` | `+amount`                        |
/// | conversion | `-amount` | `+effective_destination_amount`  |
///
/// A missing source account on income/expense yields no effect at all.
#[must_use]
pub fn effect_of(descriptor: &EffectDescriptor) -> Vec<BalanceDelta> {
    let mut deltas = Vec::with_capacity(2);

    match descriptor.kind {
        TransactionKind::Income => {
            if let Some(account_id) = descriptor.account_id {
                deltas.push(BalanceDelta::new(account_id, descriptor.amount));
            }
        }
        TransactionKind::Expense => {
            if let Some(account_id) = descriptor.account_id {
                deltas.push(BalanceDelta::new(account_id, -descriptor.amount));
            }
        }
        TransactionKind::Transfer | TransactionKind::Conversion => {
            if let Some(account_id) = descriptor.account_id {
                deltas.push(BalanceDelta::new(account_id, -descriptor.amount));
            }
            if let Some(destination_id) = descriptor.destination_account_id {
                deltas.push(BalanceDelta::new(
                    destination_id,
                    descriptor.effective_destination_amount(),
                ));
            }
        }
    }

    deltas
}

/// Computes the exact element-wise negation of [`effect_of`].
#[must_use]
pub fn reverse_of(descriptor: &EffectDescriptor) -> Vec<BalanceDelta> {
    effect_of(descriptor)
        .into_iter()
        .map(BalanceDelta::negate)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn base(kind: TransactionKind) -> EffectDescriptor {
        EffectDescriptor {
            kind,
            amount: dec!(250),
            currency: "USD".to_string(),
            converted_amount: None,
            exchange_rate: None,
            account_id: Some(Uuid::new_v4()),
            destination_account_id: None,
        }
    }

    #[test]
    fn test_income_credits_source() {
        let d = base(TransactionKind::Income);
        let deltas = effect_of(&d);
        assert_eq!(deltas.len(), 1);
        assert_eq!(Some(deltas[0].account_id), d.account_id);
        assert_eq!(deltas[0].delta, dec!(250));
    }

    #[test]
    fn test_expense_debits_source() {
        let d = base(TransactionKind::Expense);
        let deltas = effect_of(&d);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].delta, dec!(-250));
    }

    #[test]
    fn test_transfer_moves_amount() {
        let mut d = base(TransactionKind::Transfer);
        let destination = Uuid::new_v4();
        d.destination_account_id = Some(destination);

        let deltas = effect_of(&d);
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].delta, dec!(-250));
        assert_eq!(deltas[1].account_id, destination);
        assert_eq!(deltas[1].delta, dec!(250));
    }

    #[test]
    fn test_conversion_credits_converted_amount() {
        let mut d = base(TransactionKind::Conversion);
        d.destination_account_id = Some(Uuid::new_v4());
        d.converted_amount = Some(dec!(3750000));
        d.exchange_rate = Some(dec!(15000));

        let deltas = effect_of(&d);
        assert_eq!(deltas[0].delta, dec!(-250));
        assert_eq!(deltas[1].delta, dec!(3750000));
    }

    #[test]
    fn test_conversion_without_converted_amount_uses_amount() {
        let mut d = base(TransactionKind::Conversion);
        d.destination_account_id = Some(Uuid::new_v4());

        let deltas = effect_of(&d);
        assert_eq!(deltas[1].delta, dec!(250));
    }

    #[test]
    fn test_accountless_income_has_no_effect() {
        let mut d = base(TransactionKind::Income);
        d.account_id = None;
        assert!(effect_of(&d).is_empty());
    }

    #[test]
    fn test_reverse_is_elementwise_negation() {
        let mut d = base(TransactionKind::Conversion);
        d.destination_account_id = Some(Uuid::new_v4());
        d.converted_amount = Some(dec!(999.99));

        let forward = effect_of(&d);
        let reverse = reverse_of(&d);

        assert_eq!(forward.len(), reverse.len());
        for (f, r) in forward.iter().zip(reverse.iter()) {
            assert_eq!(f.account_id, r.account_id);
            assert_eq!(f.delta, -r.delta);
        }
    }
}
