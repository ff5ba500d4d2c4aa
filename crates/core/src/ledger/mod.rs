//! Transaction mutation engine.
//!
//! This module implements the core ledger functionality:
//! - Effect descriptors and per-kind balance effect rules
//! - Balance validation (no debit may drive an account negative)
//! - Mutation planning for create / edit / delete / restore
//! - Error types for ledger operations

pub mod effect;
pub mod error;
pub mod mutation;
pub mod types;
pub mod validation;

#[cfg(test)]
mod mutation_props;

pub use effect::{effect_of, reverse_of};
pub use error::LedgerError;
pub use mutation::{BalanceView, MutationPlan, plan_create, plan_delete, plan_edit, plan_restore};
pub use types::{BalanceDelta, EffectDescriptor, LifecycleState, TransactionKind};
pub use validation::{DebitCheck, InsufficientFunds, check_debit, validate_descriptor};
