//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, balance-effect rules, validation, and
//! mutation planning live here.
//!
//! # Modules
//!
//! - `ledger` - Balance effects, validation, and mutation planning
//! - `currency` - Exchange rates and amount conversion

pub mod currency;
pub mod ledger;
