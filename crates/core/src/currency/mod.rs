//! Multi-currency handling.
//!
//! - Exchange rate value type
//! - Amount conversion with banker's rounding

pub mod conversion;
pub mod exchange;

pub use conversion::convert_amount;
pub use exchange::ExchangeRate;
