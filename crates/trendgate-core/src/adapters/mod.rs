//! Reference brokerage adapters.
//!
//! Only Alpaca is wired today; any implementation of
//! [`crate::contracts::ExchangeAdapter`] that honors idempotent keys can
//! stand in for it.

mod alpaca;

pub use alpaca::AlpacaExchangeAdapter;
