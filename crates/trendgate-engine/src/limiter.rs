//! Per-phase daily trade-count caps.
//!
//! Capped phases atomically increment-and-check a per-date counter; uncapped
//! phases never touch the store. The counter store is injected so a
//! persistent or distributed backend can replace the in-memory map without
//! changing call sites.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;
use time::Date;

use trendgate_core::Phase;

/// Daily trade counter storage, keyed by UTC trading date.
///
/// `increment` must be atomic with respect to concurrent submissions on the
/// same account; limit enforcement has to be exact.
pub trait TradeCountStore: Send + Sync {
    /// Increment the counter for `date` and return the new count.
    fn increment(&self, date: Date) -> u32;

    /// Current count for `date`, zero if never incremented.
    fn count(&self, date: Date) -> u32;
}

impl<T: TradeCountStore + ?Sized> TradeCountStore for std::sync::Arc<T> {
    fn increment(&self, date: Date) -> u32 {
        (**self).increment(date)
    }

    fn count(&self, date: Date) -> u32 {
        (**self).count(date)
    }
}

/// Mutex-guarded in-memory counter map. Grows only across distinct dates;
/// entries are never cleared.
#[derive(Debug, Default)]
pub struct InMemoryTradeCountStore {
    counts: Mutex<HashMap<Date, u32>>,
}

impl TradeCountStore for InMemoryTradeCountStore {
    fn increment(&self, date: Date) -> u32 {
        let mut counts = self.counts.lock().expect("trade count lock is not poisoned");
        let entry = counts.entry(date).or_insert(0);
        *entry += 1;
        *entry
    }

    fn count(&self, date: Date) -> u32 {
        let counts = self.counts.lock().expect("trade count lock is not poisoned");
        counts.get(&date).copied().unwrap_or(0)
    }
}

/// Raised when a capped phase has used up its daily allowance.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("daily trade limit of {limit} reached for phase '{phase}'")]
pub struct LimitExceeded {
    pub phase: Phase,
    pub limit: u32,
}

/// Per-phase, per-day trade-count cap enforcement.
pub struct TradeLimiter<S: TradeCountStore> {
    caps: BTreeMap<Phase, u32>,
    store: S,
}

impl<S: TradeCountStore> TradeLimiter<S> {
    pub fn new(caps: BTreeMap<Phase, u32>, store: S) -> Self {
        Self { caps, store }
    }

    /// Consume one trade slot for `date` under `phase`.
    ///
    /// # Errors
    ///
    /// [`LimitExceeded`] when the incremented counter overflows the phase
    /// cap. Uncapped phases always succeed and never create a counter.
    pub fn enforce(&self, phase: Phase, date: Date) -> Result<(), LimitExceeded> {
        let Some(limit) = self.caps.get(&phase).copied() else {
            return Ok(());
        };

        let count = self.store.increment(date);
        if count > limit {
            return Err(LimitExceeded { phase, limit });
        }

        Ok(())
    }

    pub fn used(&self, date: Date) -> u32 {
        self.store.count(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn limiter() -> TradeLimiter<InMemoryTradeCountStore> {
        let mut caps = BTreeMap::new();
        caps.insert(Phase::ProofOfConcept, 1);
        TradeLimiter::new(caps, InMemoryTradeCountStore::default())
    }

    #[test]
    fn first_trade_of_the_day_is_allowed() {
        let limiter = limiter();
        limiter
            .enforce(Phase::ProofOfConcept, date!(2024 - 03 - 04))
            .expect("first trade");
    }

    #[test]
    fn second_trade_of_the_day_is_rejected() {
        let limiter = limiter();
        let day = date!(2024 - 03 - 04);

        limiter.enforce(Phase::ProofOfConcept, day).expect("first trade");
        let err = limiter
            .enforce(Phase::ProofOfConcept, day)
            .expect_err("second trade must fail");

        assert_eq!(err.phase, Phase::ProofOfConcept);
        assert_eq!(err.limit, 1);
    }

    #[test]
    fn a_new_date_gets_a_fresh_counter() {
        let limiter = limiter();
        limiter
            .enforce(Phase::ProofOfConcept, date!(2024 - 03 - 04))
            .expect("day one");
        limiter
            .enforce(Phase::ProofOfConcept, date!(2024 - 03 - 05))
            .expect("day two");
    }

    #[test]
    fn uncapped_phases_never_touch_the_store() {
        let limiter = limiter();
        let day = date!(2024 - 03 - 04);

        for phase in [Phase::Experience, Phase::RealMoneyTrial, Phase::Scaling] {
            for _ in 0..10 {
                limiter.enforce(phase, day).expect("uncapped");
            }
        }

        assert_eq!(limiter.used(day), 0);
    }
}
