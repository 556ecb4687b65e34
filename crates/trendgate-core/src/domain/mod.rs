//! # Domain Models
//!
//! Canonical domain types for the trendgate decision-to-execution core.
//!
//! All models are designed to be:
//!
//! - **Type-safe**: invalid states are unrepresentable
//! - **Validated**: construction enforces every invariant
//! - **Serializable**: full serde support for JSON audit trails
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Normalized equity ticker |
//! | [`UtcDateTime`] | UTC-only RFC3339 timestamp |
//! | [`Timeframe`] | Validation timeframe (1d, 4h) |
//! | [`Bar`] | OHLCV bar with range invariants |
//! | [`Phase`] | Ordered risk tier with forward-only transitions |
//! | [`OrderRequest`] | Immutable order intent |
//! | [`IdempotentKey`] | Deterministic submission identifier |
//! | [`ExecutionResult`] | Terminal outcome of one execution call |
//! | [`SessionMetrics`] | Per-day performance aggregate |
//! | [`PhaseTransition`] | Append-only phase-change audit record |
//! | [`ValidationCriteriaResult`] | Transition criteria check outcome |

mod bar;
mod metrics;
mod order;
mod phase;
mod symbol;
mod timeframe;
mod timestamp;

pub use bar::Bar;
pub use metrics::{
    MetricsSummary, PhaseTransition, SessionMetrics, TransitionTrigger, ValidationCriteriaResult,
};
pub use order::{ExecutionResult, IdempotentKey, OrderRequest, OrderType};
pub use phase::Phase;
pub use symbol::Symbol;
pub use timeframe::Timeframe;
pub use timestamp::UtcDateTime;
