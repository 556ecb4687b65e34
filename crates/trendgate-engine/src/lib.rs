//! # Trendgate Engine
//!
//! The decision-to-execution pipeline for an automated equities trading bot:
//! given a candidate symbol, decide whether a trade is allowed, how large it
//! may be, and submit it to the brokerage exactly once despite network
//! failures.
//!
//! ## Components
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`scorer`] | Pure per-timeframe trend scoring |
//! | [`validator`] | Multi-timeframe validation with retry and degradation |
//! | [`limiter`] | Per-phase, per-day trade-count caps |
//! | [`sizing`] | Phase- and streak-aware position sizing |
//! | [`phase`] | Phase state machine, criteria validation, risk gating |
//! | [`executor`] | Idempotent order execution with backoff |
//! | [`pipeline`] | validate -> gate -> execute facade |
//!
//! ## Control Flow
//!
//! ```text
//! ┌──────────────────────┐    ┌───────────────────┐    ┌────────────────┐
//! │ MultiTimeframe       │───▶│ PhaseManager      │───▶│ OrderExecutor  │
//! │ Validator            │    │ (limit + size)    │    │ (idempotent)   │
//! └──────────┬───────────┘    └─────────┬─────────┘    └────────┬───────┘
//!            │                          │                       │
//!            ▼                          ▼                       ▼
//!   MarketDataSource /           TradeCountStore /        ExchangeAdapter /
//!   IndicatorService             PhaseRepository          EventPublisher
//! ```
//!
//! Each stage fails closed independently. The only shared mutable state is
//! the trade-count store and the current phase, each behind one mutex
//! scoped to the trading account.

pub mod executor;
pub mod limiter;
pub mod phase;
pub mod pipeline;
pub mod scorer;
pub mod sizing;
pub mod validator;

// Re-export commonly used types at crate root for convenience

pub use executor::OrderExecutor;
pub use limiter::{InMemoryTradeCountStore, LimitExceeded, TradeCountStore, TradeLimiter};
pub use phase::{
    InMemoryMetricsRepository, InMemoryPhaseRepository, MetricsRepository, PhaseError,
    PhaseManager, PhaseRepository,
};
pub use pipeline::{
    CancelFlag, PipelineError, PipelineOutcome, PipelineStage, SizingInputs, TradePipeline,
};
pub use scorer::TimeframeIndicators;
pub use sizing::PositionSizer;
pub use validator::{
    MultiTimeframeValidator, TimeframeScore, TimeframeValidationResult, ValidationStatus,
    ValidatorError,
};
