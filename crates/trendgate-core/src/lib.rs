//! # Trendgate Core
//!
//! Domain contracts for the trendgate decision-to-execution trading core.
//!
//! ## Overview
//!
//! This crate provides the foundational pieces the pipeline engine builds on:
//!
//! - **Validated domain models** for symbols, bars, orders, phases, and
//!   session metrics
//! - **Collaborator contracts** for the exchange, market data, indicators,
//!   and the event bus
//! - **Retry policy** with deterministic exponential backoff
//! - **Configuration surface** validated once at load
//! - **Order lifecycle events** for the audit trail
//! - **Reference Alpaca adapter** over a swappable HTTP transport
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Reference brokerage adapters (Alpaca) |
//! | [`config`] | Validated configuration tree |
//! | [`contracts`] | Consumed collaborator traits and their errors |
//! | [`domain`] | Domain models (Symbol, Bar, Phase, OrderRequest, ...) |
//! | [`error`] | Core error types |
//! | [`events`] | Order lifecycle event payloads |
//! | [`http`] | HTTP transport abstraction |
//! | [`retry`] | Backoff and retry policy |
//!
//! ## Error Handling
//!
//! Construction validates everything up front; a value that exists is a
//! value that satisfies its invariants:
//!
//! ```rust
//! use trendgate_core::{Symbol, ValidationError};
//!
//! let err = Symbol::parse("").expect_err("empty symbols are rejected");
//! assert!(matches!(err, ValidationError::EmptySymbol));
//! ```
//!
//! ## Security
//!
//! - Brokerage credentials are read from environment variables only
//! - Idempotent keys carry no secrets and are safe to log and publish

pub mod adapters;
pub mod config;
pub mod contracts;
pub mod domain;
pub mod error;
pub mod events;
pub mod http;
pub mod retry;

// Re-export commonly used types at crate root for convenience

pub use adapters::AlpacaExchangeAdapter;

pub use config::{
    EngineConfig, ExecutorConfig, PhaseConfig, SizingConfig, TimeframeConfig, TransitionCriteria,
    ValidatorConfig,
};

pub use contracts::{
    EventPublisher, ExchangeAdapter, ExchangeError, ExchangeErrorKind, IndicatorError,
    IndicatorService, MarketDataError, MarketDataSource, OrderState, OrderStatus, PublishError,
};

pub use domain::{
    Bar, ExecutionResult, IdempotentKey, MetricsSummary, OrderRequest, OrderType, Phase,
    PhaseTransition, SessionMetrics, Symbol, Timeframe, TransitionTrigger, UtcDateTime,
    ValidationCriteriaResult,
};

pub use error::{ConfigError, CoreError, ValidationError};

pub use events::{OrderEvent, OrderEventType, ORDER_EVENTS_CHANNEL};

pub use http::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, HttpTransportError, NoopHttpClient,
    ReqwestHttpClient,
};

pub use retry::{Backoff, RetryPolicy};
