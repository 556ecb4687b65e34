//! Collaborator contracts consumed by the execution pipeline.
//!
//! The core does not implement market data, indicators, the exchange, or the
//! event bus; it consumes them through these traits. Each contract is small
//! and each error type carries the classification the pipeline needs to
//! decide between retrying, degrading, and stopping.
//!
//! | Contract | Role |
//! |----------|------|
//! | [`MarketDataSource`] | Historical bars per symbol/timeframe |
//! | [`IndicatorService`] | Pure EMA/MACD over a bar series |
//! | [`ExchangeAdapter`] | Idempotent order submission and lookup |
//! | [`EventPublisher`] | Fire-and-forget audit events |

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Bar, IdempotentKey, OrderRequest, Symbol, Timeframe};

/// Exchange-side view of a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub order_id: String,
    pub state: OrderState,
    pub fill_price: Option<f64>,
}

/// Lifecycle state reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Accepted,
    PartiallyFilled,
    Filled,
    Canceled,
}

/// Exchange error classification.
///
/// The executor's retry decision is a pure function of this kind:
/// transient kinds retry with a duplicate check, business rejections retry
/// without one, fatal kinds stop immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeErrorKind {
    Timeout,
    Connection,
    RateLimited,
    InvalidSymbol,
    Unauthorized,
    InsufficientFunds,
    RiskViolation,
    Rejected,
    Unknown,
}

/// Structured error returned by an [`ExchangeAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeError {
    kind: ExchangeErrorKind,
    message: String,
}

impl ExchangeError {
    pub fn new(kind: ExchangeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ExchangeErrorKind::Timeout, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ExchangeErrorKind::Connection, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ExchangeErrorKind::Rejected, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ExchangeErrorKind::Unknown, message)
    }

    pub const fn kind(&self) -> ExchangeErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Transport-level failures where the exchange may have received the
    /// order without acknowledging it. Retried with a duplicate check first.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ExchangeErrorKind::Timeout
                | ExchangeErrorKind::Connection
                | ExchangeErrorKind::RateLimited
        )
    }

    /// Business errors that no retry can fix. Never retried.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ExchangeErrorKind::InvalidSymbol
                | ExchangeErrorKind::Unauthorized
                | ExchangeErrorKind::InsufficientFunds
                | ExchangeErrorKind::RiskViolation
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ExchangeErrorKind::Timeout => "exchange.timeout",
            ExchangeErrorKind::Connection => "exchange.connection",
            ExchangeErrorKind::RateLimited => "exchange.rate_limited",
            ExchangeErrorKind::InvalidSymbol => "exchange.invalid_symbol",
            ExchangeErrorKind::Unauthorized => "exchange.unauthorized",
            ExchangeErrorKind::InsufficientFunds => "exchange.insufficient_funds",
            ExchangeErrorKind::RiskViolation => "exchange.risk_violation",
            ExchangeErrorKind::Rejected => "exchange.rejected",
            ExchangeErrorKind::Unknown => "exchange.unknown",
        }
    }
}

impl Display for ExchangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ExchangeError {}

/// Market-data unavailability. Always treated as transient by the validator,
/// which retries and then degrades instead of failing the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketDataError {
    #[error("market data unavailable for {symbol} {timeframe}: {reason}")]
    Unavailable {
        symbol: Symbol,
        timeframe: Timeframe,
        reason: String,
    },
}

/// Indicator computation errors. Only raised for bar series too short to
/// compute over; the validator maps these into timeframe degradation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    #[error("need at least {required} bars to compute {indicator}, got {available}")]
    InsufficientBars {
        indicator: &'static str,
        required: usize,
        available: usize,
    },
}

/// Event bus publish failure. Callers log-and-ignore; publishing must never
/// fail the owning operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("event publish failed on channel '{channel}': {reason}")]
pub struct PublishError {
    pub channel: String,
    pub reason: String,
}

/// Brokerage contract. Implementations must honor idempotent keys for the
/// end-to-end exactly-once guarantee to hold.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Submit an order under the given idempotent key.
    async fn submit_order(
        &self,
        order: &OrderRequest,
        key: &IdempotentKey,
    ) -> Result<OrderStatus, ExchangeError>;

    /// Look up a previously submitted order by its idempotent key.
    /// `Ok(None)` means the exchange holds no order for the key.
    async fn get_order_by_idempotent_key(
        &self,
        key: &IdempotentKey,
    ) -> Result<Option<OrderStatus>, ExchangeError>;
}

/// Historical bar provider.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch at least `min_bars` most-recent bars for the symbol/timeframe.
    async fn fetch_bars(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        min_bars: usize,
    ) -> Result<Vec<Bar>, MarketDataError>;
}

/// Pure indicator computation over a bar series. Implementations must retain
/// no state between calls; the result is a function of the input alone.
pub trait IndicatorService: Send + Sync {
    /// Exponential moving average of closes over `period` bars.
    fn ema(&self, bars: &[Bar], period: usize) -> Result<f64, IndicatorError>;

    /// MACD line (12/26 EMA spread) for the series.
    fn macd(&self, bars: &[Bar]) -> Result<f64, IndicatorError>;
}

/// Fire-and-forget event bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, channel: &str, payload: serde_json::Value)
        -> Result<(), PublishError>;
}
