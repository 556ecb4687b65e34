use thiserror::Error;

/// Validation and contract errors exposed by `trendgate-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("invalid timeframe '{value}', expected one of 1d, 4h")]
    InvalidTimeframe { value: String },
    #[error("invalid phase '{value}', expected one of experience, proof_of_concept, real_money_trial, scaling")]
    InvalidPhase { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("field '{field}' must be positive")]
    NonPositiveValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,

    #[error("order quantity must be greater than zero")]
    NonPositiveQuantity,
    #[error("limit orders require a positive limit price")]
    MissingLimitPrice,
    #[error("market orders must not carry a limit price")]
    UnexpectedLimitPrice,

    #[error("trader id cannot be empty")]
    EmptyTraderId,

    #[error("aggregate score {value} is outside [0.0, 1.0]")]
    ScoreOutOfRange { value: f64 },

    #[error("win rate {value} is outside [0.0, 1.0]")]
    WinRateOutOfRange { value: f64 },
}

/// Configuration errors raised while validating the loaded config.
///
/// These are programmer/operator errors and fail fast at startup; nothing in
/// the pipeline attempts to recover from them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("timeframe weights must sum to 1.0, got {sum}")]
    WeightsDoNotSumToOne { sum: f64 },
    #[error("at least one timeframe must be configured")]
    NoTimeframes,
    #[error("timeframe '{timeframe}' is configured more than once")]
    DuplicateTimeframe { timeframe: &'static str },
    #[error("weight for timeframe '{timeframe}' must be in (0.0, 1.0]")]
    InvalidWeight { timeframe: &'static str },
    #[error("minimum bar count for timeframe '{timeframe}' must be greater than zero")]
    InvalidMinBars { timeframe: &'static str },
    #[error("pass threshold {value} must be in (0.0, 1.0]")]
    InvalidThreshold { value: f64 },
    #[error("retry policy must allow at least one attempt")]
    NoAttempts,
    #[error("no transition criteria configured for target phase '{target}'")]
    MissingCriteria { target: &'static str },
    #[error("trade cap for phase '{phase}' must be greater than zero")]
    InvalidTradeCap { phase: &'static str },
    #[error("rolling window must be greater than zero")]
    InvalidRollingWindow,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
