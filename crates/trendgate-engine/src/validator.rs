//! Multi-timeframe trend validation.
//!
//! One `validate` call fetches bars per configured timeframe (retried under
//! the shared policy), computes indicators through the pure
//! [`IndicatorService`] contract, scores each timeframe, and aggregates the
//! weighted result into a single Pass/Block/Degraded decision. Data
//! unavailability degrades the decision instead of failing it; only caller
//! input errors are returned as errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use trendgate_core::{
    Bar, ConfigError, IndicatorService, MarketDataSource, Symbol, Timeframe, UtcDateTime,
    ValidationError, ValidatorConfig,
};

use crate::scorer::{self, TimeframeIndicators};

const EMA_PERIOD: usize = 20;

/// Decision state of one validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pass,
    Block,
    Degraded,
}

impl ValidationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Block => "block",
            Self::Degraded => "degraded",
        }
    }
}

/// Per-timeframe outcome inside a validation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeScore {
    pub timeframe: Timeframe,
    pub weight: f64,
    /// Trend score in {0.0, 0.5, 1.0}; absent when the timeframe degraded.
    pub score: Option<f64>,
    pub indicators: Option<TimeframeIndicators>,
}

impl TimeframeScore {
    pub const fn degraded(&self) -> bool {
        self.score.is_none()
    }
}

/// Immutable outcome of one `validate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeValidationResult {
    pub status: ValidationStatus,
    pub aggregate_score: f64,
    pub timeframe_scores: Vec<TimeframeScore>,
    pub symbol: Symbol,
    pub at: UtcDateTime,
    pub reasons: Vec<String>,
    pub elapsed: Duration,
}

impl TimeframeValidationResult {
    /// Build a result, enforcing the aggregate-score range invariant.
    pub fn new(
        status: ValidationStatus,
        aggregate_score: f64,
        timeframe_scores: Vec<TimeframeScore>,
        symbol: Symbol,
        reasons: Vec<String>,
        elapsed: Duration,
    ) -> Result<Self, ValidationError> {
        if !aggregate_score.is_finite() || !(0.0..=1.0).contains(&aggregate_score) {
            return Err(ValidationError::ScoreOutOfRange {
                value: aggregate_score,
            });
        }

        Ok(Self {
            status,
            aggregate_score,
            timeframe_scores,
            symbol,
            at: UtcDateTime::now(),
            reasons,
            elapsed,
        })
    }

    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Pass
    }
}

/// Caller input errors. Distinct from a trend-based `Block`: these mean the
/// call itself was malformed and nothing was evaluated.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),
}

/// Multi-timeframe trend validator.
///
/// Holds no mutable state; any number of symbols may be validated
/// concurrently through one instance.
pub struct MultiTimeframeValidator {
    config: ValidatorConfig,
    market_data: Arc<dyn MarketDataSource>,
    indicators: Arc<dyn IndicatorService>,
}

impl MultiTimeframeValidator {
    pub fn new(
        config: ValidatorConfig,
        market_data: Arc<dyn MarketDataSource>,
        indicators: Arc<dyn IndicatorService>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            market_data,
            indicators,
        })
    }

    /// Validate the trend for `symbol` at `current_price`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::InvalidInput`] for an empty/invalid symbol
    /// or a non-positive price. Market-data trouble never errors; it
    /// degrades the returned result instead.
    pub async fn validate(
        &self,
        symbol: &str,
        current_price: f64,
    ) -> Result<TimeframeValidationResult, ValidatorError> {
        let symbol = Symbol::parse(symbol)?;
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(ValidationError::NonPositiveValue {
                field: "current_price",
            }
            .into());
        }

        let started = Instant::now();
        let mut timeframe_scores = Vec::with_capacity(self.config.timeframes.len());
        let mut reasons = Vec::new();
        let mut aggregate = 0.0;
        let mut any_degraded = false;

        for tf_config in &self.config.timeframes {
            let timeframe = tf_config.timeframe;
            match self.evaluate_timeframe(&symbol, timeframe, tf_config.min_bars, current_price)
                .await
            {
                Some(indicators) => {
                    let score = scorer::score(&indicators);
                    aggregate += tf_config.weight * score;
                    reasons.push(score_reason(timeframe, score));
                    timeframe_scores.push(TimeframeScore {
                        timeframe,
                        weight: tf_config.weight,
                        score: Some(score),
                        indicators: Some(indicators),
                    });
                }
                None => {
                    any_degraded = true;
                    reasons.push(format!(
                        "{} timeframe data unavailable after retries",
                        timeframe.label()
                    ));
                    timeframe_scores.push(TimeframeScore {
                        timeframe,
                        weight: tf_config.weight,
                        score: None,
                        indicators: None,
                    });
                }
            }
        }

        let status = if any_degraded {
            ValidationStatus::Degraded
        } else if aggregate >= self.config.pass_threshold {
            ValidationStatus::Pass
        } else {
            ValidationStatus::Block
        };

        let result = TimeframeValidationResult::new(
            status,
            aggregate,
            timeframe_scores,
            symbol,
            reasons,
            started.elapsed(),
        )
        .map_err(ValidatorError::InvalidInput)?;

        Ok(result)
    }

    /// Fetch and score one timeframe. `None` means the timeframe degraded:
    /// retries exhausted, too few bars, or an indicator shortfall.
    async fn evaluate_timeframe(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        min_bars: usize,
        current_price: f64,
    ) -> Option<TimeframeIndicators> {
        let bars = self.fetch_with_retry(symbol, timeframe, min_bars).await?;
        if bars.len() < min_bars {
            return None;
        }

        // Indicators are pure functions of the series; nothing carries over
        // between timeframes within one validation call.
        let ema_20 = self.indicators.ema(&bars, EMA_PERIOD).ok()?;
        let macd_line = self.indicators.macd(&bars).ok()?;

        Some(TimeframeIndicators::new(
            timeframe,
            current_price,
            ema_20,
            macd_line,
            bars.len(),
            UtcDateTime::now(),
        ))
    }

    async fn fetch_with_retry(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        min_bars: usize,
    ) -> Option<Vec<Bar>> {
        let policy = &self.config.fetch_retry;

        for attempt in 1..=policy.max_attempts {
            match self
                .market_data
                .fetch_bars(symbol, timeframe, min_bars)
                .await
            {
                Ok(bars) => return Some(bars),
                Err(_) if policy.allows_retry(attempt) => {
                    tokio::time::sleep(policy.delay_after_attempt(attempt)).await;
                }
                Err(_) => return None,
            }
        }

        None
    }
}

fn score_reason(timeframe: Timeframe, score: f64) -> String {
    let label = timeframe.label();
    if score >= 1.0 {
        format!("{label} timeframe validates bullish")
    } else if score > 0.0 {
        format!("{label} timeframe is mixed")
    } else {
        format!("{label} timeframe validates bearish")
    }
}
