//! Per-timeframe trend scoring.
//!
//! A timeframe scores 0.5 for a positive MACD line and 0.5 for price above
//! the 20-period EMA. The function is pure; everything it needs is in the
//! indicator snapshot.

use serde::{Deserialize, Serialize};

use trendgate_core::{Timeframe, UtcDateTime};

/// Immutable indicator snapshot for one timeframe, built fresh per
/// validation call and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeIndicators {
    pub timeframe: Timeframe,
    pub price: f64,
    pub ema_20: f64,
    pub macd_line: f64,
    pub macd_positive: bool,
    pub price_above_ema: bool,
    pub bar_count: usize,
    pub as_of: UtcDateTime,
}

impl TimeframeIndicators {
    pub fn new(
        timeframe: Timeframe,
        price: f64,
        ema_20: f64,
        macd_line: f64,
        bar_count: usize,
        as_of: UtcDateTime,
    ) -> Self {
        Self {
            timeframe,
            price,
            ema_20,
            macd_line,
            macd_positive: macd_line > 0.0,
            price_above_ema: price > ema_20,
            bar_count,
            as_of,
        }
    }
}

/// Score a timeframe's trend: `0.5·[macd_line > 0] + 0.5·[price > ema_20]`.
///
/// The result is always one of 0.0, 0.5, or 1.0.
pub fn score(indicators: &TimeframeIndicators) -> f64 {
    let mut value = 0.0;
    if indicators.macd_positive {
        value += 0.5;
    }
    if indicators.price_above_ema {
        value += 0.5;
    }
    value
}
