// Multi-timeframe trend validation behavior: scoring, weighting, retries,
// and degradation under market-data trouble.

use trendgate_core::{Timeframe, ValidationError, ValidatorConfig};
use trendgate_engine::{MultiTimeframeValidator, ValidationStatus, ValidatorError};
use trendgate_tests::{
    make_bars, make_trend_bars, Arc, FixedIndicators, ScriptedMarketData, SeriesIndicators,
};

fn daily_only_validator(
    market_data: ScriptedMarketData,
    indicators: FixedIndicators,
) -> MultiTimeframeValidator {
    MultiTimeframeValidator::new(
        ValidatorConfig::daily_only(),
        Arc::new(market_data),
        Arc::new(indicators),
    )
    .expect("valid config")
}

#[tokio::test]
async fn bullish_daily_passes_with_full_score() {
    // Given a daily series where MACD is positive and price sits above EMA20
    let market_data =
        ScriptedMarketData::new().with_bars(Timeframe::Daily, make_bars(40, 148.0));
    let validator = daily_only_validator(
        market_data,
        FixedIndicators {
            ema_20: 145.0,
            macd_line: 2.50,
        },
    );

    // When AAPL is validated at 150.00
    let result = validator.validate("AAPL", 150.0).await.expect("validation");

    // Then it passes with the full aggregate score and a bullish reason
    assert_eq!(result.status, ValidationStatus::Pass);
    assert!(result.passed());
    assert!((result.aggregate_score - 1.0).abs() < f64::EPSILON);
    assert_eq!(result.reasons, vec!["Daily timeframe validates bullish"]);

    let score = &result.timeframe_scores[0];
    assert_eq!(score.timeframe, Timeframe::Daily);
    assert_eq!(score.score, Some(1.0));
    let indicators = score.indicators.as_ref().expect("indicators");
    assert!(indicators.macd_positive);
    assert!(indicators.price_above_ema);
}

#[tokio::test]
async fn bearish_daily_blocks() {
    let market_data =
        ScriptedMarketData::new().with_bars(Timeframe::Daily, make_bars(40, 152.0));
    let validator = daily_only_validator(
        market_data,
        FixedIndicators {
            ema_20: 155.0,
            macd_line: -1.20,
        },
    );

    let result = validator.validate("AAPL", 150.0).await.expect("validation");

    assert_eq!(result.status, ValidationStatus::Block);
    assert!(!result.passed());
    assert_eq!(result.aggregate_score, 0.0);
    assert_eq!(result.reasons, vec!["Daily timeframe validates bearish"]);
}

#[tokio::test]
async fn mixed_signals_land_exactly_on_the_threshold() {
    // MACD positive but price below EMA: half credit, which with a single
    // full-weight timeframe meets the default 0.5 threshold exactly.
    let market_data =
        ScriptedMarketData::new().with_bars(Timeframe::Daily, make_bars(40, 150.0));
    let validator = daily_only_validator(
        market_data,
        FixedIndicators {
            ema_20: 155.0,
            macd_line: 2.00,
        },
    );

    let result = validator.validate("AAPL", 150.0).await.expect("validation");

    assert_eq!(result.status, ValidationStatus::Pass);
    assert!((result.aggregate_score - 0.5).abs() < 1e-12);
    assert_eq!(result.reasons, vec!["Daily timeframe is mixed"]);
}

#[tokio::test]
async fn price_equal_to_ema_is_not_above_it() {
    let market_data =
        ScriptedMarketData::new().with_bars(Timeframe::Daily, make_bars(40, 150.0));
    let validator = daily_only_validator(
        market_data,
        FixedIndicators {
            ema_20: 150.0,
            macd_line: -0.10,
        },
    );

    let result = validator.validate("AAPL", 150.0).await.expect("validation");

    assert_eq!(result.status, ValidationStatus::Block);
    assert_eq!(result.aggregate_score, 0.0);
}

#[tokio::test]
async fn weights_split_the_aggregate_across_timeframes() {
    // Given a bullish daily trend and a bearish 4-hour trend
    let market_data = ScriptedMarketData::new()
        .with_bars(Timeframe::Daily, make_trend_bars(80, 130.0, 0.25))
        .with_bars(Timeframe::FourHour, make_trend_bars(80, 170.0, -0.25));
    let validator = MultiTimeframeValidator::new(
        ValidatorConfig::default(),
        Arc::new(market_data),
        Arc::new(SeriesIndicators),
    )
    .expect("valid config");

    // When validated at a price above the daily mean but below the 4-hour one
    let result = validator.validate("AAPL", 150.0).await.expect("validation");

    // Then only the daily weight contributes, which still clears the bar
    assert_eq!(result.status, ValidationStatus::Pass);
    assert!((result.aggregate_score - 0.6).abs() < 1e-12);
    assert_eq!(
        result.reasons,
        vec![
            "Daily timeframe validates bullish",
            "4-hour timeframe validates bearish",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn transient_fetch_failures_are_retried_to_success() {
    let market_data = ScriptedMarketData::new()
        .with_bars(Timeframe::Daily, make_bars(40, 148.0))
        .failing_first(Timeframe::Daily, 2);
    let validator = daily_only_validator(
        market_data,
        FixedIndicators {
            ema_20: 145.0,
            macd_line: 2.50,
        },
    );

    let result = validator.validate("AAPL", 150.0).await.expect("validation");

    assert_eq!(result.status, ValidationStatus::Pass);
    assert!((result.aggregate_score - 1.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_degrade_instead_of_erroring() {
    // Three failures exhausts the default fetch policy.
    let market_data = ScriptedMarketData::new().failing_first(Timeframe::Daily, 3);
    let validator = daily_only_validator(
        market_data,
        FixedIndicators {
            ema_20: 145.0,
            macd_line: 2.50,
        },
    );

    let result = validator.validate("AAPL", 150.0).await.expect("validation");

    assert_eq!(result.status, ValidationStatus::Degraded);
    assert_eq!(result.aggregate_score, 0.0);
    assert!(result.timeframe_scores[0].degraded());
    assert_eq!(
        result.reasons,
        vec!["Daily timeframe data unavailable after retries"]
    );
}

#[tokio::test(start_paused = true)]
async fn one_degraded_timeframe_fails_closed_despite_a_passing_score() {
    // Daily alone contributes 0.6, above the threshold, but the degraded
    // 4-hour slice still forces a Degraded verdict.
    let market_data = ScriptedMarketData::new()
        .with_bars(Timeframe::Daily, make_trend_bars(80, 130.0, 0.25))
        .failing_first(Timeframe::FourHour, 3);
    let validator = MultiTimeframeValidator::new(
        ValidatorConfig::default(),
        Arc::new(market_data),
        Arc::new(SeriesIndicators),
    )
    .expect("valid config");

    let result = validator.validate("AAPL", 150.0).await.expect("validation");

    assert_eq!(result.status, ValidationStatus::Degraded);
    assert!(!result.passed());
    assert!((result.aggregate_score - 0.6).abs() < 1e-12);
    assert!(!result.timeframe_scores[0].degraded());
    assert!(result.timeframe_scores[1].degraded());
}

#[tokio::test]
async fn short_bar_series_degrades_the_timeframe() {
    // Ten bars against a 30-bar daily minimum.
    let market_data =
        ScriptedMarketData::new().with_bars(Timeframe::Daily, make_bars(10, 148.0));
    let validator = daily_only_validator(
        market_data,
        FixedIndicators {
            ema_20: 145.0,
            macd_line: 2.50,
        },
    );

    let result = validator.validate("AAPL", 150.0).await.expect("validation");

    assert_eq!(result.status, ValidationStatus::Degraded);
    assert!(result.timeframe_scores[0].degraded());
}

#[tokio::test]
async fn malformed_inputs_are_rejected_before_any_fetch() {
    let market_data = ScriptedMarketData::new();
    let calls = Arc::new(market_data);
    let validator = MultiTimeframeValidator::new(
        ValidatorConfig::daily_only(),
        calls.clone(),
        Arc::new(FixedIndicators {
            ema_20: 145.0,
            macd_line: 2.50,
        }),
    )
    .expect("valid config");

    let empty = validator.validate("  ", 150.0).await;
    assert!(matches!(
        empty,
        Err(ValidatorError::InvalidInput(ValidationError::EmptySymbol))
    ));

    let zero_price = validator.validate("AAPL", 0.0).await;
    assert!(matches!(
        zero_price,
        Err(ValidatorError::InvalidInput(
            ValidationError::NonPositiveValue { .. }
        ))
    ));

    let nan_price = validator.validate("AAPL", f64::NAN).await;
    assert!(nan_price.is_err());

    assert_eq!(calls.fetch_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}
