//! Idempotent, retrying order execution.
//!
//! Each request runs an explicit state machine:
//! `Attempt(n) -> {Success | Retryable -> Attempt(n+1) | Fatal -> Failure |
//! Exhausted -> Failure}`. Before every retry of a *transient* failure the
//! exchange is queried by idempotent key; a hit means the previous attempt
//! landed and its acknowledgment was lost, so the call resolves as success
//! without another live submission. That lookup is the exactly-once
//! guarantee.

use std::sync::Arc;

use trendgate_core::{
    EventPublisher, ExchangeAdapter, ExchangeError, ExchangeErrorKind, ExecutionResult,
    ExecutorConfig, IdempotentKey, OrderEvent, OrderRequest, OrderStatus, UtcDateTime,
    ValidationError, ORDER_EVENTS_CHANNEL,
};

/// Decision after one failed attempt. Exhaustive by construction: every
/// [`ExchangeErrorKind`] maps to exactly one arm.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttemptOutcome {
    /// Transport may have delivered the order; retry, checking for a
    /// duplicate first.
    RetryWithDuplicateCheck,
    /// The exchange positively rejected the attempt; retry without the
    /// duplicate check.
    RetryDirect,
    /// No retry can help, or the error is unclassified. Stop now.
    Stop,
}

fn classify(error: &ExchangeError) -> AttemptOutcome {
    if error.is_fatal() {
        return AttemptOutcome::Stop;
    }
    if error.is_transient() {
        return AttemptOutcome::RetryWithDuplicateCheck;
    }
    match error.kind() {
        ExchangeErrorKind::Rejected => AttemptOutcome::RetryDirect,
        // Unknown errors stop immediately; retrying what we cannot classify
        // risks a duplicate.
        _ => AttemptOutcome::Stop,
    }
}

/// Idempotent order executor.
///
/// Stateless across calls; safe for concurrent use. Once a call starts its
/// retry loop it always runs to a terminal result.
pub struct OrderExecutor {
    config: ExecutorConfig,
    exchange: Arc<dyn ExchangeAdapter>,
    publisher: Arc<dyn EventPublisher>,
}

impl OrderExecutor {
    pub fn new(
        config: ExecutorConfig,
        exchange: Arc<dyn ExchangeAdapter>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            exchange,
            publisher,
        }
    }

    /// Execute one order, retrying transient failures with exponential
    /// backoff and duplicate suppression.
    ///
    /// # Errors
    ///
    /// Only caller input errors (empty trader id) are returned as `Err`;
    /// every exchange outcome, including failure, is reported through the
    /// [`ExecutionResult`].
    pub async fn execute_order(
        &self,
        trader_id: &str,
        order: &OrderRequest,
    ) -> Result<ExecutionResult, ValidationError> {
        if trader_id.trim().is_empty() {
            return Err(ValidationError::EmptyTraderId);
        }

        let key = IdempotentKey::derive(trader_id, order, UtcDateTime::now());
        self.emit(OrderEvent::started(&key, trader_id)).await;

        let result = self.submit_with_retry(order, &key).await;

        if result.success {
            if result.retry_count > 0 {
                self.emit(OrderEvent::recovered(&key, trader_id, result.retry_count + 1))
                    .await;
            }
            if let Some(order_id) = &result.order_id {
                self.emit(OrderEvent::executed(&key, trader_id, order_id)).await;
            }
        } else {
            self.emit(OrderEvent::failed(
                &key,
                trader_id,
                result.error.as_deref().unwrap_or("unknown error"),
                result.error_code.as_deref().unwrap_or("exchange.unknown"),
            ))
            .await;
        }

        Ok(result)
    }

    async fn submit_with_retry(
        &self,
        order: &OrderRequest,
        key: &IdempotentKey,
    ) -> ExecutionResult {
        let policy = &self.config.submit_retry;
        let mut retries = 0u32;

        for attempt in 1..=policy.max_attempts {
            let error = match self.submit_once(order, key).await {
                Ok(status) => return success(status, retries),
                Err(error) => error,
            };

            match classify(&error) {
                AttemptOutcome::Stop => {
                    return ExecutionResult::failed(error.message(), error.code(), retries);
                }
                outcome @ (AttemptOutcome::RetryWithDuplicateCheck | AttemptOutcome::RetryDirect) => {
                    if !policy.allows_retry(attempt) {
                        return ExecutionResult::failed(
                            format!(
                                "retries exhausted after {attempt} attempts: {}",
                                error.message()
                            ),
                            error.code(),
                            retries,
                        );
                    }

                    // A lost acknowledgment shows up here: the exchange
                    // already holds the order even though the submit failed.
                    if outcome == AttemptOutcome::RetryWithDuplicateCheck {
                        if let Ok(Some(status)) =
                            self.exchange.get_order_by_idempotent_key(key).await
                        {
                            return success(status, retries);
                        }
                    }

                    tokio::time::sleep(policy.delay_after_attempt(attempt)).await;
                    retries += 1;
                }
            }
        }

        // Unreachable: the loop always returns before running off the end,
        // but fail closed if it ever does.
        ExecutionResult::failed("retry loop ended without a terminal state", "exchange.unknown", retries)
    }

    /// One submission attempt, bounded by the configured per-attempt timeout.
    async fn submit_once(
        &self,
        order: &OrderRequest,
        key: &IdempotentKey,
    ) -> Result<OrderStatus, ExchangeError> {
        match tokio::time::timeout(
            self.config.submit_timeout,
            self.exchange.submit_order(order, key),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ExchangeError::timeout(format!(
                "submission attempt exceeded {:?}",
                self.config.submit_timeout
            ))),
        }
    }

    /// Publish best-effort; a dead event bus never fails the order.
    async fn emit(&self, event: OrderEvent) {
        let _ = self
            .publisher
            .publish(ORDER_EVENTS_CHANNEL, event.to_value())
            .await;
    }
}

fn success(status: OrderStatus, retries: u32) -> ExecutionResult {
    ExecutionResult::succeeded(status.order_id, status.fill_price, retries)
}
