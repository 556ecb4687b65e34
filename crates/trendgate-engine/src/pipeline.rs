//! The validate -> gate -> execute pipeline.
//!
//! One pipeline run is an independent unit of work; many may run
//! concurrently over the same shared collaborators. Every stage fails
//! closed: a blocked or degraded validation, an exhausted trade cap, or a
//! zero-size phase all stop the run before any order reaches the exchange.
//! Cancellation is cooperative and only honored between stages; the
//! executor's retry loop always runs to a terminal result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use trendgate_core::{ExecutionResult, OrderRequest, Phase, UtcDateTime, ValidationError};

use crate::executor::OrderExecutor;
use crate::limiter::LimitExceeded;
use crate::phase::{MetricsRepository, PhaseError, PhaseManager};
use crate::validator::{
    MultiTimeframeValidator, TimeframeValidationResult, ValidationStatus, ValidatorError,
};

/// Cooperative cancellation handle, checked between pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pipeline stage names for cancellation reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validation,
    Gating,
    Execution,
}

/// Terminal outcome of one pipeline run. Every variant carries enough to
/// explain itself in an audit log.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Trend validation blocked the trade.
    Blocked(TimeframeValidationResult),
    /// Market data degraded; fail closed without trading.
    Degraded(TimeframeValidationResult),
    /// The daily trade cap for the current phase is spent.
    LimitReached(LimitExceeded),
    /// The current phase sizes to zero (or below one share); nothing to send.
    NoCapital { phase: Phase, size: f64 },
    /// Cancelled between stages.
    Cancelled(PipelineStage),
    /// Order submitted; terminal execution result attached.
    Executed {
        validation: TimeframeValidationResult,
        execution: ExecutionResult,
    },
}

/// Errors a pipeline run can surface. Limit exhaustion and blocks are
/// outcomes, not errors; these are caller mistakes or fatal configuration
/// problems.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] ValidationError),

    #[error(transparent)]
    Phase(PhaseError),
}

/// Caller-supplied risk inputs the core cannot derive from daily
/// aggregates alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizingInputs {
    pub consecutive_wins: u32,
    pub portfolio_value: Option<f64>,
}

/// Facade wiring the validator, the phase gate, and the executor.
pub struct TradePipeline {
    validator: MultiTimeframeValidator,
    phases: Arc<PhaseManager>,
    executor: OrderExecutor,
    metrics: Arc<dyn MetricsRepository>,
    rolling_window: usize,
}

impl TradePipeline {
    pub fn new(
        validator: MultiTimeframeValidator,
        phases: Arc<PhaseManager>,
        executor: OrderExecutor,
        metrics: Arc<dyn MetricsRepository>,
        rolling_window: usize,
    ) -> Self {
        Self {
            validator,
            phases,
            executor,
            metrics,
            rolling_window,
        }
    }

    /// Run the full pipeline for one candidate symbol.
    pub async fn run(
        &self,
        trader_id: &str,
        symbol: &str,
        current_price: f64,
        inputs: SizingInputs,
        cancel: &CancelFlag,
    ) -> Result<PipelineOutcome, PipelineError> {
        if cancel.is_cancelled() {
            return Ok(PipelineOutcome::Cancelled(PipelineStage::Validation));
        }

        let validation = match self.validator.validate(symbol, current_price).await {
            Ok(result) => result,
            Err(ValidatorError::InvalidInput(error)) => return Err(error.into()),
        };

        match validation.status {
            ValidationStatus::Pass => {}
            ValidationStatus::Block => return Ok(PipelineOutcome::Blocked(validation)),
            ValidationStatus::Degraded => return Ok(PipelineOutcome::Degraded(validation)),
        }

        if cancel.is_cancelled() {
            return Ok(PipelineOutcome::Cancelled(PipelineStage::Gating));
        }

        let rolling_win_rate = self.rolling_win_rate();
        let size = self.phases.position_size(
            inputs.consecutive_wins,
            rolling_win_rate,
            inputs.portfolio_value,
        );

        // Sizing is resolved before the limiter so a run that cannot afford
        // a single share never burns a daily trade slot.
        let quantity = (size / current_price).floor() as u32;
        if quantity == 0 {
            return Ok(PipelineOutcome::NoCapital {
                phase: self.phases.current_phase(),
                size,
            });
        }

        let today = UtcDateTime::now().trading_date();
        match self.phases.enforce_trade_limit(today) {
            Ok(()) => {}
            Err(PhaseError::Limit(limit)) => return Ok(PipelineOutcome::LimitReached(limit)),
            Err(other) => return Err(PipelineError::Phase(other)),
        }

        if cancel.is_cancelled() {
            return Ok(PipelineOutcome::Cancelled(PipelineStage::Execution));
        }

        let order = OrderRequest::market(validation.symbol.clone(), quantity)?;
        let execution = self.executor.execute_order(trader_id, &order).await?;

        Ok(PipelineOutcome::Executed {
            validation,
            execution,
        })
    }

    /// Pooled win rate over the rolling window, zero with no history.
    fn rolling_win_rate(&self) -> f64 {
        let sessions = self.metrics.recent_sessions(self.rolling_window);
        trendgate_core::MetricsSummary::from_sessions(&sessions).win_rate
    }
}
