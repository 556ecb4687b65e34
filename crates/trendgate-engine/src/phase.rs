//! Phase state machine: transition criteria, advancement, and risk gating.
//!
//! The phase manager is the facade the pipeline gates through. It owns the
//! account's current phase (the only mutable state besides the trade
//! counters), validates transitions against rolling-performance criteria,
//! and delegates trade limits and sizing.
//!
//! Failure semantics: criteria shortfalls come back as inspectable results;
//! a non-sequential target or a missing criteria table is a programmer
//! error and fails fast.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use time::Date;
use uuid::Uuid;

use trendgate_core::{
    MetricsSummary, Phase, PhaseConfig, PhaseTransition, SessionMetrics, SizingConfig,
    TransitionCriteria, TransitionTrigger, UtcDateTime, ValidationCriteriaResult,
};

use crate::limiter::{LimitExceeded, TradeCountStore, TradeLimiter};
use crate::sizing::PositionSizer;

/// Persistence seam for the account's phase and its transition audit log.
pub trait PhaseRepository: Send + Sync {
    fn current_phase(&self) -> Phase;
    fn set_phase(&self, phase: Phase);
    fn record_transition(&self, transition: &PhaseTransition);
}

/// Read-only access to per-day session aggregates, most recent first.
pub trait MetricsRepository: Send + Sync {
    fn recent_sessions(&self, limit: usize) -> Vec<SessionMetrics>;
}

/// In-memory phase store. One mutex guards both the phase and the audit log
/// so a transition is recorded atomically with the phase change.
#[derive(Debug)]
pub struct InMemoryPhaseRepository {
    inner: Mutex<PhaseState>,
}

#[derive(Debug)]
struct PhaseState {
    phase: Phase,
    transitions: Vec<PhaseTransition>,
}

impl InMemoryPhaseRepository {
    pub fn new(phase: Phase) -> Self {
        Self {
            inner: Mutex::new(PhaseState {
                phase,
                transitions: Vec::new(),
            }),
        }
    }

    pub fn transitions(&self) -> Vec<PhaseTransition> {
        self.inner.lock().expect("phase lock is not poisoned").transitions.clone()
    }
}

impl Default for InMemoryPhaseRepository {
    fn default() -> Self {
        Self::new(Phase::Experience)
    }
}

impl PhaseRepository for InMemoryPhaseRepository {
    fn current_phase(&self) -> Phase {
        self.inner.lock().expect("phase lock is not poisoned").phase
    }

    fn set_phase(&self, phase: Phase) {
        self.inner.lock().expect("phase lock is not poisoned").phase = phase;
    }

    fn record_transition(&self, transition: &PhaseTransition) {
        self.inner
            .lock()
            .expect("phase lock is not poisoned")
            .transitions
            .push(transition.clone());
    }
}

/// In-memory session metrics, newest pushed last.
#[derive(Debug, Default)]
pub struct InMemoryMetricsRepository {
    sessions: Mutex<Vec<SessionMetrics>>,
}

impl InMemoryMetricsRepository {
    pub fn push_session(&self, session: SessionMetrics) {
        self.sessions
            .lock()
            .expect("metrics lock is not poisoned")
            .push(session);
    }
}

impl MetricsRepository for InMemoryMetricsRepository {
    fn recent_sessions(&self, limit: usize) -> Vec<SessionMetrics> {
        let sessions = self.sessions.lock().expect("metrics lock is not poisoned");
        sessions.iter().rev().take(limit).cloned().collect()
    }
}

/// Phase gating errors.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// Fatal: transitions move exactly one step forward.
    #[error("non-sequential transition: '{current}' may only advance to '{expected}', got '{requested}'")]
    NonSequential {
        current: Phase,
        expected: String,
        requested: Phase,
    },

    /// Fatal: the config carries no criteria table for this target.
    #[error("no transition criteria configured for target phase '{target}'")]
    MissingCriteria { target: Phase },

    /// Recoverable: the rolling window does not clear the criteria floors.
    /// Carries the full result for inspection.
    #[error("phase transition criteria not met: {}", .0.missing_requirements.join("; "))]
    CriteriaNotMet(Box<ValidationCriteriaResult>),

    #[error(transparent)]
    Limit(#[from] LimitExceeded),
}

/// Facade over transition validation, advancement, trade limits, and sizing.
pub struct PhaseManager {
    config: PhaseConfig,
    repository: Arc<dyn PhaseRepository>,
    metrics: Arc<dyn MetricsRepository>,
    limiter: TradeLimiter<Arc<dyn TradeCountStore>>,
    sizer: PositionSizer,
}

impl PhaseManager {
    pub fn new(
        config: PhaseConfig,
        sizing: SizingConfig,
        repository: Arc<dyn PhaseRepository>,
        metrics: Arc<dyn MetricsRepository>,
        trade_counts: Arc<dyn TradeCountStore>,
    ) -> Self {
        let limiter = TradeLimiter::new(config.trade_caps.clone(), trade_counts);
        Self {
            config,
            repository,
            metrics,
            limiter,
            sizer: PositionSizer::new(sizing),
        }
    }

    pub fn current_phase(&self) -> Phase {
        self.repository.current_phase()
    }

    /// Check whether the account may advance to `target`, evaluated over
    /// `rolling_window` sessions (the configured window when `None`).
    ///
    /// # Errors
    ///
    /// [`PhaseError::NonSequential`] if `target` is not exactly the next
    /// phase; [`PhaseError::MissingCriteria`] if the config holds no table
    /// for it. Criteria shortfalls are not errors here; they come back in
    /// the result.
    pub fn validate_transition(
        &self,
        target: Phase,
        rolling_window: Option<usize>,
    ) -> Result<ValidationCriteriaResult, PhaseError> {
        let current = self.repository.current_phase();
        self.require_sequential(current, target)?;

        let criteria = self
            .config
            .criteria_for(target)
            .copied()
            .ok_or(PhaseError::MissingCriteria { target })?;

        let window = rolling_window.unwrap_or(self.config.rolling_window);
        let sessions = self.metrics.recent_sessions(window);
        Ok(evaluate_criteria(&criteria, &sessions))
    }

    /// Advance to `target`, emitting and persisting a [`PhaseTransition`].
    ///
    /// With `force`, criteria are bypassed and `override_used` is recorded;
    /// the sequential-order check is never bypassed.
    pub fn advance_phase(
        &self,
        target: Phase,
        force: bool,
    ) -> Result<PhaseTransition, PhaseError> {
        let current = self.repository.current_phase();
        self.require_sequential(current, target)?;

        // Criteria are evaluated even under force so the audit record shows
        // what the window looked like at the moment of the override.
        let result = self.validate_transition(target, None)?;
        if !force && !result.can_advance {
            return Err(PhaseError::CriteriaNotMet(Box::new(result)));
        }

        let transition = PhaseTransition {
            id: Uuid::new_v4(),
            at: UtcDateTime::now(),
            from: current,
            to: target,
            trigger: if force {
                TransitionTrigger::Manual
            } else {
                TransitionTrigger::Auto
            },
            validation_passed: result.can_advance,
            override_used: force,
            metrics_snapshot: result.metrics_summary,
        };

        self.repository.record_transition(&transition);
        self.repository.set_phase(target);
        Ok(transition)
    }

    /// Consume one trade slot for today's date under the current phase.
    pub fn enforce_trade_limit(&self, date: Date) -> Result<(), PhaseError> {
        let phase = self.repository.current_phase();
        self.limiter.enforce(phase, date)?;
        Ok(())
    }

    /// Dollar size for the next trade under the current phase.
    pub fn position_size(
        &self,
        consecutive_wins: u32,
        rolling_win_rate: f64,
        portfolio_value: Option<f64>,
    ) -> f64 {
        self.position_size_for(
            self.repository.current_phase(),
            consecutive_wins,
            rolling_win_rate,
            portfolio_value,
        )
    }

    /// Dollar size for an explicit phase.
    pub fn position_size_for(
        &self,
        phase: Phase,
        consecutive_wins: u32,
        rolling_win_rate: f64,
        portfolio_value: Option<f64>,
    ) -> f64 {
        self.sizer
            .position_size(phase, consecutive_wins, rolling_win_rate, portfolio_value)
    }

    fn require_sequential(&self, current: Phase, target: Phase) -> Result<(), PhaseError> {
        match current.next() {
            Some(next) if next == target => Ok(()),
            next => Err(PhaseError::NonSequential {
                current,
                expected: next
                    .map(|p| p.as_str().to_owned())
                    .unwrap_or_else(|| String::from("<terminal>")),
                requested: target,
            }),
        }
    }
}

/// Compare a rolling window against one transition's criteria floors.
fn evaluate_criteria(
    criteria: &TransitionCriteria,
    sessions: &[SessionMetrics],
) -> ValidationCriteriaResult {
    let summary = MetricsSummary::from_sessions(sessions);

    let mut criteria_met = BTreeMap::new();
    let mut missing = Vec::new();

    let sessions_ok = summary.sessions >= criteria.min_sessions;
    criteria_met.insert(String::from("min_sessions"), sessions_ok);
    if !sessions_ok {
        missing.push(format!(
            "need at least {} sessions, have {}",
            criteria.min_sessions, summary.sessions
        ));
    }

    let win_rate_ok = summary.win_rate >= criteria.min_win_rate;
    criteria_met.insert(String::from("min_win_rate"), win_rate_ok);
    if !win_rate_ok {
        missing.push(format!(
            "win rate {:.2} below required {:.2}",
            summary.win_rate, criteria.min_win_rate
        ));
    }

    let rr_ok = summary.avg_risk_reward >= criteria.min_avg_risk_reward;
    criteria_met.insert(String::from("min_avg_risk_reward"), rr_ok);
    if !rr_ok {
        missing.push(format!(
            "average risk/reward {:.2} below required {:.2}",
            summary.avg_risk_reward, criteria.min_avg_risk_reward
        ));
    }

    ValidationCriteriaResult {
        can_advance: sessions_ok && win_rate_ok && rr_ok,
        criteria_met,
        missing_requirements: missing,
        metrics_summary: summary,
    }
}
