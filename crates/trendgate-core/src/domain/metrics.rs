use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::{Phase, UtcDateTime, ValidationError};

/// Per-day performance aggregate derived from trade history.
///
/// Computed read-only by the metrics layer; the phase manager only consumes
/// these when evaluating transition criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub date: Date,
    pub phase: Phase,
    pub trades_executed: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    pub avg_risk_reward: f64,
    pub total_pnl: f64,
    pub position_sizes: Vec<f64>,
    pub circuit_breaker_trips: u32,
}

impl SessionMetrics {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        date: Date,
        phase: Phase,
        trades_executed: u32,
        wins: u32,
        losses: u32,
        avg_risk_reward: f64,
        total_pnl: f64,
        position_sizes: Vec<f64>,
        circuit_breaker_trips: u32,
    ) -> Result<Self, ValidationError> {
        if !avg_risk_reward.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "avg_risk_reward",
            });
        }
        if !total_pnl.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "total_pnl" });
        }

        let decided = wins + losses;
        let win_rate = if decided == 0 {
            0.0
        } else {
            f64::from(wins) / f64::from(decided)
        };

        Ok(Self {
            date,
            phase,
            trades_executed,
            wins,
            losses,
            win_rate,
            avg_risk_reward,
            total_pnl,
            position_sizes,
            circuit_breaker_trips,
        })
    }
}

/// What initiated a phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTrigger {
    Auto,
    Manual,
}

/// Append-only audit record of one phase transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub id: Uuid,
    pub at: UtcDateTime,
    pub from: Phase,
    pub to: Phase,
    pub trigger: TransitionTrigger,
    pub validation_passed: bool,
    pub override_used: bool,
    pub metrics_snapshot: MetricsSummary,
}

/// Aggregate view over the rolling window used for criteria checks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub sessions: usize,
    pub win_rate: f64,
    pub avg_risk_reward: f64,
    pub total_pnl: f64,
}

impl MetricsSummary {
    /// Summarize a rolling window of sessions. Win rate is pooled over all
    /// decided trades in the window, not a mean of daily rates, so one quiet
    /// day cannot swamp twenty active ones.
    pub fn from_sessions(sessions: &[SessionMetrics]) -> Self {
        if sessions.is_empty() {
            return Self::default();
        }

        let wins: u32 = sessions.iter().map(|s| s.wins).sum();
        let losses: u32 = sessions.iter().map(|s| s.losses).sum();
        let decided = wins + losses;
        let win_rate = if decided == 0 {
            0.0
        } else {
            f64::from(wins) / f64::from(decided)
        };

        let avg_risk_reward =
            sessions.iter().map(|s| s.avg_risk_reward).sum::<f64>() / sessions.len() as f64;
        let total_pnl = sessions.iter().map(|s| s.total_pnl).sum();

        Self {
            sessions: sessions.len(),
            win_rate,
            avg_risk_reward,
            total_pnl,
        }
    }
}

/// Outcome of a phase-transition criteria check. Recomputed on demand,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCriteriaResult {
    pub can_advance: bool,
    pub criteria_met: BTreeMap<String, bool>,
    pub missing_requirements: Vec<String>,
    pub metrics_summary: MetricsSummary,
}
