//! Configuration surface for the decision-to-execution core.
//!
//! Everything numeric that gates a trade is configuration, not a hardcoded
//! invariant: timeframe weights and threshold, retry policies, per-phase
//! trade caps, transition criteria tables, and sizing constants. The whole
//! tree is serde-deserializable and validated once at load; a config that
//! passes [`EngineConfig::validate`] cannot produce an out-of-range gate at
//! runtime.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Phase, RetryPolicy, Timeframe};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// One timeframe's share of the aggregate trend score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeConfig {
    pub timeframe: Timeframe,
    pub weight: f64,
    /// Minimum bars required for this timeframe's indicators.
    pub min_bars: usize,
}

impl TimeframeConfig {
    pub fn new(timeframe: Timeframe, weight: f64) -> Self {
        Self {
            timeframe,
            weight,
            min_bars: timeframe.default_min_bars(),
        }
    }
}

/// Multi-timeframe validator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub timeframes: Vec<TimeframeConfig>,
    /// Aggregate score at or above which validation passes.
    pub pass_threshold: f64,
    /// Retry policy for per-timeframe market-data fetches.
    pub fetch_retry: RetryPolicy,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            timeframes: vec![
                TimeframeConfig::new(Timeframe::Daily, 0.6),
                TimeframeConfig::new(Timeframe::FourHour, 0.4),
            ],
            pass_threshold: 0.5,
            fetch_retry: RetryPolicy::default(),
        }
    }
}

impl ValidatorConfig {
    /// A validator watching only the daily timeframe at full weight.
    pub fn daily_only() -> Self {
        Self {
            timeframes: vec![TimeframeConfig::new(Timeframe::Daily, 1.0)],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeframes.is_empty() {
            return Err(ConfigError::NoTimeframes);
        }

        let mut seen: Vec<Timeframe> = Vec::with_capacity(self.timeframes.len());
        for tf in &self.timeframes {
            if seen.contains(&tf.timeframe) {
                return Err(ConfigError::DuplicateTimeframe {
                    timeframe: tf.timeframe.as_str(),
                });
            }
            seen.push(tf.timeframe);

            if !tf.weight.is_finite() || tf.weight <= 0.0 || tf.weight > 1.0 {
                return Err(ConfigError::InvalidWeight {
                    timeframe: tf.timeframe.as_str(),
                });
            }
            if tf.min_bars == 0 {
                return Err(ConfigError::InvalidMinBars {
                    timeframe: tf.timeframe.as_str(),
                });
            }
        }

        let sum: f64 = self.timeframes.iter().map(|tf| tf.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSumToOne { sum });
        }

        if !self.pass_threshold.is_finite()
            || self.pass_threshold <= 0.0
            || self.pass_threshold > 1.0
        {
            return Err(ConfigError::InvalidThreshold {
                value: self.pass_threshold,
            });
        }

        self.fetch_retry.validate()
    }
}

/// Rolling-performance floors one transition must clear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionCriteria {
    pub min_sessions: usize,
    pub min_win_rate: f64,
    pub min_avg_risk_reward: f64,
}

/// Phase state machine settings: criteria tables, trade caps, and the
/// rolling window the criteria are evaluated over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Criteria keyed by the *target* phase of the transition.
    pub criteria: BTreeMap<Phase, TransitionCriteria>,
    /// Daily trade caps; phases absent from this map are uncapped.
    pub trade_caps: BTreeMap<Phase, u32>,
    pub rolling_window: usize,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        let mut criteria = BTreeMap::new();
        criteria.insert(
            Phase::ProofOfConcept,
            TransitionCriteria {
                min_sessions: 20,
                min_win_rate: 0.45,
                min_avg_risk_reward: 1.5,
            },
        );
        criteria.insert(
            Phase::RealMoneyTrial,
            TransitionCriteria {
                min_sessions: 20,
                min_win_rate: 0.50,
                min_avg_risk_reward: 1.8,
            },
        );
        criteria.insert(
            Phase::Scaling,
            TransitionCriteria {
                min_sessions: 30,
                min_win_rate: 0.55,
                min_avg_risk_reward: 2.0,
            },
        );

        let mut trade_caps = BTreeMap::new();
        trade_caps.insert(Phase::ProofOfConcept, 1);

        Self {
            criteria,
            trade_caps,
            rolling_window: 30,
        }
    }
}

impl PhaseConfig {
    pub fn criteria_for(&self, target: Phase) -> Option<&TransitionCriteria> {
        self.criteria.get(&target)
    }

    pub fn cap_for(&self, phase: Phase) -> Option<u32> {
        self.trade_caps.get(&phase).copied()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rolling_window == 0 {
            return Err(ConfigError::InvalidRollingWindow);
        }

        // Every reachable transition target needs a criteria table.
        for phase in Phase::ALL {
            if let Some(target) = phase.next() {
                if !self.criteria.contains_key(&target) {
                    return Err(ConfigError::MissingCriteria {
                        target: target.as_str(),
                    });
                }
            }
        }

        for (phase, cap) in &self.trade_caps {
            if *cap == 0 {
                return Err(ConfigError::InvalidTradeCap {
                    phase: phase.as_str(),
                });
            }
        }

        Ok(())
    }
}

/// Position sizing constants. Dollar-denominated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingConfig {
    pub proof_of_concept_size: f64,
    pub real_money_trial_size: f64,
    pub scaling_base: f64,
    /// Bonus per complete winning streak of `streak_length` trades.
    pub streak_bonus: f64,
    pub streak_length: u32,
    /// Bonus applied once the rolling win rate clears `win_rate_floor`.
    pub win_rate_bonus: f64,
    pub win_rate_floor: f64,
    pub hard_cap: f64,
    /// Fraction of portfolio value the size may never exceed.
    pub portfolio_cap_fraction: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            proof_of_concept_size: 100.0,
            real_money_trial_size: 200.0,
            scaling_base: 200.0,
            streak_bonus: 100.0,
            streak_length: 5,
            win_rate_bonus: 200.0,
            win_rate_floor: 0.70,
            hard_cap: 2_000.0,
            portfolio_cap_fraction: 0.05,
        }
    }
}

/// Order executor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub submit_retry: RetryPolicy,
    /// Upper bound on a single submission attempt.
    pub submit_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            submit_retry: RetryPolicy::default(),
            submit_timeout: Duration::from_secs(5),
        }
    }
}

/// Root configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub validator: ValidatorConfig,
    pub phase: PhaseConfig,
    pub sizing: SizingConfig,
    pub executor: ExecutorConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validator.validate()?;
        self.phase.validate()?;
        self.executor.submit_retry.validate()?;
        Ok(())
    }

    /// Deserialize from JSON and validate in one step.
    pub fn from_json(input: &str) -> Result<Self, crate::CoreError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().expect("default config");
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let config = ValidatorConfig {
            timeframes: vec![
                TimeframeConfig::new(Timeframe::Daily, 0.6),
                TimeframeConfig::new(Timeframe::FourHour, 0.3),
            ],
            ..ValidatorConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeightsDoNotSumToOne { .. })
        ));
    }

    #[test]
    fn rejects_empty_timeframe_set() {
        let config = ValidatorConfig {
            timeframes: vec![],
            ..ValidatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoTimeframes)));
    }

    #[test]
    fn rejects_duplicate_timeframe() {
        let config = ValidatorConfig {
            timeframes: vec![
                TimeframeConfig::new(Timeframe::Daily, 0.5),
                TimeframeConfig::new(Timeframe::Daily, 0.5),
            ],
            ..ValidatorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateTimeframe { .. })
        ));
    }

    #[test]
    fn rejects_missing_criteria_table() {
        let mut config = PhaseConfig::default();
        config.criteria.remove(&Phase::Scaling);

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCriteria { target: "scaling" })
        ));
    }

    #[test]
    fn rejects_zero_trade_cap() {
        let mut config = PhaseConfig::default();
        config.trade_caps.insert(Phase::ProofOfConcept, 0);

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTradeCap { .. })
        ));
    }

    #[test]
    fn daily_only_preset_is_valid() {
        ValidatorConfig::daily_only().validate().expect("preset");
    }

    #[test]
    fn round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let loaded = EngineConfig::from_json(&json).expect("load");
        assert_eq!(loaded, config);
    }
}
