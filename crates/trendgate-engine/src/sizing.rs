//! Deterministic, phase- and streak-aware position sizing.

use trendgate_core::{Phase, SizingConfig};

/// Position sizer: a pure function of phase, streak, rolling win rate, and
/// optional portfolio value, with a hard dollar cap on top.
#[derive(Debug, Clone, Copy)]
pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    /// Dollar size for the next trade.
    ///
    /// Experience trades are always zero (paper only). Scaling grows from a
    /// base by a bonus per complete winning streak plus a rolling-win-rate
    /// bonus, then applies the hard cap and the portfolio-fraction cap,
    /// whichever is lower.
    pub fn position_size(
        &self,
        phase: Phase,
        consecutive_wins: u32,
        rolling_win_rate: f64,
        portfolio_value: Option<f64>,
    ) -> f64 {
        let cfg = &self.config;

        let raw = match phase {
            Phase::Experience => 0.0,
            Phase::ProofOfConcept => cfg.proof_of_concept_size,
            Phase::RealMoneyTrial => cfg.real_money_trial_size,
            Phase::Scaling => {
                let complete_streaks = consecutive_wins / cfg.streak_length;
                let mut size = cfg.scaling_base + f64::from(complete_streaks) * cfg.streak_bonus;
                if rolling_win_rate >= cfg.win_rate_floor {
                    size += cfg.win_rate_bonus;
                }
                size
            }
        };

        let capped = raw.min(cfg.hard_cap);
        match portfolio_value {
            Some(value) if value.is_finite() && value > 0.0 => {
                capped.min(value * cfg.portfolio_cap_fraction)
            }
            _ => capped,
        }
    }
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self::new(SizingConfig::default())
    }
}
