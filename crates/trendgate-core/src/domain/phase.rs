use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Risk tier the trading account currently operates in.
///
/// Phases are totally ordered and advance forward only, one step at a time.
/// The phase gates both position size and trade frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Experience,
    ProofOfConcept,
    RealMoneyTrial,
    Scaling,
}

impl Phase {
    pub const ALL: [Self; 4] = [
        Self::Experience,
        Self::ProofOfConcept,
        Self::RealMoneyTrial,
        Self::Scaling,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Experience => "experience",
            Self::ProofOfConcept => "proof_of_concept",
            Self::RealMoneyTrial => "real_money_trial",
            Self::Scaling => "scaling",
        }
    }

    /// The only phase a legal transition may target from `self`.
    /// `None` once the terminal phase is reached.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Experience => Some(Self::ProofOfConcept),
            Self::ProofOfConcept => Some(Self::RealMoneyTrial),
            Self::RealMoneyTrial => Some(Self::Scaling),
            Self::Scaling => None,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "experience" => Ok(Self::Experience),
            "proof_of_concept" => Ok(Self::ProofOfConcept),
            "real_money_trial" => Ok(Self::RealMoneyTrial),
            "scaling" => Ok(Self::Scaling),
            other => Err(ValidationError::InvalidPhase {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_totally_ordered() {
        assert!(Phase::Experience < Phase::ProofOfConcept);
        assert!(Phase::ProofOfConcept < Phase::RealMoneyTrial);
        assert!(Phase::RealMoneyTrial < Phase::Scaling);
    }

    #[test]
    fn next_walks_the_ladder_one_step() {
        assert_eq!(Phase::Experience.next(), Some(Phase::ProofOfConcept));
        assert_eq!(Phase::ProofOfConcept.next(), Some(Phase::RealMoneyTrial));
        assert_eq!(Phase::RealMoneyTrial.next(), Some(Phase::Scaling));
        assert_eq!(Phase::Scaling.next(), None);
    }

    #[test]
    fn parses_phase() {
        let phase = Phase::from_str("Proof_Of_Concept").expect("must parse");
        assert_eq!(phase, Phase::ProofOfConcept);
    }

    #[test]
    fn rejects_unknown_phase() {
        let err = Phase::from_str("warmup").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidPhase { .. }));
    }
}
