use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Timeframes the trend validator may be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "4h")]
    FourHour,
}

impl Timeframe {
    pub const ALL: [Self; 2] = [Self::Daily, Self::FourHour];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::FourHour => "4h",
        }
    }

    /// Human-readable label used in audit reason strings.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::FourHour => "4-hour",
        }
    }

    /// Minimum bar count required for indicator computation to be
    /// meaningful on this timeframe.
    pub const fn default_min_bars(self) -> usize {
        match self {
            Self::Daily => 30,
            Self::FourHour => 72,
        }
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1d" => Ok(Self::Daily),
            "4h" => Ok(Self::FourHour),
            other => Err(ValidationError::InvalidTimeframe {
                value: other.to_owned(),
            }),
        }
    }
}
