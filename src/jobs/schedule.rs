//! Fixed-interval schedule expressions (`every:<n><unit>`)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::EngineError;

const PREFIX: &str = "every:";

/// How often a job runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    interval: Duration,
}

impl Schedule {
    pub fn every(interval: Duration) -> Result<Self, EngineError> {
        if interval.is_zero() {
            return Err(EngineError::InvalidSchedule(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self { interval })
    }

    pub fn every_hours(hours: u64) -> Self {
        Self {
            interval: Duration::from_secs(hours.max(1) * 3600),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl FromStr for Schedule {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidSchedule(raw.to_string());

        let expr = raw.trim().strip_prefix(PREFIX).ok_or_else(invalid)?;
        let split = expr
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (amount, unit) = expr.split_at(split);

        let amount: u64 = amount.parse().map_err(|_| invalid())?;
        let seconds = match unit {
            "s" => Some(amount),
            "m" => amount.checked_mul(60),
            "h" => amount.checked_mul(3600),
            "d" => amount.checked_mul(86_400),
            _ => None,
        }
        .ok_or_else(invalid)?;

        if seconds == 0 {
            return Err(invalid());
        }

        Ok(Self {
            interval: Duration::from_secs(seconds),
        })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.interval.as_secs();
        if secs % 3600 == 0 {
            write!(f, "{}{}h", PREFIX, secs / 3600)
        } else if secs % 60 == 0 {
            write!(f, "{}{}m", PREFIX, secs / 60)
        } else {
            write!(f, "{}{}s", PREFIX, secs)
        }
    }
}
