use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_REWARD_CRITICAL, DEFAULT_REWARD_HIGH, DEFAULT_REWARD_LOW, DEFAULT_REWARD_MEDIUM,
};
use crate::error::BountyError;
use crate::report::Severity;
use crate::types::Balance;

/// Severity-indexed reward amounts.
///
/// Always satisfies `0 < low < medium < high < critical`: the only ways to
/// obtain a schedule are [`RewardSchedule::new`], which validates, and
/// [`Default`], which uses the built-in tiers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardSchedule {
    low: Balance,
    medium: Balance,
    high: Balance,
    critical: Balance,
}

impl RewardSchedule {
    pub fn new(
        low: Balance,
        medium: Balance,
        high: Balance,
        critical: Balance,
    ) -> Result<Self, BountyError> {
        if low == 0 || low >= medium || medium >= high || high >= critical {
            return Err(BountyError::InvalidRewardAmount);
        }
        Ok(Self { low, medium, high, critical })
    }

    /// Amount owed for an accepted report of `severity`. `None` maps to zero.
    pub fn amount_for(&self, severity: Severity) -> Balance {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
            Severity::None => 0,
        }
    }

    /// Validate a replacement quadruple and swap it in. On error `self` is
    /// left exactly as it was.
    pub fn update(
        &mut self,
        low: Balance,
        medium: Balance,
        high: Balance,
        critical: Balance,
    ) -> Result<(), BountyError> {
        *self = Self::new(low, medium, high, critical)?;
        Ok(())
    }

    pub fn low(&self) -> Balance {
        self.low
    }

    pub fn medium(&self) -> Balance {
        self.medium
    }

    pub fn high(&self) -> Balance {
        self.high
    }

    pub fn critical(&self) -> Balance {
        self.critical
    }
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            low: DEFAULT_REWARD_LOW,
            medium: DEFAULT_REWARD_MEDIUM,
            high: DEFAULT_REWARD_HIGH,
            critical: DEFAULT_REWARD_CRITICAL,
        }
    }
}
