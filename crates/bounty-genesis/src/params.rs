use bounty_core::error::BountyError;
use bounty_core::reward::RewardSchedule;
use bounty_core::types::{AccountId, Balance};
use serde::{Deserialize, Serialize};

/// The four reward amounts as they appear in a params file.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardTierParams {
    pub low: Balance,
    pub medium: Balance,
    pub high: Balance,
    pub critical: Balance,
}

impl RewardTierParams {
    pub fn to_schedule(&self) -> Result<RewardSchedule, BountyError> {
        RewardSchedule::new(self.low, self.medium, self.high, self.critical)
    }
}

/// Everything needed to bring a new ledger into existence.
///
/// Identities are base-58 strings so the file stays hand-editable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Owner: manages validators and reward tiers. Fixed for the ledger's life.
    pub owner: String,
    /// First authorized validator.
    pub validator: String,
    /// Reward schedule; the built-in defaults apply when absent.
    #[serde(default)]
    pub reward_tiers: Option<RewardTierParams>,
    /// Amount the owner deposits into the pool at initialization.
    #[serde(default)]
    pub initial_deposit: Option<Balance>,
}

impl LedgerParams {
    pub fn owner_id(&self) -> Result<AccountId, BountyError> {
        AccountId::from_b58(&self.owner)
    }

    pub fn validator_id(&self) -> Result<AccountId, BountyError> {
        AccountId::from_b58(&self.validator)
    }

    pub fn schedule(&self) -> Result<RewardSchedule, BountyError> {
        match &self.reward_tiers {
            Some(t) => t.to_schedule(),
            None => Ok(RewardSchedule::default()),
        }
    }
}
