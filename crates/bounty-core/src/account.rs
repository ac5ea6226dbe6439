use serde::{Deserialize, Serialize};

use crate::error::BountyError;
use crate::types::{AccountId, Balance};

/// Balance held by a payee. Created lazily the first time a payout lands.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub account_id: AccountId,
    pub balance: Balance,
}

impl Account {
    pub fn new(account_id: AccountId) -> Self {
        Self { account_id, balance: 0 }
    }

    /// Add `amount` to the balance, failing rather than wrapping on overflow.
    pub fn credit(&mut self, amount: Balance) -> Result<(), BountyError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| BountyError::TransferFailed(self.account_id.clone()))?;
        Ok(())
    }
}
