use bounty_core::error::BountyError;
use bounty_core::event::LedgerEvent;
use bounty_core::types::AccountId;
use tracing::warn;

use crate::db::{StagedMutations, StateDb};

/// Owner identity plus the set of authorized validators.
///
/// The `require_*` guards never write anything; privileged operations call
/// them before doing any other work.
pub struct AccessControl<'a> {
    db: &'a StateDb,
}

impl<'a> AccessControl<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    pub fn owner(&self) -> Result<AccountId, BountyError> {
        self.db.owner()?.ok_or(BountyError::NotInitialized)
    }

    pub fn is_validator(&self, id: &AccountId) -> Result<bool, BountyError> {
        self.db.is_validator(id)
    }

    pub fn validators(&self) -> Result<Vec<AccountId>, BountyError> {
        self.db.validators()
    }

    pub fn require_owner(&self, caller: &AccountId) -> Result<(), BountyError> {
        if self.owner()? != *caller {
            warn!(caller = %caller, "rejected: caller is not the owner");
            return Err(BountyError::Unauthorized { caller: caller.clone() });
        }
        Ok(())
    }

    pub fn require_validator(&self, caller: &AccountId) -> Result<(), BountyError> {
        if !self.is_validator(caller)? {
            warn!(caller = %caller, "rejected: caller is not a validator");
            return Err(BountyError::Unauthorized { caller: caller.clone() });
        }
        Ok(())
    }

    /// Stage `id` as a validator. Adding an existing validator succeeds again.
    pub fn stage_add(&self, staged: &mut StagedMutations, id: &AccountId) -> Result<(), BountyError> {
        if id.is_null() {
            return Err(BountyError::InvalidValidator(id.clone()));
        }
        staged.validators_added.push(id.clone());
        staged.emit(LedgerEvent::ValidatorAdded { validator: id.clone() });
        Ok(())
    }

    pub fn stage_remove(&self, staged: &mut StagedMutations, id: &AccountId) -> Result<(), BountyError> {
        if !self.is_validator(id)? {
            return Err(BountyError::InvalidValidator(id.clone()));
        }
        staged.validators_removed.push(id.clone());
        staged.emit(LedgerEvent::ValidatorRemoved { validator: id.clone() });
        Ok(())
    }
}
