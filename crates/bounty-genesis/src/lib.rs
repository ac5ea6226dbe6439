//! bounty-genesis
//!
//! Brings a new ledger into existence from a [`LedgerParams`] document:
//! owner, first validator, reward schedule and an optional opening deposit.
//! Every parameter is validated before anything is written, so a rejected
//! params file leaves the database untouched.

pub mod params;

pub use params::{LedgerParams, RewardTierParams};

use std::sync::Arc;

use bounty_core::error::BountyError;
use bounty_state::{BountyLedger, StateDb};
use tracing::info;

/// Initialize the ledger stored in `db` according to `params`.
pub fn initialize_ledger(db: Arc<StateDb>, params: &LedgerParams) -> Result<BountyLedger, BountyError> {
    let owner = params.owner_id()?;
    let validator = params.validator_id()?;
    let schedule = params.schedule()?;

    info!(
        owner = %owner,
        validator = %validator,
        low = schedule.low(),
        critical = schedule.critical(),
        "initializing bounty ledger"
    );
    let ledger = BountyLedger::initialize(db, owner.clone(), validator, schedule)?;

    if let Some(amount) = params.initial_deposit.filter(|a| *a > 0) {
        ledger.deposit(&owner, amount)?;
        info!(amount, "initial pool funded");
    }

    ledger.flush()?;
    info!("ledger state committed to disk");
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounty_core::report::Severity;
    use bounty_core::types::AccountId;

    fn temp_db(name: &str) -> Arc<StateDb> {
        let dir = std::env::temp_dir().join(format!("bounty_genesis_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        Arc::new(StateDb::open(&dir).unwrap())
    }

    fn params_json(tiers: &str, deposit: &str) -> String {
        format!(
            r#"{{
                "owner": "{}",
                "validator": "{}",
                "reward_tiers": {tiers},
                "initial_deposit": {deposit}
            }}"#,
            AccountId::derive("owner").to_b58(),
            AccountId::derive("validator").to_b58(),
        )
    }

    #[test]
    fn json_params_initialize_ledger() {
        let json = params_json(r#"{"low": 10, "medium": 20, "high": 30, "critical": 40}"#, "5000");
        let params: LedgerParams = serde_json::from_str(&json).unwrap();
        let ledger = initialize_ledger(temp_db("json"), &params).unwrap();

        assert_eq!(ledger.owner().unwrap(), AccountId::derive("owner"));
        assert!(ledger.is_validator(&AccountId::derive("validator")).unwrap());
        assert_eq!(ledger.reward_tier().unwrap().amount_for(Severity::High), 30);
        assert_eq!(ledger.pool_balance().unwrap(), 5_000);
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let json = format!(
            r#"{{"owner": "{}", "validator": "{}"}}"#,
            AccountId::derive("owner").to_b58(),
            AccountId::derive("validator").to_b58(),
        );
        let params: LedgerParams = serde_json::from_str(&json).unwrap();
        let ledger = initialize_ledger(temp_db("defaults"), &params).unwrap();
        assert_eq!(ledger.reward_tier().unwrap(), bounty_core::RewardSchedule::default());
        assert_eq!(ledger.pool_balance().unwrap(), 0);
    }

    #[test]
    fn invalid_tiers_write_nothing() {
        let json = params_json(r#"{"low": 10, "medium": 10, "high": 30, "critical": 40}"#, "null");
        let params: LedgerParams = serde_json::from_str(&json).unwrap();
        let db = temp_db("bad_tiers");
        assert!(matches!(
            initialize_ledger(Arc::clone(&db), &params),
            Err(BountyError::InvalidRewardAmount)
        ));
        assert!(db.owner().unwrap().is_none());
    }

    #[test]
    fn malformed_identity_rejected() {
        let params = LedgerParams {
            owner: "not-base58-0OIl".into(),
            validator: AccountId::derive("validator").to_b58(),
            reward_tiers: None,
            initial_deposit: None,
        };
        assert!(matches!(
            initialize_ledger(temp_db("bad_identity"), &params),
            Err(BountyError::InvalidAccountId(_))
        ));
    }
}
