use std::sync::Arc;

use bounty_core::account::Account;
use bounty_core::error::BountyError;
use bounty_core::event::{EventRecord, LedgerEvent};
use bounty_core::report::{Report, ReportStatus, Severity};
use bounty_core::reward::RewardSchedule;
use bounty_core::types::{AccountId, Balance, EventSeq, ReportId, Timestamp};
use tracing::{debug, info};

use crate::access::AccessControl;
use crate::db::{StagedMutations, StateDb, WriteGuard};
use crate::store::ReportStore;

// ── BountyLedger ──────────────────────────────────────────────────────────────

/// The report lifecycle state machine and payout engine.
///
/// Every mutating operation runs as check → stage → commit while holding the
/// database's writer lock. Any number of ledger handles may share one
/// `StateDb`; their operations never interleave, and each one is atomic:
/// either its whole [`StagedMutations`] lands or nothing does. Queries read
/// committed state without locking.
pub struct BountyLedger {
    db: Arc<StateDb>,
}

impl BountyLedger {
    /// Seed a fresh database with its owner, first validator and reward
    /// schedule. Fails with `AlreadyInitialized` if an owner is already set.
    pub fn initialize(
        db: Arc<StateDb>,
        owner: AccountId,
        validator: AccountId,
        schedule: RewardSchedule,
    ) -> Result<Self, BountyError> {
        {
            let guard = db.write_lock();
            if db.owner()?.is_some() {
                return Err(BountyError::AlreadyInitialized);
            }
            if validator.is_null() {
                return Err(BountyError::InvalidValidator(validator));
            }

            let mut staged = StagedMutations::default();
            staged.owner = Some(owner.clone());
            staged.validators_added.push(validator.clone());
            staged.reward_schedule = Some(schedule);
            db.commit(&guard, staged)?;
        }

        info!(owner = %owner, validator = %validator, "ledger initialized");
        Ok(Self::from_parts(db))
    }

    /// Attach to an already-initialized database.
    pub fn open(db: Arc<StateDb>) -> Result<Self, BountyError> {
        if db.owner()?.is_none() {
            return Err(BountyError::NotInitialized);
        }
        Ok(Self::from_parts(db))
    }

    fn from_parts(db: Arc<StateDb>) -> Self {
        Self { db }
    }

    fn lock(&self) -> WriteGuard<'_> {
        self.db.write_lock()
    }

    /// Flush committed state to disk.
    pub fn flush(&self) -> Result<(), BountyError> {
        self.db.flush()
    }

    fn access(&self) -> AccessControl<'_> {
        AccessControl::new(&self.db)
    }

    fn store(&self) -> ReportStore<'_> {
        ReportStore::new(&self.db)
    }

    fn commit(
        &self,
        guard: &WriteGuard<'_>,
        staged: StagedMutations,
    ) -> Result<Vec<EventRecord>, BountyError> {
        let records = self.db.commit(guard, staged)?;
        for r in &records {
            debug!(seq = r.seq, event = ?r.event, "event recorded");
        }
        Ok(records)
    }

    // ── Submission ───────────────────────────────────────────────────────────

    /// File a new report. Open to any caller.
    pub fn submit(
        &self,
        submitter: &AccountId,
        description: impl Into<String>,
        proof_of_concept: impl Into<String>,
        severity: Severity,
        now: Timestamp,
    ) -> Result<ReportId, BountyError> {
        let guard = self.lock();

        let mut staged = StagedMutations::default();
        let id = self.store().stage_create(
            &mut staged,
            submitter,
            description.into(),
            proof_of_concept.into(),
            severity,
            now,
        )?;
        self.commit(&guard, staged)?;

        info!(report_id = id, submitter = %submitter, %severity, "report submitted");
        Ok(id)
    }

    // ── Review ───────────────────────────────────────────────────────────────

    /// Move a report to `new_status`.
    ///
    /// Accepting recomputes the reward from the schedule in force now and
    /// replaces the report's severity with the validator's `severity`. Any
    /// other target clears the reward. `Paid` is only reachable through
    /// [`BountyLedger::pay_reward`].
    pub fn update_status(
        &self,
        caller: &AccountId,
        report_id: ReportId,
        new_status: ReportStatus,
        severity: Severity,
    ) -> Result<(), BountyError> {
        let guard = self.lock();
        self.access().require_validator(caller)?;

        let mut report = self.store().get(report_id)?;
        if report.is_paid() {
            return Err(BountyError::AlreadyPaid(report_id));
        }

        match new_status {
            ReportStatus::Paid => {
                return Err(BountyError::InvalidStatus { report_id, status: report.status });
            }
            ReportStatus::Accepted => {
                if !severity.is_assigned() {
                    return Err(BountyError::InvalidSeverity);
                }
                report.reward = self.reward_tier()?.amount_for(severity);
                report.severity = severity;
            }
            _ => report.reward = 0,
        }
        report.status = new_status;
        let reward = report.reward;
        debug_assert_eq!(reward != 0, new_status.carries_reward());

        let mut staged = StagedMutations::default();
        self.store().stage_update(&mut staged, report);
        staged.emit(LedgerEvent::ReportStatusUpdated { report_id, status: new_status });
        self.commit(&guard, staged)?;

        info!(report_id, status = %new_status, reward, validator = %caller, "report status updated");
        Ok(())
    }

    // ── Payout ───────────────────────────────────────────────────────────────

    /// Pay an accepted report's reward to its submitter. Returns the amount.
    ///
    /// The report is staged as `Paid` before the transfer legs (pool debit,
    /// submitter credit) are staged, and all of them commit together. If the
    /// transfer cannot be staged nothing is written.
    pub fn pay_reward(&self, caller: &AccountId, report_id: ReportId) -> Result<Balance, BountyError> {
        let guard = self.lock();
        self.access().require_validator(caller)?;

        let mut report = self.store().get(report_id)?;
        if report.is_paid() {
            return Err(BountyError::AlreadyPaid(report_id));
        }
        if report.status != ReportStatus::Accepted {
            return Err(BountyError::InvalidStatus { report_id, status: report.status });
        }

        let reward = report.reward;
        let pool = self.db.pool_balance()?;
        if pool < reward {
            return Err(BountyError::InsufficientFunds { need: reward, have: pool });
        }

        let submitter = report.submitter.clone();
        let mut staged = StagedMutations::default();

        report.status = ReportStatus::Paid;
        debug_assert!(report.status.carries_reward() && report.reward != 0);
        self.store().stage_update(&mut staged, report);

        let total_paid = self
            .db
            .total_paid()?
            .checked_add(reward)
            .ok_or_else(|| BountyError::TransferFailed(submitter.clone()))?;
        let mut payee = self
            .db
            .get_account(&submitter)?
            .unwrap_or_else(|| Account::new(submitter.clone()));
        payee.credit(reward)?;

        staged.total_paid = Some(total_paid);
        staged.pool_balance = Some(pool - reward);
        staged.accounts.push(payee);
        staged.emit(LedgerEvent::RewardPaid {
            report_id,
            submitter: submitter.clone(),
            amount: reward,
        });
        self.commit(&guard, staged)?;

        info!(report_id, submitter = %submitter, amount = reward, validator = %caller, "reward paid");
        Ok(reward)
    }

    // ── Funds ────────────────────────────────────────────────────────────────

    /// Add `amount` to the funds pool. Open to any caller. Returns the new
    /// pool balance.
    pub fn deposit(&self, from: &AccountId, amount: Balance) -> Result<Balance, BountyError> {
        let guard = self.lock();
        if amount == 0 {
            return Err(BountyError::ZeroAmount);
        }
        let pool = self
            .db
            .pool_balance()?
            .checked_add(amount)
            .ok_or_else(|| BountyError::TransferFailed(from.clone()))?;

        let mut staged = StagedMutations::default();
        staged.pool_balance = Some(pool);
        staged.emit(LedgerEvent::FundsDeposited { from: from.clone(), amount });
        self.commit(&guard, staged)?;

        info!(from = %from, amount, pool, "funds deposited");
        Ok(pool)
    }

    // ── Administration ───────────────────────────────────────────────────────

    pub fn add_validator(&self, caller: &AccountId, validator: &AccountId) -> Result<(), BountyError> {
        let guard = self.lock();
        self.access().require_owner(caller)?;

        let mut staged = StagedMutations::default();
        self.access().stage_add(&mut staged, validator)?;
        self.commit(&guard, staged)?;

        info!(validator = %validator, "validator added");
        Ok(())
    }

    pub fn remove_validator(&self, caller: &AccountId, validator: &AccountId) -> Result<(), BountyError> {
        let guard = self.lock();
        self.access().require_owner(caller)?;

        let mut staged = StagedMutations::default();
        self.access().stage_remove(&mut staged, validator)?;
        self.commit(&guard, staged)?;

        info!(validator = %validator, "validator removed");
        Ok(())
    }

    /// Replace the reward schedule. Rewards already fixed on accepted or paid
    /// reports are unaffected.
    pub fn update_reward_tiers(
        &self,
        caller: &AccountId,
        low: Balance,
        medium: Balance,
        high: Balance,
        critical: Balance,
    ) -> Result<RewardSchedule, BountyError> {
        let guard = self.lock();
        self.access().require_owner(caller)?;

        let mut schedule = self.reward_tier()?;
        schedule.update(low, medium, high, critical)?;

        let mut staged = StagedMutations::default();
        staged.reward_schedule = Some(schedule);
        staged.emit(LedgerEvent::RewardTierUpdated { low, medium, high, critical });
        self.commit(&guard, staged)?;

        info!(low, medium, high, critical, "reward tiers updated");
        Ok(schedule)
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn get_report(&self, report_id: ReportId) -> Result<Report, BountyError> {
        self.store().get(report_id)
    }

    /// Ids of every report filed by `submitter`, oldest first. Unknown
    /// submitters get an empty list.
    pub fn get_submissions(&self, submitter: &AccountId) -> Result<Vec<ReportId>, BountyError> {
        self.store().submissions_of(submitter)
    }

    pub fn report_count(&self) -> Result<u64, BountyError> {
        self.store().count()
    }

    pub fn reward_tier(&self) -> Result<RewardSchedule, BountyError> {
        self.db.reward_schedule()?.ok_or(BountyError::NotInitialized)
    }

    pub fn owner(&self) -> Result<AccountId, BountyError> {
        self.access().owner()
    }

    pub fn is_validator(&self, id: &AccountId) -> Result<bool, BountyError> {
        self.access().is_validator(id)
    }

    pub fn validators(&self) -> Result<Vec<AccountId>, BountyError> {
        self.access().validators()
    }

    pub fn pool_balance(&self) -> Result<Balance, BountyError> {
        self.db.pool_balance()
    }

    pub fn total_paid(&self) -> Result<Balance, BountyError> {
        self.db.total_paid()
    }

    /// Amount paid out to `id` so far.
    pub fn balance_of(&self, id: &AccountId) -> Result<Balance, BountyError> {
        Ok(self.db.get_account(id)?.map(|a| a.balance).unwrap_or(0))
    }

    pub fn events_since(&self, from: EventSeq) -> Result<Vec<EventRecord>, BountyError> {
        self.db.events_since(from)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const NOW: Timestamp = 1_750_000_000;

    fn temp_db(name: &str) -> StateDb {
        let dir = std::env::temp_dir().join(format!("bounty_ledger_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        StateDb::open(&dir).expect("open temp db")
    }

    fn random_id() -> AccountId {
        AccountId::from_bytes(rand::random())
    }

    struct Fixture {
        ledger: BountyLedger,
        owner: AccountId,
        validator: AccountId,
        hunter: AccountId,
    }

    fn setup(name: &str, pool: Balance) -> Fixture {
        let owner = random_id();
        let validator = random_id();
        let ledger = BountyLedger::initialize(
            Arc::new(temp_db(name)),
            owner.clone(),
            validator.clone(),
            RewardSchedule::new(100, 200, 300, 400).unwrap(),
        )
        .unwrap();
        if pool > 0 {
            ledger.deposit(&owner, pool).unwrap();
        }
        Fixture { ledger, owner, validator, hunter: random_id() }
    }

    fn submit(f: &Fixture, severity: Severity) -> ReportId {
        f.ledger.submit(&f.hunter, "reentrancy in claim()", "exploit.rs", severity, NOW).unwrap()
    }

    // ── Initialization ───────────────────────────────────────────────────────

    #[test]
    fn initialize_twice_rejected() {
        let db = Arc::new(temp_db("init_twice"));
        let owner = random_id();
        BountyLedger::initialize(Arc::clone(&db), owner.clone(), random_id(), RewardSchedule::default())
            .unwrap();
        assert!(matches!(
            BountyLedger::initialize(db, owner, random_id(), RewardSchedule::default()),
            Err(BountyError::AlreadyInitialized)
        ));
    }

    #[test]
    fn open_requires_initialized_db() {
        let db = Arc::new(temp_db("open_uninit"));
        assert!(matches!(BountyLedger::open(db), Err(BountyError::NotInitialized)));
    }

    #[test]
    fn initialize_with_null_validator_rejected() {
        let db = Arc::new(temp_db("init_null_validator"));
        let result = BountyLedger::initialize(
            Arc::clone(&db),
            random_id(),
            AccountId::NULL,
            RewardSchedule::default(),
        );
        assert!(matches!(result, Err(BountyError::InvalidValidator(_))));
        assert!(db.owner().unwrap().is_none());
    }

    // ── Submission ───────────────────────────────────────────────────────────

    #[test]
    fn submitted_report_starts_without_reward() {
        let f = setup("submit_initial", 0);
        let id = submit(&f, Severity::Medium);
        let r = f.ledger.get_report(id).unwrap();
        assert_eq!(r.status, ReportStatus::Submitted);
        assert_eq!(r.reward, 0);
        assert_eq!(r.submitter, f.hunter);
        assert_eq!(r.submission_time, NOW);
        assert_eq!(r.severity, Severity::Medium);
    }

    #[test]
    fn submit_none_severity_changes_nothing() {
        let f = setup("submit_none", 0);
        submit(&f, Severity::Low);
        let events_before = f.ledger.events_since(0).unwrap().len();

        let err = f.ledger.submit(&f.hunter, "d", "p", Severity::None, NOW).unwrap_err();
        assert!(matches!(err, BountyError::InvalidSeverity));
        assert_eq!(f.ledger.report_count().unwrap(), 1);
        assert_eq!(f.ledger.get_submissions(&f.hunter).unwrap(), vec![0]);
        assert_eq!(f.ledger.events_since(0).unwrap().len(), events_before);

        // The next successful submission still gets the next id.
        assert_eq!(submit(&f, Severity::Low), 1);
    }

    #[test]
    fn submissions_returned_in_order() {
        let f = setup("submit_order", 0);
        let other = random_id();
        let mut mine = Vec::new();
        for i in 0..5 {
            mine.push(submit(&f, Severity::Low));
            f.ledger.submit(&other, format!("other {i}"), "", Severity::High, NOW).unwrap();
        }
        assert_eq!(f.ledger.get_submissions(&f.hunter).unwrap(), mine);
        assert_eq!(f.ledger.get_submissions(&other).unwrap().len(), 5);
        assert!(f.ledger.get_submissions(&random_id()).unwrap().is_empty());
    }

    #[test]
    fn get_report_out_of_range() {
        let f = setup("get_oob", 0);
        submit(&f, Severity::Low);
        assert!(matches!(f.ledger.get_report(1), Err(BountyError::InvalidReportId(1))));
        assert!(matches!(f.ledger.get_report(u64::MAX), Err(BountyError::InvalidReportId(_))));
    }

    // ── Review ───────────────────────────────────────────────────────────────

    #[test]
    fn accept_uses_validator_severity() {
        let f = setup("accept_retriage", 0);
        let id = submit(&f, Severity::High);
        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Critical).unwrap();

        let r = f.ledger.get_report(id).unwrap();
        assert_eq!(r.status, ReportStatus::Accepted);
        assert_eq!(r.severity, Severity::Critical);
        assert_eq!(r.reward, 400);
    }

    #[test]
    fn non_validator_cannot_update_status() {
        let f = setup("update_unauth", 0);
        let id = submit(&f, Severity::Low);
        for caller in [&f.hunter, &f.owner] {
            let err = f
                .ledger
                .update_status(caller, id, ReportStatus::Accepted, Severity::Low)
                .unwrap_err();
            assert!(matches!(err, BountyError::Unauthorized { caller: c } if c == *caller));
        }
        assert_eq!(f.ledger.get_report(id).unwrap().status, ReportStatus::Submitted);
    }

    #[test]
    fn authorization_checked_before_report_id() {
        let f = setup("update_auth_first", 0);
        let err = f
            .ledger
            .update_status(&f.hunter, 99, ReportStatus::UnderReview, Severity::Low)
            .unwrap_err();
        assert!(matches!(err, BountyError::Unauthorized { .. }));

        let err = f
            .ledger
            .update_status(&f.validator, 99, ReportStatus::UnderReview, Severity::Low)
            .unwrap_err();
        assert!(matches!(err, BountyError::InvalidReportId(99)));
    }

    #[test]
    fn accept_with_none_severity_rejected() {
        let f = setup("accept_none", 0);
        let id = submit(&f, Severity::Low);
        let err = f
            .ledger
            .update_status(&f.validator, id, ReportStatus::Accepted, Severity::None)
            .unwrap_err();
        assert!(matches!(err, BountyError::InvalidSeverity));
        assert_eq!(f.ledger.get_report(id).unwrap().status, ReportStatus::Submitted);
    }

    #[test]
    fn paid_not_reachable_through_update_status() {
        let f = setup("update_to_paid", 0);
        let id = submit(&f, Severity::Low);
        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Low).unwrap();
        let err = f
            .ledger
            .update_status(&f.validator, id, ReportStatus::Paid, Severity::Low)
            .unwrap_err();
        assert!(matches!(err, BountyError::InvalidStatus { status: ReportStatus::Accepted, .. }));
    }

    #[test]
    fn rejected_report_can_be_reaccepted() {
        let f = setup("reaccept", 1_000);
        let id = submit(&f, Severity::Medium);
        f.ledger.update_status(&f.validator, id, ReportStatus::UnderReview, Severity::None).unwrap();
        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Medium).unwrap();
        f.ledger.update_status(&f.validator, id, ReportStatus::Rejected, Severity::None).unwrap();

        let r = f.ledger.get_report(id).unwrap();
        assert_eq!(r.status, ReportStatus::Rejected);
        assert_eq!(r.reward, 0, "leaving Accepted clears the reward");
        assert!(matches!(
            f.ledger.pay_reward(&f.validator, id),
            Err(BountyError::InvalidStatus { status: ReportStatus::Rejected, .. })
        ));

        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Medium).unwrap();
        assert_eq!(f.ledger.pay_reward(&f.validator, id).unwrap(), 200);
    }

    #[test]
    fn tier_update_does_not_touch_accepted_rewards() {
        let f = setup("tier_no_retro", 0);
        let id = submit(&f, Severity::High);
        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::High).unwrap();
        f.ledger.update_reward_tiers(&f.owner, 1_000, 2_000, 3_000, 4_000).unwrap();
        assert_eq!(f.ledger.get_report(id).unwrap().reward, 300);

        let later = submit(&f, Severity::High);
        f.ledger.update_status(&f.validator, later, ReportStatus::Accepted, Severity::High).unwrap();
        assert_eq!(f.ledger.get_report(later).unwrap().reward, 3_000);
    }

    // ── Payout ───────────────────────────────────────────────────────────────

    #[test]
    fn critical_payout_scenario() {
        let f = setup("payout_scenario", 10_000);
        let id = submit(&f, Severity::High);
        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Critical).unwrap();

        let paid = f.ledger.pay_reward(&f.validator, id).unwrap();
        assert_eq!(paid, 400);
        assert_eq!(f.ledger.pool_balance().unwrap(), 10_000 - 400);
        assert_eq!(f.ledger.balance_of(&f.hunter).unwrap(), 400);
        assert_eq!(f.ledger.total_paid().unwrap(), 400);
        assert_eq!(f.ledger.get_report(id).unwrap().status, ReportStatus::Paid);
        assert_eq!(f.ledger.get_report(id).unwrap().reward, 400);
    }

    #[test]
    fn pay_requires_accepted() {
        let f = setup("pay_not_accepted", 10_000);
        let id = submit(&f, Severity::Low);
        for status in [ReportStatus::Submitted, ReportStatus::UnderReview, ReportStatus::Rejected] {
            if status != ReportStatus::Submitted {
                f.ledger.update_status(&f.validator, id, status, Severity::None).unwrap();
            }
            assert!(matches!(
                f.ledger.pay_reward(&f.validator, id),
                Err(BountyError::InvalidStatus { .. })
            ));
        }
        assert_eq!(f.ledger.pool_balance().unwrap(), 10_000);
        assert_eq!(f.ledger.total_paid().unwrap(), 0);
    }

    #[test]
    fn pay_twice_fails_already_paid() {
        let f = setup("pay_twice", 10_000);
        let id = submit(&f, Severity::Medium);
        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Medium).unwrap();
        f.ledger.pay_reward(&f.validator, id).unwrap();

        assert!(matches!(f.ledger.pay_reward(&f.validator, id), Err(BountyError::AlreadyPaid(_))));
        assert!(matches!(
            f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Critical),
            Err(BountyError::AlreadyPaid(_))
        ));
        assert_eq!(f.ledger.pool_balance().unwrap(), 10_000 - 200);
        assert_eq!(f.ledger.balance_of(&f.hunter).unwrap(), 200);
    }

    #[test]
    fn insufficient_funds_leaves_report_accepted() {
        let f = setup("pay_insufficient", 250);
        let id = submit(&f, Severity::High);
        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::High).unwrap();

        let err = f.ledger.pay_reward(&f.validator, id).unwrap_err();
        assert!(matches!(err, BountyError::InsufficientFunds { need: 300, have: 250 }));
        assert_eq!(f.ledger.get_report(id).unwrap().status, ReportStatus::Accepted);
        assert_eq!(f.ledger.pool_balance().unwrap(), 250);

        f.ledger.deposit(&random_id(), 50).unwrap();
        assert_eq!(f.ledger.pay_reward(&f.validator, id).unwrap(), 300);
        assert_eq!(f.ledger.pool_balance().unwrap(), 0);
    }

    #[test]
    fn failed_transfer_rolls_back_status_flip() {
        let f = setup("pay_transfer_fail", 10_000);
        let id = submit(&f, Severity::Low);
        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Low).unwrap();

        // Pre-load the payee so crediting the reward overflows.
        let mut staged = StagedMutations::default();
        staged.accounts.push(Account { account_id: f.hunter.clone(), balance: Balance::MAX });
        f.ledger.db.commit(&f.ledger.lock(), staged).unwrap();

        let err = f.ledger.pay_reward(&f.validator, id).unwrap_err();
        assert!(matches!(err, BountyError::TransferFailed(_)));
        assert_eq!(f.ledger.get_report(id).unwrap().status, ReportStatus::Accepted);
        assert_eq!(f.ledger.pool_balance().unwrap(), 10_000);
        assert_eq!(f.ledger.total_paid().unwrap(), 0);
    }

    #[test]
    fn concurrent_payouts_pay_exactly_once() {
        let f = setup("pay_concurrent", 10_000);
        let id = submit(&f, Severity::Critical);
        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Critical).unwrap();

        let results: Vec<Result<Balance, BountyError>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| f.ledger.pay_reward(&f.validator, id)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BountyError::AlreadyPaid(_))));
        assert_eq!(f.ledger.pool_balance().unwrap(), 10_000 - 400);
        assert_eq!(f.ledger.balance_of(&f.hunter).unwrap(), 400);
    }

    /// Try to pay every report in `ids`, stepping in lockstep with another
    /// thread through `barrier`. Returns how many payouts this caller won.
    fn pay_all(ledger: &BountyLedger, validator: &AccountId, ids: &[ReportId], barrier: &Barrier) -> usize {
        let mut wins = 0;
        for &id in ids {
            barrier.wait();
            match ledger.pay_reward(validator, id) {
                Ok(amount) => {
                    assert_eq!(amount, 400);
                    wins += 1;
                }
                Err(e) => assert!(matches!(e, BountyError::AlreadyPaid(_)), "{e}"),
            }
        }
        wins
    }

    #[test]
    fn handles_sharing_a_db_pay_each_report_once() {
        const REPORTS: u64 = 200;
        let f = setup("pay_two_handles", 400 * REPORTS as Balance);
        let other = BountyLedger::open(Arc::clone(&f.ledger.db)).unwrap();
        let ids: Vec<ReportId> = (0..REPORTS).map(|_| submit(&f, Severity::Critical)).collect();
        for &id in &ids {
            f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Critical).unwrap();
        }

        let barrier = Barrier::new(2);
        let paid: Vec<usize> = std::thread::scope(|s| {
            let a = s.spawn(|| pay_all(&f.ledger, &f.validator, &ids, &barrier));
            let b = s.spawn(|| pay_all(&other, &f.validator, &ids, &barrier));
            vec![a.join().unwrap(), b.join().unwrap()]
        });

        assert_eq!(paid.iter().sum::<usize>() as u64, REPORTS);
        let expected = 400 * REPORTS as Balance;
        assert_eq!(f.ledger.total_paid().unwrap(), expected);
        assert_eq!(other.balance_of(&f.hunter).unwrap(), expected);
        assert_eq!(f.ledger.pool_balance().unwrap(), 0);
        let payouts = f
            .ledger
            .events_since(0)
            .unwrap()
            .into_iter()
            .filter(|r| matches!(r.event, LedgerEvent::RewardPaid { .. }))
            .count();
        assert_eq!(payouts as u64, REPORTS);
    }

    #[test]
    fn handles_sharing_a_db_get_distinct_ids_and_event_seqs() {
        let f = setup("submit_two_handles", 0);
        let other = BountyLedger::open(Arc::clone(&f.ledger.db)).unwrap();
        let before = f.ledger.events_since(0).unwrap().len() as u64;

        std::thread::scope(|s| {
            for ledger in [&f.ledger, &other] {
                let hunter = &f.hunter;
                s.spawn(move || {
                    for _ in 0..50 {
                        ledger.submit(hunter, "d", "p", Severity::Low, NOW).unwrap();
                    }
                });
            }
        });

        assert_eq!(f.ledger.report_count().unwrap(), 100);
        assert_eq!(f.ledger.get_submissions(&f.hunter).unwrap(), (0..100u64).collect::<Vec<_>>());
        let seqs: Vec<EventSeq> = f.ledger.events_since(0).unwrap().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, (0..before + 100).collect::<Vec<_>>());
    }

    // ── Funds ────────────────────────────────────────────────────────────────

    #[test]
    fn deposits_accumulate_and_zero_rejected() {
        let f = setup("deposits", 0);
        let anyone = random_id();
        assert_eq!(f.ledger.deposit(&anyone, 70).unwrap(), 70);
        assert_eq!(f.ledger.deposit(&anyone, 30).unwrap(), 100);
        assert!(matches!(f.ledger.deposit(&anyone, 0), Err(BountyError::ZeroAmount)));
        assert_eq!(f.ledger.pool_balance().unwrap(), 100);
    }

    // ── Administration ───────────────────────────────────────────────────────

    #[test]
    fn validator_lifecycle() {
        let f = setup("validator_lifecycle", 10_000);
        let w = random_id();
        let id = submit(&f, Severity::Low);

        f.ledger.add_validator(&f.owner, &w).unwrap();
        assert!(f.ledger.is_validator(&w).unwrap());
        f.ledger.update_status(&w, id, ReportStatus::Accepted, Severity::Low).unwrap();
        assert_eq!(f.ledger.pay_reward(&w, id).unwrap(), 100);

        f.ledger.remove_validator(&f.owner, &w).unwrap();
        let second = submit(&f, Severity::Low);
        assert!(matches!(
            f.ledger.update_status(&w, second, ReportStatus::UnderReview, Severity::None),
            Err(BountyError::Unauthorized { .. })
        ));
        assert!(matches!(f.ledger.pay_reward(&w, second), Err(BountyError::Unauthorized { .. })));
    }

    #[test]
    fn only_owner_manages_validators_and_tiers() {
        let f = setup("owner_only", 0);
        let w = random_id();
        assert!(matches!(
            f.ledger.add_validator(&f.validator, &w),
            Err(BountyError::Unauthorized { .. })
        ));
        assert!(matches!(
            f.ledger.remove_validator(&f.hunter, &f.validator),
            Err(BountyError::Unauthorized { .. })
        ));
        assert!(matches!(
            f.ledger.update_reward_tiers(&f.validator, 1, 2, 3, 4),
            Err(BountyError::Unauthorized { .. })
        ));
        assert!(!f.ledger.is_validator(&w).unwrap());
    }

    #[test]
    fn add_validator_is_idempotent_and_remove_requires_membership() {
        let f = setup("validator_idempotent", 0);
        let w = random_id();
        f.ledger.add_validator(&f.owner, &w).unwrap();
        f.ledger.add_validator(&f.owner, &w).unwrap();
        assert_eq!(f.ledger.validators().unwrap().len(), 2);

        assert!(matches!(
            f.ledger.add_validator(&f.owner, &AccountId::NULL),
            Err(BountyError::InvalidValidator(_))
        ));
        f.ledger.remove_validator(&f.owner, &w).unwrap();
        assert!(matches!(
            f.ledger.remove_validator(&f.owner, &w),
            Err(BountyError::InvalidValidator(_))
        ));
    }

    #[test]
    fn rejected_tier_update_keeps_previous_schedule() {
        let f = setup("tiers_rejected", 0);
        let before = f.ledger.reward_tier().unwrap();
        for (l, m, h, c) in [(5, 5, 6, 7), (1, 2, 3, 3), (9, 8, 7, 6), (0, 1, 2, 3)] {
            assert!(matches!(
                f.ledger.update_reward_tiers(&f.owner, l, m, h, c),
                Err(BountyError::InvalidRewardAmount)
            ));
        }
        assert_eq!(f.ledger.reward_tier().unwrap(), before);
        assert!(f.ledger.events_since(0).unwrap().iter().all(|r| !matches!(
            r.event,
            LedgerEvent::RewardTierUpdated { .. }
        )));
    }

    // ── Events ───────────────────────────────────────────────────────────────

    #[test]
    fn one_event_per_successful_operation() {
        let f = setup("events", 0);
        let w = random_id();
        f.ledger.deposit(&f.owner, 1_000).unwrap();
        let id = submit(&f, Severity::Low);
        let _ = f.ledger.update_status(&f.hunter, id, ReportStatus::Accepted, Severity::Low);
        f.ledger.update_status(&f.validator, id, ReportStatus::Accepted, Severity::Low).unwrap();
        f.ledger.pay_reward(&f.validator, id).unwrap();
        let _ = f.ledger.pay_reward(&f.validator, id);
        f.ledger.add_validator(&f.owner, &w).unwrap();
        f.ledger.remove_validator(&f.owner, &w).unwrap();
        f.ledger.update_reward_tiers(&f.owner, 10, 20, 30, 40).unwrap();

        let events: Vec<LedgerEvent> =
            f.ledger.events_since(0).unwrap().into_iter().map(|r| r.event).collect();
        assert_eq!(
            events,
            vec![
                LedgerEvent::FundsDeposited { from: f.owner.clone(), amount: 1_000 },
                LedgerEvent::BugReported { report_id: id, submitter: f.hunter.clone(), severity: Severity::Low },
                LedgerEvent::ReportStatusUpdated { report_id: id, status: ReportStatus::Accepted },
                LedgerEvent::RewardPaid { report_id: id, submitter: f.hunter.clone(), amount: 100 },
                LedgerEvent::ValidatorAdded { validator: w.clone() },
                LedgerEvent::ValidatorRemoved { validator: w.clone() },
                LedgerEvent::RewardTierUpdated { low: 10, medium: 20, high: 30, critical: 40 },
            ]
        );
        assert_eq!(f.ledger.events_since(5).unwrap().len(), 2);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = std::env::temp_dir().join("bounty_ledger_test_reopen");
        let _ = std::fs::remove_dir_all(&dir);
        let owner = random_id();
        let validator = random_id();
        let hunter = random_id();
        {
            let db = Arc::new(StateDb::open(&dir).unwrap());
            let ledger =
                BountyLedger::initialize(db, owner.clone(), validator.clone(), RewardSchedule::default())
                    .unwrap();
            ledger.submit(&hunter, "d", "p", Severity::Low, NOW).unwrap();
            ledger.flush().unwrap();
        }
        let ledger = BountyLedger::open(Arc::new(StateDb::open(&dir).unwrap())).unwrap();
        assert_eq!(ledger.owner().unwrap(), owner);
        assert!(ledger.is_validator(&validator).unwrap());
        assert_eq!(ledger.get_submissions(&hunter).unwrap(), vec![0]);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
