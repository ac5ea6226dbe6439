use bounty_core::account::Account;
use bounty_core::error::BountyError;
use bounty_core::event::{EventRecord, LedgerEvent};
use bounty_core::report::Report;
use bounty_core::reward::RewardSchedule;
use bounty_core::types::{AccountId, Balance, EventSeq, ReportId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::TransactionResult;
use sled::Transactional;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const META_OWNER: &str = "owner";
const META_REWARD_SCHEDULE: &str = "reward_schedule";
const META_REPORT_COUNT: &str = "report_count";
const META_POOL_BALANCE: &str = "pool_balance";
const META_TOTAL_PAID: &str = "total_paid";
const META_EVENT_COUNT: &str = "event_count";

// ── Staged mutations ──────────────────────────────────────────────────────────

/// Every state change an operation wants to make, collected before a single
/// atomic commit. Nothing here touches the database until
/// [`StateDb::commit`] runs.
#[derive(Default, Debug)]
pub struct StagedMutations {
    pub reports: Vec<Report>,
    pub submissions: Vec<(AccountId, ReportId)>,
    pub validators_added: Vec<AccountId>,
    pub validators_removed: Vec<AccountId>,
    pub accounts: Vec<Account>,
    pub owner: Option<AccountId>,
    pub reward_schedule: Option<RewardSchedule>,
    pub report_count: Option<u64>,
    pub pool_balance: Option<Balance>,
    pub total_paid: Option<Balance>,
    pub events: Vec<LedgerEvent>,
}

impl StagedMutations {
    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }
}

// ── StateDb ───────────────────────────────────────────────────────────────────

/// Persistent ledger database backed by sled (pure-Rust, no C dependencies).
///
/// Named trees:
///   reports      — ReportId BE bytes              → bincode(Report)
///   submissions  — AccountId bytes ‖ ReportId BE  → [] (ordered index)
///   validators   — AccountId bytes                → [] (membership set)
///   accounts     — AccountId bytes                → bincode(Account)
///   events       — EventSeq BE bytes              → bincode(LedgerEvent)
///   meta         — utf8 key bytes                 → bincode(value)
///
/// All writes go through [`StateDb::commit`], which requires the database's
/// [`WriteGuard`]. Every ledger handle opened over the same `StateDb`
/// therefore shares one writer lock.
pub struct StateDb {
    _db: sled::Db,
    write_lock: Mutex<()>,
    reports: sled::Tree,
    submissions: sled::Tree,
    validators: sled::Tree,
    accounts: sled::Tree,
    events: sled::Tree,
    meta: sled::Tree,
}

/// Exclusive write access to one [`StateDb`]. Held across an operation's
/// read → check → stage → commit so no other writer can interleave.
pub struct WriteGuard<'a> {
    db: &'a StateDb,
    _lock: MutexGuard<'a, ()>,
}

fn storage_err(e: sled::Error) -> BountyError {
    BountyError::Storage(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, BountyError> {
    bincode::serialize(value).map_err(|e| BountyError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BountyError> {
    bincode::deserialize(bytes).map_err(|e| BountyError::Serialization(e.to_string()))
}

fn submission_key(submitter: &AccountId, id: ReportId) -> Vec<u8> {
    let mut key = submitter.as_bytes().to_vec();
    key.extend_from_slice(&id.to_be_bytes());
    key
}

impl StateDb {
    /// Open or create the ledger database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BountyError> {
        let db = sled::open(path).map_err(storage_err)?;
        let reports     = db.open_tree("reports").map_err(storage_err)?;
        let submissions = db.open_tree("submissions").map_err(storage_err)?;
        let validators  = db.open_tree("validators").map_err(storage_err)?;
        let accounts    = db.open_tree("accounts").map_err(storage_err)?;
        let events      = db.open_tree("events").map_err(storage_err)?;
        let meta        = db.open_tree("meta").map_err(storage_err)?;
        Ok(Self {
            _db: db,
            write_lock: Mutex::new(()),
            reports,
            submissions,
            validators,
            accounts,
            events,
            meta,
        })
    }

    /// Take the writer lock. Blocks until any other writer has committed.
    pub fn write_lock(&self) -> WriteGuard<'_> {
        // A panic mid-operation never leaves a partial commit behind, so a
        // poisoned lock guards nothing inconsistent.
        let lock = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        WriteGuard { db: self, _lock: lock }
    }

    // ── Reports ──────────────────────────────────────────────────────────────

    pub fn get_report(&self, id: ReportId) -> Result<Option<Report>, BountyError> {
        match self.reports.get(id.to_be_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn report_count(&self) -> Result<u64, BountyError> {
        Ok(self.get_meta_value(META_REPORT_COUNT)?.unwrap_or(0))
    }

    /// Report ids filed by `submitter`, in submission order.
    pub fn submissions_of(&self, submitter: &AccountId) -> Result<Vec<ReportId>, BountyError> {
        let mut ids = Vec::new();
        for item in self.submissions.scan_prefix(submitter.as_bytes()) {
            let (key, _) = item.map_err(storage_err)?;
            let mut arr = [0u8; 8];
            arr.copy_from_slice(&key[32..40]);
            ids.push(ReportId::from_be_bytes(arr));
        }
        Ok(ids)
    }

    // ── Access control ───────────────────────────────────────────────────────

    pub fn owner(&self) -> Result<Option<AccountId>, BountyError> {
        self.get_meta_value(META_OWNER)
    }

    pub fn is_validator(&self, id: &AccountId) -> Result<bool, BountyError> {
        self.validators.contains_key(id.as_bytes()).map_err(storage_err)
    }

    pub fn validators(&self) -> Result<Vec<AccountId>, BountyError> {
        let mut out = Vec::new();
        for item in self.validators.iter() {
            let (key, _) = item.map_err(storage_err)?;
            let mut arr = [0u8; 32];
            arr.copy_from_slice(&key);
            out.push(AccountId::from_bytes(arr));
        }
        Ok(out)
    }

    // ── Rewards / funds ──────────────────────────────────────────────────────

    pub fn reward_schedule(&self) -> Result<Option<RewardSchedule>, BountyError> {
        self.get_meta_value(META_REWARD_SCHEDULE)
    }

    pub fn pool_balance(&self) -> Result<Balance, BountyError> {
        Ok(self.get_meta_value(META_POOL_BALANCE)?.unwrap_or(0))
    }

    pub fn total_paid(&self) -> Result<Balance, BountyError> {
        Ok(self.get_meta_value(META_TOTAL_PAID)?.unwrap_or(0))
    }

    pub fn get_account(&self, id: &AccountId) -> Result<Option<Account>, BountyError> {
        match self.accounts.get(id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // ── Events ───────────────────────────────────────────────────────────────

    pub fn event_count(&self) -> Result<u64, BountyError> {
        Ok(self.get_meta_value(META_EVENT_COUNT)?.unwrap_or(0))
    }

    /// All events with sequence number `>= from`, oldest first.
    pub fn events_since(&self, from: EventSeq) -> Result<Vec<EventRecord>, BountyError> {
        let mut out = Vec::new();
        for item in self.events.range(from.to_be_bytes()..) {
            let (key, value) = item.map_err(storage_err)?;
            let mut arr = [0u8; 8];
            arr.copy_from_slice(&key);
            out.push(EventRecord { seq: EventSeq::from_be_bytes(arr), event: decode(&value)? });
        }
        Ok(out)
    }

    // ── Meta ─────────────────────────────────────────────────────────────────

    fn get_meta_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, BountyError> {
        match self.meta.get(key.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // ── Commit ───────────────────────────────────────────────────────────────

    /// Write every staged mutation in one multi-tree sled transaction.
    ///
    /// Either all of `staged` becomes visible or none of it does. Returns the
    /// events that were appended, with their assigned sequence numbers.
    pub(crate) fn commit(
        &self,
        guard: &WriteGuard<'_>,
        staged: StagedMutations,
    ) -> Result<Vec<EventRecord>, BountyError> {
        if !std::ptr::eq(guard.db, self) {
            return Err(BountyError::Storage("write guard belongs to another database".into()));
        }
        // Encode everything up front so the transaction body cannot fail on
        // anything but storage.
        let mut report_kvs = Vec::with_capacity(staged.reports.len());
        for r in &staged.reports {
            report_kvs.push((r.id.to_be_bytes().to_vec(), encode(r)?));
        }
        let submission_keys: Vec<Vec<u8>> = staged
            .submissions
            .iter()
            .map(|(who, id)| submission_key(who, *id))
            .collect();
        let added: Vec<Vec<u8>> =
            staged.validators_added.iter().map(|v| v.as_bytes().to_vec()).collect();
        let removed: Vec<Vec<u8>> =
            staged.validators_removed.iter().map(|v| v.as_bytes().to_vec()).collect();
        let mut account_kvs = Vec::with_capacity(staged.accounts.len());
        for acc in &staged.accounts {
            account_kvs.push((acc.account_id.as_bytes().to_vec(), encode(acc)?));
        }

        let first_seq = self.event_count()?;
        let mut records = Vec::with_capacity(staged.events.len());
        let mut event_kvs = Vec::with_capacity(staged.events.len());
        for (i, event) in staged.events.into_iter().enumerate() {
            let seq = first_seq + i as u64;
            event_kvs.push((seq.to_be_bytes().to_vec(), encode(&event)?));
            records.push(EventRecord { seq, event });
        }

        let mut meta_kvs: Vec<(&str, Vec<u8>)> = Vec::new();
        if let Some(owner) = &staged.owner {
            meta_kvs.push((META_OWNER, encode(owner)?));
        }
        if let Some(schedule) = &staged.reward_schedule {
            meta_kvs.push((META_REWARD_SCHEDULE, encode(schedule)?));
        }
        if let Some(count) = staged.report_count {
            meta_kvs.push((META_REPORT_COUNT, encode(&count)?));
        }
        if let Some(pool) = staged.pool_balance {
            meta_kvs.push((META_POOL_BALANCE, encode(&pool)?));
        }
        if let Some(paid) = staged.total_paid {
            meta_kvs.push((META_TOTAL_PAID, encode(&paid)?));
        }
        if !records.is_empty() {
            meta_kvs.push((META_EVENT_COUNT, encode(&(first_seq + records.len() as u64))?));
        }

        let outcome: TransactionResult<()> = (
            &self.reports,
            &self.submissions,
            &self.validators,
            &self.accounts,
            &self.events,
            &self.meta,
        )
            .transaction(|(reports, submissions, validators, accounts, events, meta)| {
                for (k, v) in &report_kvs {
                    reports.insert(k.as_slice(), v.as_slice())?;
                }
                for k in &submission_keys {
                    submissions.insert(k.as_slice(), &[] as &[u8])?;
                }
                for k in &added {
                    validators.insert(k.as_slice(), &[] as &[u8])?;
                }
                for k in &removed {
                    validators.remove(k.as_slice())?;
                }
                for (k, v) in &account_kvs {
                    accounts.insert(k.as_slice(), v.as_slice())?;
                }
                for (k, v) in &event_kvs {
                    events.insert(k.as_slice(), v.as_slice())?;
                }
                for (k, v) in &meta_kvs {
                    meta.insert(k.as_bytes(), v.as_slice())?;
                }
                Ok(())
            });
        outcome.map_err(|e| BountyError::Storage(format!("commit failed: {e:?}")))?;

        debug!(
            reports = report_kvs.len(),
            accounts = account_kvs.len(),
            events = records.len(),
            "committed staged mutations"
        );
        Ok(records)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), BountyError> {
        self._db.flush().map_err(storage_err)?;
        Ok(())
    }
}
