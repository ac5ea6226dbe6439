use bounty_core::error::BountyError;
use bounty_core::event::LedgerEvent;
use bounty_core::report::{Report, Severity};
use bounty_core::types::{AccountId, ReportId, Timestamp};

use crate::db::{StagedMutations, StateDb};

/// The report table and the per-submitter index.
///
/// Reads go straight to the database; writes are staged into a
/// [`StagedMutations`] and only land when the caller commits.
pub struct ReportStore<'a> {
    db: &'a StateDb,
}

impl<'a> ReportStore<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    pub fn count(&self) -> Result<u64, BountyError> {
        self.db.report_count()
    }

    /// Fetch a report, failing with `InvalidReportId` for any id at or past
    /// the current report count.
    pub fn get(&self, id: ReportId) -> Result<Report, BountyError> {
        if id >= self.count()? {
            return Err(BountyError::InvalidReportId(id));
        }
        self.db.get_report(id)?.ok_or(BountyError::InvalidReportId(id))
    }

    pub fn submissions_of(&self, submitter: &AccountId) -> Result<Vec<ReportId>, BountyError> {
        self.db.submissions_of(submitter)
    }

    /// Stage a new report in `Submitted` state and append it to the
    /// submitter's index. Returns the id it will have once committed.
    pub fn stage_create(
        &self,
        staged: &mut StagedMutations,
        submitter: &AccountId,
        description: String,
        proof_of_concept: String,
        severity: Severity,
        now: Timestamp,
    ) -> Result<ReportId, BountyError> {
        if !severity.is_assigned() {
            return Err(BountyError::InvalidSeverity);
        }
        let id = match staged.report_count {
            Some(n) => n,
            None => self.count()?,
        };
        let report = Report::new(id, submitter.clone(), description, proof_of_concept, severity, now);
        staged.reports.push(report);
        staged.submissions.push((submitter.clone(), id));
        staged.report_count = Some(id + 1);
        staged.emit(LedgerEvent::BugReported {
            report_id: id,
            submitter: submitter.clone(),
            severity,
        });
        Ok(id)
    }

    pub fn stage_update(&self, staged: &mut StagedMutations, report: Report) {
        staged.reports.push(report);
    }
}
