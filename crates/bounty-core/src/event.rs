use serde::{Deserialize, Serialize};

use crate::report::{ReportStatus, Severity};
use crate::types::{AccountId, Balance, EventSeq, ReportId};

/// Observation recorded once per successful state change.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEvent {
    BugReported {
        report_id: ReportId,
        submitter: AccountId,
        severity: Severity,
    },
    ReportStatusUpdated {
        report_id: ReportId,
        status: ReportStatus,
    },
    RewardPaid {
        report_id: ReportId,
        submitter: AccountId,
        amount: Balance,
    },
    ValidatorAdded {
        validator: AccountId,
    },
    ValidatorRemoved {
        validator: AccountId,
    },
    RewardTierUpdated {
        low: Balance,
        medium: Balance,
        high: Balance,
        critical: Balance,
    },
    FundsDeposited {
        from: AccountId,
        amount: Balance,
    },
}

/// An event together with its position in the log.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub seq: EventSeq,
    pub event: LedgerEvent,
}
