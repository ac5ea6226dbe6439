use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BountyError;
use crate::types::{AccountId, Balance, ReportId, Timestamp};

// ── Severity ──────────────────────────────────────────────────────────────────

/// Ordinal classification of a report. `None` is never a valid severity for
/// a stored report; it exists so that callers can express "unclassified".
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn is_assigned(self) -> bool {
        self != Severity::None
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl FromStr for Severity {
    type Err = BountyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Severity::None),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(BountyError::InvalidSeverity),
        }
    }
}

// ── ReportStatus ──────────────────────────────────────────────────────────────

/// Lifecycle stage of a report.
///
/// `Submitted → UnderReview → {Accepted, Rejected}`, `Accepted → Paid`.
/// `Paid` is only reachable through a payout.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportStatus {
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
    Paid,
}

impl ReportStatus {
    /// Whether a report in this status is owed (or has been paid) a reward.
    pub fn carries_reward(self) -> bool {
        matches!(self, ReportStatus::Accepted | ReportStatus::Paid)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportStatus::Submitted => "submitted",
            ReportStatus::UnderReview => "under-review",
            ReportStatus::Accepted => "accepted",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Paid => "paid",
        };
        f.write_str(s)
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "submitted" => Ok(ReportStatus::Submitted),
            "under-review" | "underreview" => Ok(ReportStatus::UnderReview),
            "accepted" => Ok(ReportStatus::Accepted),
            "rejected" => Ok(ReportStatus::Rejected),
            "paid" => Ok(ReportStatus::Paid),
            other => Err(format!("unknown report status: {other}")),
        }
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// A single vulnerability report and its review/payment state.
///
/// `submitter`, `description`, `proof_of_concept` and `submission_time` are
/// fixed at creation. `reward` is non-zero exactly when the status is
/// `Accepted` or `Paid`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub id: ReportId,
    pub submitter: AccountId,
    pub description: String,
    pub proof_of_concept: String,
    pub severity: Severity,
    pub status: ReportStatus,
    pub submission_time: Timestamp,
    pub reward: Balance,
}

impl Report {
    pub fn new(
        id: ReportId,
        submitter: AccountId,
        description: String,
        proof_of_concept: String,
        severity: Severity,
        submission_time: Timestamp,
    ) -> Self {
        Self {
            id,
            submitter,
            description,
            proof_of_concept,
            severity,
            status: ReportStatus::Submitted,
            submission_time,
            reward: 0,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == ReportStatus::Paid
    }
}
