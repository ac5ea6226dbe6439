use thiserror::Error;

use crate::report::ReportStatus;
use crate::types::{AccountId, Balance, ReportId};

#[derive(Debug, Error)]
pub enum BountyError {
    // ── Authorization ────────────────────────────────────────────────────────
    #[error("caller {caller} is not authorized for this operation")]
    Unauthorized { caller: AccountId },

    #[error("invalid validator: {0}")]
    InvalidValidator(AccountId),

    // ── Reports ──────────────────────────────────────────────────────────────
    #[error("severity must be one of Low, Medium, High, Critical")]
    InvalidSeverity,

    #[error("no report with id {0}")]
    InvalidReportId(ReportId),

    #[error("report {report_id} has status {status:?}; operation not permitted")]
    InvalidStatus { report_id: ReportId, status: ReportStatus },

    #[error("report {0} has already been paid")]
    AlreadyPaid(ReportId),

    // ── Rewards / funds ──────────────────────────────────────────────────────
    #[error("reward tiers must satisfy 0 < low < medium < high < critical")]
    InvalidRewardAmount,

    #[error("insufficient funds in pool: need {need}, have {have}")]
    InsufficientFunds { need: Balance, have: Balance },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("transfer to {0} failed: balance overflow")]
    TransferFailed(AccountId),

    // ── Identity ─────────────────────────────────────────────────────────────
    #[error("invalid account id: {0}")]
    InvalidAccountId(String),

    // ── Lifecycle ────────────────────────────────────────────────────────────
    #[error("ledger has not been initialized")]
    NotInitialized,

    #[error("ledger is already initialized")]
    AlreadyInitialized,

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}
