pub mod access;
pub mod db;
pub mod ledger;
pub mod store;

pub use access::AccessControl;
pub use db::{StagedMutations, StateDb, WriteGuard};
pub use ledger::BountyLedger;
pub use store::ReportStore;
