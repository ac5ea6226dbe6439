pub mod account;
pub mod constants;
pub mod error;
pub mod event;
pub mod report;
pub mod reward;
pub mod types;

pub use account::*;
pub use constants::*;
pub use error::BountyError;
pub use event::*;
pub use report::*;
pub use reward::RewardSchedule;
pub use types::*;
