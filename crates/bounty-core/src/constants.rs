/// ─── Bounty Ledger Constants ────────────────────────────────────────────────
///
/// All amounts are in the pool's base unit.

// ── Default reward schedule ──────────────────────────────────────────────────

/// Reward for an accepted `Low` report when no schedule is configured.
pub const DEFAULT_REWARD_LOW: u128 = 100;

/// Reward for an accepted `Medium` report when no schedule is configured.
pub const DEFAULT_REWARD_MEDIUM: u128 = 500;

/// Reward for an accepted `High` report when no schedule is configured.
pub const DEFAULT_REWARD_HIGH: u128 = 1_000;

/// Reward for an accepted `Critical` report when no schedule is configured.
pub const DEFAULT_REWARD_CRITICAL: u128 = 5_000;
