use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BountyError;

/// Amount in the pool's base unit. u128 leaves ample headroom for the
/// cumulative-paid counter, which only ever grows.
pub type Balance = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Sequential report identifier, assigned from 0 and never reused.
pub type ReportId = u64;

/// Position of an event in the append-only event log.
pub type EventSeq = u64;

// ── AccountId ────────────────────────────────────────────────────────────────

/// 32-byte identity of a caller, as supplied by the host environment.
///
/// The all-zero identity is the null identity: it can never be granted the
/// validator role.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub const NULL: AccountId = AccountId([0u8; 32]);

    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Deterministic identity derived as BLAKE3(label). Handy for local
    /// deployments and tests that need reproducible identities.
    pub fn derive(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }

    /// Base-58 encoded string representation.
    pub fn to_b58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn from_b58(s: &str) -> Result<Self, BountyError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| BountyError::InvalidAccountId(e.to_string()))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            BountyError::InvalidAccountId(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b58())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b58 = self.to_b58();
        write!(f, "AccountId({})", &b58[..b58.len().min(8)])
    }
}
