use serde::{Deserialize, Serialize};
use std::fmt;

/// Vault share units.
pub type Shares = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Stream identifier, monotonically assigned starting at 1 and never reused.
pub type StreamId = u64;

/// Opaque account identifier.
///
/// The empty string is the null principal and marks absent records, so every
/// validated input must be non-null.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn null() -> Self {
        Self(String::new())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// Reserved account backing native-asset wrapping: deposits drawn from it
    /// convert value the custodian already holds instead of pulling an
    /// external transfer-in.
    pub fn native_reserve() -> Self {
        Self("native:reserve".to_string())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque asset identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Reserved sentinel for the chain-native asset.
    pub fn native() -> Self {
        Self("native".to_string())
    }

    pub fn is_native(&self) -> bool {
        self.0 == "native"
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single payment stream record.
///
/// Invariants: `end_time > start_time`, `withdrawn_shares <=
/// deposited_shares`, and `deposited_shares` is immutable after creation.
/// The default value (null sender) doubles as the "absent" record returned
/// for never-created or cancelled ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: StreamId,
    pub sender: Principal,
    pub recipient: Principal,
    pub token: TokenId,
    pub deposited_shares: Shares,
    pub withdrawn_shares: Shares,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl Stream {
    pub fn exists(&self) -> bool {
        !self.sender.is_null()
    }
}

/// Where a stream deposit was funded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingSource {
    /// Caller's balance already custodied inside the vault.
    VaultBalance,
    /// External transfer-in (or native wrap through the reserve account).
    External,
}

/// How a payout leaves the engine's treasury.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMode {
    /// Credit the destination's vault-internal share balance.
    VaultCredit,
    /// Burn shares and pay the converted amount to an external account.
    External,
}

/// Notification recorded in the audit log after each successful mutator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    StreamCreated {
        id: StreamId,
        sender: Principal,
        recipient: Principal,
        token: TokenId,
        deposited_shares: Shares,
        start_time: Timestamp,
        end_time: Timestamp,
        funding: FundingSource,
    },
    Withdrawal {
        id: StreamId,
        shares: Shares,
        paid_to: Principal,
        token: TokenId,
        /// Nominal amount paid out externally, when the payout left the vault.
        amount_out: Option<u64>,
        payout: PayoutMode,
    },
    StreamCancelled {
        id: StreamId,
        sender_shares: Shares,
        recipient_shares: Shares,
        token: TokenId,
        payout: PayoutMode,
    },
    WhitelistChanged {
        agent: Principal,
        approved: bool,
    },
    SenderUpdated {
        id: StreamId,
        previous: Principal,
        current: Principal,
    },
}

impl StreamEvent {
    /// Stream the event belongs to, if any.
    pub fn stream_id(&self) -> Option<StreamId> {
        match self {
            Self::StreamCreated { id, .. }
            | Self::Withdrawal { id, .. }
            | Self::StreamCancelled { id, .. }
            | Self::SenderUpdated { id, .. } => Some(*id),
            Self::WhitelistChanged { .. } => None,
        }
    }
}
