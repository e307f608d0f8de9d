//! Linear payment streaming over a custodial share-denominated vault.
//!
//! A sender deposits a fixed amount of an asset that vests linearly to a
//! recipient between a start and end time. Either party may withdraw vested
//! funds, the recipient may settle withdrawals through a whitelisted
//! asset-converting agent with atomic slippage protection, and cancellation
//! splits the deposit into exact unvested/vested halves before erasing the
//! record. Every public operation commits in full or leaves no trace, audit
//! events land in an append-only hash-chained log, and caller identity and
//! time are explicit parameters.

#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod registry;
pub mod settlement;
pub mod types;
pub mod vault;
pub mod vesting;

pub use engine::StreamEngine;
pub use error::StreamError;
pub use ledger::{AuditEntry, AuditLog};
pub use policy::OwnerPolicy;
pub use registry::StreamRegistry;
pub use settlement::SettlementAgent;
pub use types::{
    FundingSource, PayoutMode, Principal, Shares, Stream, StreamEvent, StreamId, Timestamp,
    TokenId,
};
pub use vault::VaultAdapter;
pub use vesting::{split, BalanceSplit};
