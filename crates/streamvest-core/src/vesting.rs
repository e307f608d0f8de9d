//! Pure vesting math: the sender/recipient split of a stream's deposited
//! shares at a given observation time.

use crate::error::StreamError;
use crate::types::{Shares, Stream, Timestamp};

/// Sender/recipient share split at one observation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSplit {
    /// Unvested shares, refundable to the sender on cancellation.
    pub sender_shares: Shares,
    /// Vested shares not yet withdrawn.
    pub recipient_shares: Shares,
}

/// Computes the current split of `stream`'s deposited shares.
///
/// Before the start the full deposit sits on the sender's side; after the end
/// everything not yet withdrawn belongs to the recipient. In between the
/// vested amount grows linearly, rounded down, so rounding dust stays on the
/// sender's side until the stream fully vests. Past withdrawals are bounded
/// by the split computed at withdrawal time, so `withdrawn_shares` can never
/// exceed the vested amount under correct caller behavior; the subtraction is
/// still checked and fails closed.
pub fn split(stream: &Stream, now: Timestamp) -> Result<BalanceSplit, StreamError> {
    let deposited = stream.deposited_shares;
    let withdrawn = stream.withdrawn_shares;

    if now >= stream.end_time {
        let recipient_shares = checked_entitlement(deposited, withdrawn, stream)?;
        return Ok(BalanceSplit {
            sender_shares: 0,
            recipient_shares,
        });
    }

    let vested = if now <= stream.start_time {
        0
    } else {
        vested_shares(deposited, stream.start_time, stream.end_time, now)
    };

    Ok(BalanceSplit {
        // vested <= deposited because elapsed < window here.
        sender_shares: deposited - vested,
        recipient_shares: checked_entitlement(vested, withdrawn, stream)?,
    })
}

/// Linearly vested shares strictly inside the (start, end) window.
///
/// The product of deposited shares and elapsed seconds can exceed `u64`, so
/// the intermediate is widened to `u128` before dividing.
fn vested_shares(deposited: Shares, start: Timestamp, end: Timestamp, now: Timestamp) -> Shares {
    let elapsed = u128::from(now - start);
    let window = u128::from(end - start);
    ((u128::from(deposited) * elapsed) / window) as Shares
}

fn checked_entitlement(
    vested: Shares,
    withdrawn: Shares,
    stream: &Stream,
) -> Result<Shares, StreamError> {
    vested.checked_sub(withdrawn).ok_or_else(|| {
        StreamError::InvariantViolation(format!(
            "stream {} withdrawn {} exceeds vested {}",
            stream.id, withdrawn, vested
        ))
    })
}
