use crate::error::StreamError;
use crate::types::{Principal, Shares, TokenId};
use crate::vault::VaultAdapter;

/// Untrusted external converter invoked during swap settlement.
///
/// The engine credits the input shares to [`SettlementAgent::principal`] as a
/// vault-internal transfer, then calls [`SettlementAgent::on_convert`]. The
/// callback is expected to credit the engine's treasury with proceeds in the
/// target token, but nothing it returns is trusted: delivery is verified
/// purely by re-reading the treasury balance afterwards, and the whole
/// operation rolls back if the realized delta is below the minimum.
pub trait SettlementAgent {
    /// Vault account the input shares are credited to before conversion.
    fn principal(&self) -> Principal;

    /// Performs the conversion. `payload` is opaque routing data passed
    /// through from the withdrawing recipient.
    fn on_convert(
        &self,
        vault: &mut dyn VaultAdapter,
        from_token: &TokenId,
        to_token: &TokenId,
        amount_in: Shares,
        min_amount_out: u64,
        payload: &[u8],
    ) -> Result<(), StreamError>;
}
