use crate::error::StreamError;
use crate::types::{Principal, Shares, TokenId};

/// Custodial vault holding assets as share-denominated balances.
///
/// The vault is an already-trusted external collaborator: the engine only
/// moves value between accounts through it and never redesigns its
/// accounting. Depositing converts a nominal amount to shares exactly once,
/// which insulates a stream from later exchange-rate changes inside the
/// vault.
///
/// Implementations must be `Clone` so the engine can snapshot vault state at
/// the start of each public operation and restore it on failure.
pub trait VaultAdapter {
    /// Pull `amount` of `token` from `from`'s external balance and credit the
    /// minted shares to `to`'s vault-internal balance. Returns the shares
    /// actually minted, which is what stream records must store.
    ///
    /// When `from` is [`Principal::native_reserve`], the deposit wraps native
    /// value the custodian already holds instead of an external transfer-in.
    fn deposit(
        &mut self,
        token: &TokenId,
        from: &Principal,
        to: &Principal,
        amount: u64,
    ) -> Result<Shares, StreamError>;

    /// Burn `shares` from `from`'s vault-internal balance and pay the
    /// converted nominal amount to `to`'s external balance. Returns the
    /// amount paid out.
    fn withdraw(
        &mut self,
        token: &TokenId,
        from: &Principal,
        to: &Principal,
        shares: Shares,
    ) -> Result<u64, StreamError>;

    /// Move `shares` between two vault-internal accounts.
    fn transfer(
        &mut self,
        token: &TokenId,
        from: &Principal,
        to: &Principal,
        shares: Shares,
    ) -> Result<(), StreamError>;

    /// Convert a nominal amount to shares at the current rate, without moving
    /// any value.
    fn to_shares(&self, token: &TokenId, amount: u64) -> Result<Shares, StreamError>;

    /// Vault-internal share balance of `account`.
    fn balance_of(&self, token: &TokenId, account: &Principal) -> Shares;
}
