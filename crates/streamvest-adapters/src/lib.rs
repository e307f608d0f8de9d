//! Pluggable implementations of the engine's external collaborators: an
//! in-memory custodial vault and reference settlement agents.
//!
//! These adapters back the integration tests and double as the template for
//! wiring real custody backends: anything that implements
//! [`streamvest_core::VaultAdapter`] and is `Clone` slots into the engine's
//! transaction boundary unchanged.

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use streamvest_core::{Principal, SettlementAgent, Shares, StreamError, TokenId, VaultAdapter};

/// Shares minted per nominal unit: `shares = amount * num / den`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShareRate {
    num: u64,
    den: u64,
}

impl Default for ShareRate {
    fn default() -> Self {
        Self { num: 1, den: 1 }
    }
}

/// In-memory custodial vault with per-token share conversion rates.
///
/// Tracks vault-internal share balances and external asset balances per
/// `(token, account)` pair. Deposits drawn from
/// [`Principal::native_reserve`] wrap value the custodian already holds, so
/// no external balance is debited for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryVault {
    rates: BTreeMap<TokenId, ShareRate>,
    internal: BTreeMap<(TokenId, Principal), Shares>,
    external: BTreeMap<(TokenId, Principal), u64>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the conversion rate for `token`. Both terms must be non-zero.
    pub fn set_rate(&mut self, token: TokenId, num: u64, den: u64) {
        assert!(num > 0 && den > 0, "share rate terms must be non-zero");
        self.rates.insert(token, ShareRate { num, den });
    }

    /// Funds an account's external balance, the pool deposits draw from.
    pub fn credit_external(&mut self, token: &TokenId, account: &Principal, amount: u64) {
        *self
            .external
            .entry((token.clone(), account.clone()))
            .or_default() += amount;
    }

    /// Seeds a vault-internal share balance directly. Test setup only;
    /// production value enters through `deposit`.
    pub fn mint(&mut self, token: &TokenId, account: &Principal, shares: Shares) {
        *self
            .internal
            .entry((token.clone(), account.clone()))
            .or_default() += shares;
    }

    pub fn external_balance_of(&self, token: &TokenId, account: &Principal) -> u64 {
        self.external
            .get(&(token.clone(), account.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn rate(&self, token: &TokenId) -> ShareRate {
        self.rates.get(token).copied().unwrap_or_default()
    }

    fn debit_internal(
        &mut self,
        token: &TokenId,
        account: &Principal,
        shares: Shares,
    ) -> Result<(), StreamError> {
        let balance = self
            .internal
            .entry((token.clone(), account.clone()))
            .or_default();
        if *balance < shares {
            return Err(StreamError::Vault(format!(
                "account '{account}' holds {balance} shares of '{token}', needs {shares}"
            )));
        }
        *balance -= shares;
        Ok(())
    }

    fn debit_external(
        &mut self,
        token: &TokenId,
        account: &Principal,
        amount: u64,
    ) -> Result<(), StreamError> {
        let balance = self
            .external
            .entry((token.clone(), account.clone()))
            .or_default();
        if *balance < amount {
            return Err(StreamError::Vault(format!(
                "account '{account}' holds {balance} of '{token}' externally, needs {amount}"
            )));
        }
        *balance -= amount;
        Ok(())
    }
}

impl VaultAdapter for InMemoryVault {
    fn deposit(
        &mut self,
        token: &TokenId,
        from: &Principal,
        to: &Principal,
        amount: u64,
    ) -> Result<Shares, StreamError> {
        if from != &Principal::native_reserve() {
            self.debit_external(token, from, amount)?;
        }
        let shares = self.to_shares(token, amount)?;
        self.mint(token, to, shares);
        tracing::debug!(%token, %from, %to, amount, shares, "vault deposit");
        Ok(shares)
    }

    fn withdraw(
        &mut self,
        token: &TokenId,
        from: &Principal,
        to: &Principal,
        shares: Shares,
    ) -> Result<u64, StreamError> {
        self.debit_internal(token, from, shares)?;
        let rate = self.rate(token);
        let amount = ((u128::from(shares) * u128::from(rate.den)) / u128::from(rate.num)) as u64;
        self.credit_external(token, to, amount);
        tracing::debug!(%token, %from, %to, shares, amount, "vault withdrawal");
        Ok(amount)
    }

    fn transfer(
        &mut self,
        token: &TokenId,
        from: &Principal,
        to: &Principal,
        shares: Shares,
    ) -> Result<(), StreamError> {
        self.debit_internal(token, from, shares)?;
        self.mint(token, to, shares);
        Ok(())
    }

    fn to_shares(&self, token: &TokenId, amount: u64) -> Result<Shares, StreamError> {
        let rate = self.rate(token);
        let shares = (u128::from(amount) * u128::from(rate.num)) / u128::from(rate.den);
        u64::try_from(shares)
            .map_err(|_| StreamError::Vault(format!("share conversion overflow for '{token}'")))
    }

    fn balance_of(&self, token: &TokenId, account: &Principal) -> Shares {
        self.internal
            .get(&(token.clone(), account.clone()))
            .copied()
            .unwrap_or(0)
    }
}

/// Well-behaved converter: delivers `amount_in * rate_num / rate_den` of the
/// target token out of its own vault inventory.
pub struct FixedRateConverter {
    account: Principal,
    treasury: Principal,
    rate_num: u64,
    rate_den: u64,
}

impl FixedRateConverter {
    pub fn new(account: Principal, treasury: Principal, rate_num: u64, rate_den: u64) -> Self {
        assert!(rate_den > 0, "conversion rate denominator must be non-zero");
        Self {
            account,
            treasury,
            rate_num,
            rate_den,
        }
    }
}

impl SettlementAgent for FixedRateConverter {
    fn principal(&self) -> Principal {
        self.account.clone()
    }

    fn on_convert(
        &self,
        vault: &mut dyn VaultAdapter,
        _from_token: &TokenId,
        to_token: &TokenId,
        amount_in: Shares,
        _min_amount_out: u64,
        _payload: &[u8],
    ) -> Result<(), StreamError> {
        let out =
            ((u128::from(amount_in) * u128::from(self.rate_num)) / u128::from(self.rate_den)) as u64;
        vault.transfer(to_token, &self.account, &self.treasury, out)
    }
}

/// Misbehaving converter: keeps the input and credits a fixed amount (possibly
/// zero) regardless of what was promised.
pub struct ShortchangingConverter {
    account: Principal,
    treasury: Principal,
    delivered: u64,
}

impl ShortchangingConverter {
    pub fn new(account: Principal, treasury: Principal, delivered: u64) -> Self {
        Self {
            account,
            treasury,
            delivered,
        }
    }
}

impl SettlementAgent for ShortchangingConverter {
    fn principal(&self) -> Principal {
        self.account.clone()
    }

    fn on_convert(
        &self,
        vault: &mut dyn VaultAdapter,
        _from_token: &TokenId,
        to_token: &TokenId,
        _amount_in: Shares,
        _min_amount_out: u64,
        _payload: &[u8],
    ) -> Result<(), StreamError> {
        if self.delivered == 0 {
            return Ok(());
        }
        vault.transfer(to_token, &self.account, &self.treasury, self.delivered)
    }
}

/// Converter that aborts instead of converting.
pub struct RefusingConverter {
    account: Principal,
}

impl RefusingConverter {
    pub fn new(account: Principal) -> Self {
        Self { account }
    }
}

impl SettlementAgent for RefusingConverter {
    fn principal(&self) -> Principal {
        self.account.clone()
    }

    fn on_convert(
        &self,
        _vault: &mut dyn VaultAdapter,
        _from_token: &TokenId,
        _to_token: &TokenId,
        _amount_in: Shares,
        _min_amount_out: u64,
        _payload: &[u8],
    ) -> Result<(), StreamError> {
        Err(StreamError::Vault("conversion refused".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> TokenId {
        TokenId::new("usdc")
    }

    fn alice() -> Principal {
        Principal::new("alice")
    }

    fn treasury() -> Principal {
        Principal::new("treasury")
    }

    #[test]
    fn deposit_applies_the_share_rate() {
        let mut vault = InMemoryVault::new();
        vault.set_rate(usdc(), 2, 1);
        vault.credit_external(&usdc(), &alice(), 1_000);

        let shares = vault.deposit(&usdc(), &alice(), &treasury(), 1_000).unwrap();
        assert_eq!(shares, 2_000);
        assert_eq!(vault.balance_of(&usdc(), &treasury()), 2_000);
        assert_eq!(vault.external_balance_of(&usdc(), &alice()), 0);
    }

    #[test]
    fn withdraw_converts_shares_back_to_amounts() {
        let mut vault = InMemoryVault::new();
        vault.set_rate(usdc(), 2, 1);
        vault.mint(&usdc(), &treasury(), 2_000);

        let amount = vault.withdraw(&usdc(), &treasury(), &alice(), 2_000).unwrap();
        assert_eq!(amount, 1_000);
        assert_eq!(vault.external_balance_of(&usdc(), &alice()), 1_000);
        assert_eq!(vault.balance_of(&usdc(), &treasury()), 0);
    }

    #[test]
    fn transfers_fail_on_insufficient_shares() {
        let mut vault = InMemoryVault::new();
        vault.mint(&usdc(), &alice(), 10);
        let err = vault
            .transfer(&usdc(), &alice(), &treasury(), 11)
            .unwrap_err();
        assert!(matches!(err, StreamError::Vault(_)));
        assert_eq!(vault.balance_of(&usdc(), &alice()), 10);
    }

    #[test]
    fn native_reserve_deposits_skip_the_external_debit() {
        let mut vault = InMemoryVault::new();
        let native = TokenId::native();
        let shares = vault
            .deposit(&native, &Principal::native_reserve(), &treasury(), 500)
            .unwrap();
        assert_eq!(shares, 500);
        assert_eq!(vault.balance_of(&native, &treasury()), 500);
    }
}
