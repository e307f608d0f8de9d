use crate::error::StreamError;
use crate::ledger::AuditLog;
use crate::policy::OwnerPolicy;
use crate::registry::StreamRegistry;
use crate::settlement::SettlementAgent;
use crate::types::{
    FundingSource, PayoutMode, Principal, Shares, Stream, StreamEvent, StreamId, Timestamp,
    TokenId,
};
use crate::vault::VaultAdapter;
use crate::vesting::{self, BalanceSplit};

/// Streaming engine: stream registry, vesting payouts, and swap settlement
/// over a custodial vault.
///
/// Every public mutator runs inside an explicit commit/rollback scope: the
/// engine snapshots its mutable state up front and restores it when the
/// operation body fails, so partial effects are never observable. This is
/// the host-neutral rendering of a platform-atomic transaction; callers on a
/// concurrent host must serialize access per engine.
///
/// Caller identity is an explicit authenticated `Principal` threaded into
/// each operation, and time is an explicit `now` parameter.
pub struct StreamEngine<V: VaultAdapter + Clone> {
    vault: V,
    registry: StreamRegistry,
    policy: OwnerPolicy,
    log: AuditLog,
    /// Vault account custodying all deposited stream shares.
    treasury: Principal,
    /// Native value held by the engine, wrappable into vault shares.
    native_pot: u64,
}

struct Checkpoint<V> {
    vault: V,
    registry: StreamRegistry,
    policy: OwnerPolicy,
    log: AuditLog,
    native_pot: u64,
}

impl<V: VaultAdapter + Clone> StreamEngine<V> {
    pub fn new(vault: V, owner: Principal, treasury: Principal) -> Self {
        Self {
            vault,
            registry: StreamRegistry::new(),
            policy: OwnerPolicy::new(owner),
            log: AuditLog::new(),
            treasury,
            native_pot: 0,
        }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn treasury(&self) -> &Principal {
        &self.treasury
    }

    pub fn owner(&self) -> &Principal {
        self.policy.owner()
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.log
    }

    pub fn is_agent_approved(&self, agent: &Principal) -> bool {
        self.policy.is_approved(agent)
    }

    /// Credits native value to the engine, making it wrappable by a later
    /// native-asset stream creation.
    pub fn fund_native(&mut self, amount: u64) {
        self.native_pot = self.native_pot.saturating_add(amount);
    }

    /// Public query surface: absent ids yield the default record.
    pub fn get_stream(&self, id: StreamId) -> Stream {
        self.registry.get_or_default(id)
    }

    /// Current sender/recipient split of a live stream.
    pub fn split_of(&self, id: StreamId, now: Timestamp) -> Result<BalanceSplit, StreamError> {
        let stream = self
            .registry
            .get(id)
            .ok_or(StreamError::StreamNotFound(id))?;
        vesting::split(stream, now)
    }

    /// Creates a stream vesting `amount` of `token` from `caller` to
    /// `recipient` over `[start_time, end_time)`. Returns the new id and the
    /// shares actually received by the deposit, which is what the record
    /// stores rather than the nominal amount.
    #[allow(clippy::too_many_arguments)]
    pub fn create_stream(
        &mut self,
        caller: &Principal,
        recipient: &Principal,
        token: &TokenId,
        start_time: Timestamp,
        end_time: Timestamp,
        amount: u64,
        funding: FundingSource,
        now: Timestamp,
    ) -> Result<(StreamId, Shares), StreamError> {
        self.atomic(|engine| {
            if recipient.is_null() {
                return Err(StreamError::NullPrincipal);
            }
            if amount == 0 {
                return Err(StreamError::ZeroDeposit);
            }
            if start_time < now {
                return Err(StreamError::InvalidStartTime);
            }
            if end_time <= start_time {
                return Err(StreamError::InvalidEndTime);
            }

            let deposited_shares = engine.collect_deposit(caller, token, amount, funding)?;
            let id = engine.registry.create(
                caller.clone(),
                recipient.clone(),
                token.clone(),
                deposited_shares,
                start_time,
                end_time,
            );
            engine.log.append(&StreamEvent::StreamCreated {
                id,
                sender: caller.clone(),
                recipient: recipient.clone(),
                token: token.clone(),
                deposited_shares,
                start_time,
                end_time,
                funding,
            })?;
            tracing::info!(
                stream = id,
                sender = %caller,
                recipient = %recipient,
                token = %token,
                deposited_shares,
                "stream created"
            );
            Ok((id, deposited_shares))
        })
    }

    /// Withdraws vested shares. Callable by the sender or the recipient; only
    /// the recipient may redirect the payout, any other caller always pays
    /// the recorded recipient. Returns the recipient balance computed for
    /// this withdrawal, before the debit, and the destination actually paid.
    pub fn withdraw(
        &mut self,
        caller: &Principal,
        id: StreamId,
        shares: Shares,
        redirect_to: Option<Principal>,
        payout: PayoutMode,
        now: Timestamp,
    ) -> Result<(Shares, Principal), StreamError> {
        self.atomic(|engine| {
            if shares == 0 {
                return Err(StreamError::ZeroWithdrawal);
            }
            let stream = engine.require_stream(id)?;
            if caller != &stream.sender && caller != &stream.recipient {
                return Err(StreamError::NotSenderOrRecipient);
            }
            let split = vesting::split(&stream, now)?;
            if shares > split.recipient_shares {
                return Err(StreamError::Overdraw {
                    requested: shares,
                    available: split.recipient_shares,
                });
            }

            let destination = match redirect_to {
                Some(to) if caller == &stream.recipient && !to.is_null() => to,
                _ => stream.recipient.clone(),
            };

            // Debit before moving funds so a reentrant observer already sees
            // the reduced entitlement.
            engine.debit_withdrawn(id, shares)?;
            let amount_out = engine.pay_out(&stream.token, &destination, shares, payout)?;
            engine.log.append(&StreamEvent::Withdrawal {
                id,
                shares,
                paid_to: destination.clone(),
                token: stream.token.clone(),
                amount_out,
                payout,
            })?;
            tracing::debug!(stream = id, shares, paid_to = %destination, "withdrawal settled");
            Ok((split.recipient_shares, destination))
        })
    }

    /// Cancels a stream with an exact pro-rata split: unvested shares return
    /// to the sender, vested-but-unwithdrawn shares go to the recipient, and
    /// the record is erased entirely. One atomic unit.
    pub fn cancel_stream(
        &mut self,
        caller: &Principal,
        id: StreamId,
        payout: PayoutMode,
        now: Timestamp,
    ) -> Result<(Shares, Shares), StreamError> {
        self.atomic(|engine| {
            let stream = engine.require_stream(id)?;
            if caller != &stream.sender && caller != &stream.recipient {
                return Err(StreamError::NotSenderOrRecipient);
            }
            let split = vesting::split(&stream, now)?;

            engine.registry.remove(id);
            engine.pay_out(&stream.token, &stream.recipient, split.recipient_shares, payout)?;
            engine.pay_out(&stream.token, &stream.sender, split.sender_shares, payout)?;
            engine.log.append(&StreamEvent::StreamCancelled {
                id,
                sender_shares: split.sender_shares,
                recipient_shares: split.recipient_shares,
                token: stream.token.clone(),
                payout,
            })?;
            tracing::info!(
                stream = id,
                sender_shares = split.sender_shares,
                recipient_shares = split.recipient_shares,
                "stream cancelled"
            );
            Ok((split.sender_shares, split.recipient_shares))
        })
    }

    /// Replaces the sender of a live stream. Schedule and balances are
    /// untouched. Emits a `SenderUpdated` audit event so sender delegation is
    /// observable like every other mutator.
    pub fn update_sender(
        &mut self,
        caller: &Principal,
        id: StreamId,
        new_sender: Principal,
    ) -> Result<(), StreamError> {
        self.atomic(|engine| {
            if new_sender.is_null() {
                return Err(StreamError::NullPrincipal);
            }
            let stream = engine
                .registry
                .get_mut(id)
                .ok_or(StreamError::StreamNotFound(id))?;
            if caller != &stream.sender {
                return Err(StreamError::NotSender);
            }
            let previous = std::mem::replace(&mut stream.sender, new_sender.clone());
            engine.log.append(&StreamEvent::SenderUpdated {
                id,
                previous,
                current: new_sender,
            })?;
            Ok(())
        })
    }

    /// Withdraws vested shares and converts them to `target_token` through a
    /// whitelisted settlement agent, with atomic slippage protection: if the
    /// realized treasury delta is below `min_amount_out`, every effect of the
    /// attempt is rolled back: the entitlement debit, the transfer to the
    /// agent, and anything the agent did through the vault.
    ///
    /// On success the entire realized delta, which may exceed the minimum, is
    /// forwarded to the recipient. Returns the remaining recipient balance.
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw_and_convert(
        &mut self,
        caller: &Principal,
        id: StreamId,
        shares: Shares,
        target_token: &TokenId,
        min_amount_out: u64,
        agent: &dyn SettlementAgent,
        payload: &[u8],
        payout: PayoutMode,
        now: Timestamp,
    ) -> Result<Shares, StreamError> {
        self.atomic(|engine| {
            if shares == 0 {
                return Err(StreamError::ZeroWithdrawal);
            }
            let stream = engine.require_stream(id)?;
            if caller != &stream.recipient {
                return Err(StreamError::NotRecipient);
            }
            let agent_principal = agent.principal();
            if !engine.policy.is_approved(&agent_principal) {
                return Err(StreamError::UnknownAgent(agent_principal));
            }
            let split = vesting::split(&stream, now)?;
            if shares > split.recipient_shares {
                return Err(StreamError::Overdraw {
                    requested: shares,
                    available: split.recipient_shares,
                });
            }

            // Close the reentrancy window before any external control
            // transfer: a reentrant withdrawal sees the debited balance.
            engine.debit_withdrawn(id, shares)?;

            let before = engine.vault.balance_of(target_token, &engine.treasury);
            // Internal credit only: the exchange stays inside the custodial
            // accounting so the agent can move vault-internal value.
            engine
                .vault
                .transfer(&stream.token, &engine.treasury, &agent_principal, shares)?;
            agent.on_convert(
                &mut engine.vault,
                &stream.token,
                target_token,
                shares,
                min_amount_out,
                payload,
            )?;
            let after = engine.vault.balance_of(target_token, &engine.treasury);

            let received = after.saturating_sub(before);
            if received < min_amount_out {
                return Err(StreamError::InsufficientOutput {
                    received,
                    minimum: min_amount_out,
                });
            }

            let amount_out = engine.pay_out(target_token, &stream.recipient, received, payout)?;
            engine.log.append(&StreamEvent::Withdrawal {
                id,
                shares,
                paid_to: stream.recipient.clone(),
                token: target_token.clone(),
                amount_out: Some(amount_out.unwrap_or(received)),
                payout,
            })?;
            tracing::info!(
                stream = id,
                shares,
                target_token = %target_token,
                received,
                "swap settlement completed"
            );
            Ok(split.recipient_shares - shares)
        })
    }

    /// Adds or removes a settlement agent from the whitelist. Owner only.
    pub fn set_agent_approval(
        &mut self,
        caller: &Principal,
        agent: Principal,
        approved: bool,
    ) -> Result<(), StreamError> {
        self.atomic(|engine| {
            engine.policy.require_owner(caller)?;
            if agent.is_null() {
                return Err(StreamError::NullPrincipal);
            }
            engine.policy.set_approval(agent.clone(), approved);
            engine
                .log
                .append(&StreamEvent::WhitelistChanged { agent: agent.clone(), approved })?;
            tracing::info!(agent = %agent, approved, "whitelist changed");
            Ok(())
        })
    }

    /// Transfers the owner role. Owner only.
    pub fn transfer_ownership(
        &mut self,
        caller: &Principal,
        new_owner: Principal,
    ) -> Result<(), StreamError> {
        self.policy.transfer_ownership(caller, new_owner)
    }

    fn require_stream(&self, id: StreamId) -> Result<Stream, StreamError> {
        self.registry
            .get(id)
            .cloned()
            .ok_or(StreamError::StreamNotFound(id))
    }

    fn debit_withdrawn(&mut self, id: StreamId, shares: Shares) -> Result<(), StreamError> {
        let stream = self
            .registry
            .get_mut(id)
            .ok_or(StreamError::StreamNotFound(id))?;
        stream.withdrawn_shares = stream
            .withdrawn_shares
            .checked_add(shares)
            .ok_or_else(|| {
                StreamError::InvariantViolation(format!("stream {id} withdrawn shares overflow"))
            })?;
        Ok(())
    }

    fn collect_deposit(
        &mut self,
        caller: &Principal,
        token: &TokenId,
        amount: u64,
        funding: FundingSource,
    ) -> Result<Shares, StreamError> {
        match funding {
            FundingSource::VaultBalance => {
                let shares = self.vault.to_shares(token, amount)?;
                self.vault.transfer(token, caller, &self.treasury, shares)?;
                Ok(shares)
            }
            FundingSource::External => {
                if token.is_native() && self.native_pot >= amount {
                    // Wrap native value already held instead of pulling an
                    // explicit transfer-in.
                    self.native_pot -= amount;
                    self.vault
                        .deposit(token, &Principal::native_reserve(), &self.treasury, amount)
                } else {
                    self.vault.deposit(token, caller, &self.treasury, amount)
                }
            }
        }
    }

    fn pay_out(
        &mut self,
        token: &TokenId,
        to: &Principal,
        shares: Shares,
        payout: PayoutMode,
    ) -> Result<Option<u64>, StreamError> {
        if shares == 0 {
            return Ok(None);
        }
        match payout {
            PayoutMode::VaultCredit => {
                self.vault.transfer(token, &self.treasury, to, shares)?;
                Ok(None)
            }
            PayoutMode::External => self
                .vault
                .withdraw(token, &self.treasury, to, shares)
                .map(Some),
        }
    }

    fn atomic<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, StreamError>,
    ) -> Result<T, StreamError> {
        let checkpoint = Checkpoint {
            vault: self.vault.clone(),
            registry: self.registry.clone(),
            policy: self.policy.clone(),
            log: self.log.clone(),
            native_pot: self.native_pot,
        };
        match op(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.vault = checkpoint.vault;
                self.registry = checkpoint.registry;
                self.policy = checkpoint.policy;
                self.log = checkpoint.log;
                self.native_pot = checkpoint.native_pot;
                Err(err)
            }
        }
    }
}
