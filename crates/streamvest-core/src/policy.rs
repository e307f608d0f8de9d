use crate::error::StreamError;
use crate::types::Principal;
use std::collections::BTreeSet;

/// Single-owner authorization policy gating the settlement-agent whitelist.
///
/// Injected into the engine at construction so tests can substitute alternate
/// owner principals. The owner is transferable; only the owner may mutate the
/// whitelist.
#[derive(Debug, Clone)]
pub struct OwnerPolicy {
    owner: Principal,
    approved_agents: BTreeSet<Principal>,
}

impl OwnerPolicy {
    pub fn new(owner: Principal) -> Self {
        Self {
            owner,
            approved_agents: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    pub fn require_owner(&self, caller: &Principal) -> Result<(), StreamError> {
        if caller == &self.owner {
            Ok(())
        } else {
            Err(StreamError::NotOwner)
        }
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &Principal,
        new_owner: Principal,
    ) -> Result<(), StreamError> {
        self.require_owner(caller)?;
        if new_owner.is_null() {
            return Err(StreamError::NullPrincipal);
        }
        self.owner = new_owner;
        Ok(())
    }

    /// Inserts or removes a whitelist entry. Caller gating happens in the
    /// engine so the event emission sits next to the mutation.
    pub fn set_approval(&mut self, agent: Principal, approved: bool) {
        if approved {
            self.approved_agents.insert(agent);
        } else {
            self.approved_agents.remove(&agent);
        }
    }

    pub fn is_approved(&self, agent: &Principal) -> bool {
        self.approved_agents.contains(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_owner_passes_the_gate() {
        let policy = OwnerPolicy::new(Principal::new("owner"));
        assert!(policy.require_owner(&Principal::new("owner")).is_ok());
        assert_eq!(
            policy.require_owner(&Principal::new("mallory")),
            Err(StreamError::NotOwner)
        );
    }

    #[test]
    fn ownership_transfer_rejects_null_and_non_owners() {
        let mut policy = OwnerPolicy::new(Principal::new("owner"));
        assert_eq!(
            policy.transfer_ownership(&Principal::new("mallory"), Principal::new("mallory")),
            Err(StreamError::NotOwner)
        );
        assert_eq!(
            policy.transfer_ownership(&Principal::new("owner"), Principal::null()),
            Err(StreamError::NullPrincipal)
        );
        policy
            .transfer_ownership(&Principal::new("owner"), Principal::new("successor"))
            .unwrap();
        assert_eq!(policy.owner(), &Principal::new("successor"));
    }

    #[test]
    fn approval_is_insert_and_update_only() {
        let mut policy = OwnerPolicy::new(Principal::new("owner"));
        let agent = Principal::new("swapper");
        assert!(!policy.is_approved(&agent));
        policy.set_approval(agent.clone(), true);
        assert!(policy.is_approved(&agent));
        policy.set_approval(agent.clone(), false);
        assert!(!policy.is_approved(&agent));
    }
}
