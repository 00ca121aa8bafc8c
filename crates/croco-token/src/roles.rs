use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::TokenError;

/// Owner plus operator set. The owner always passes operator checks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessControl {
    owner: Address,
    operators: BTreeSet<Address>,
}

impl AccessControl {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            operators: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_operator(&self, account: &Address) -> bool {
        *account == self.owner || self.operators.contains(account)
    }

    /// Explicitly granted operators; the owner is not listed.
    pub fn operators(&self) -> impl Iterator<Item = &Address> {
        self.operators.iter()
    }

    pub fn require_owner(&self, caller: &Address) -> Result<(), TokenError> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(TokenError::NotOwner { caller: *caller })
        }
    }

    pub fn require_operator(&self, caller: &Address) -> Result<(), TokenError> {
        if self.is_operator(caller) {
            Ok(())
        } else {
            Err(TokenError::NotOperator { caller: *caller })
        }
    }

    pub(crate) fn grant(&mut self, account: Address) -> bool {
        self.operators.insert(account)
    }

    pub(crate) fn revoke(&mut self, account: &Address) -> bool {
        self.operators.remove(account)
    }

    pub(crate) fn set_owner(&mut self, owner: Address) {
        self.owner = owner;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_implicitly_operator() {
        let owner = Address::from_label("owner");
        let other = Address::from_label("other");
        let mut roles = AccessControl::new(owner);
        assert!(roles.require_operator(&owner).is_ok());
        assert_eq!(
            roles.require_operator(&other),
            Err(TokenError::NotOperator { caller: other })
        );
        assert!(roles.grant(other));
        assert!(!roles.grant(other));
        assert!(roles.is_operator(&other));
        assert_eq!(
            roles.require_owner(&other),
            Err(TokenError::NotOwner { caller: other })
        );
        assert!(roles.revoke(&other));
        assert!(!roles.is_operator(&other));
    }
}
