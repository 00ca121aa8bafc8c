use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use referral_module::{Linked, PermilTable, ReferralBonus, ReferralEngine, ReferralTree};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::calls::ReceiptId;
use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::events::TokenEvent;
use crate::roles::AccessControl;
use crate::snapshot::LedgerMeta;

/// Events kept in memory and in the state file; older entries are dropped.
pub const MAX_RETAINED_EVENTS: usize = 4096;

/// The Croco token: balances, allowances, roles and the referral ledger.
///
/// Reads borrow; writes take the caller as their first argument and run
/// atomically, so a failed call never leaves partial state behind.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrocoToken {
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: u128,
    balances: BTreeMap<Address, u128>,
    allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
    roles: AccessControl,
    referrals: ReferralTree<Address>,
    permils: PermilTable,
    referral_pool: Address,
    referral_active: bool,
    pub(crate) meta: LedgerMeta,
    pub(crate) applied_receipts: BTreeSet<ReceiptId>,
    events: Vec<TokenEvent>,
}

impl CrocoToken {
    /// Deploy a token owned by `owner`.
    pub fn new(owner: Address, config: TokenConfig) -> Result<Self, TokenError> {
        if owner.is_zero() {
            return Err(TokenError::ZeroAddress { role: "owner" });
        }
        let permils = PermilTable::new(config.referral_permils)?;
        info!(
            "deploying {} ({}) owned by {}",
            config.name, config.symbol, owner
        );
        Ok(Self {
            name: config.name,
            symbol: config.symbol,
            decimals: config.decimals,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            roles: AccessControl::new(owner),
            referrals: ReferralTree::new(),
            permils,
            referral_pool: config.referral_pool.unwrap_or(Address::ZERO),
            referral_active: config.referral_active,
            meta: LedgerMeta::default(),
            applied_receipts: BTreeSet::new(),
            events: Vec::new(),
        })
    }

    //==================== reads ====================//

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn owner(&self) -> Address {
        self.roles.owner()
    }

    pub fn is_operator(&self, account: &Address) -> bool {
        self.roles.is_operator(account)
    }

    pub fn roles(&self) -> &AccessControl {
        &self.roles
    }

    pub fn referral_pool(&self) -> Address {
        self.referral_pool
    }

    pub fn referral_active(&self) -> bool {
        self.referral_active
    }

    pub fn referral_permils(&self, depth: usize) -> Option<u32> {
        self.permils.get(depth)
    }

    pub fn permils(&self) -> &PermilTable {
        &self.permils
    }

    pub fn referrals(&self) -> &ReferralTree<Address> {
        &self.referrals
    }

    /// Referrer of `account`, zero when none was recorded.
    pub fn get_referrer(&self, account: &Address) -> Address {
        self.referrals
            .referrer_of(account)
            .copied()
            .unwrap_or(Address::ZERO)
    }

    /// Size of the downline of `account`, all levels included.
    pub fn get_referred_number(&self, account: &Address) -> u64 {
        self.referrals.referred_number(account)
    }

    /// Bonuses a transfer of `amount` to `account` would pay, nearest
    /// referrer first.
    pub fn get_referral_amount(&self, account: &Address, amount: u128) -> Vec<ReferralBonus<Address>> {
        ReferralEngine::new(&self.permils, &self.referrals).calculate_bonuses(account, amount)
    }

    pub fn events(&self) -> &[TokenEvent] {
        &self.events
    }

    pub fn height(&self) -> u64 {
        self.meta.height
    }

    pub fn balances(&self) -> &BTreeMap<Address, u128> {
        &self.balances
    }

    /// Every non-zero `(owner, spender, amount)` allowance in key order.
    pub fn allowances(&self) -> impl Iterator<Item = (&Address, &Address, u128)> {
        self.allowances.iter().flat_map(|(owner, spenders)| {
            spenders
                .iter()
                .filter(|(_, amount)| **amount > 0)
                .map(move |(spender, amount)| (owner, spender, *amount))
        })
    }

    //==================== writes ====================//

    pub fn mint(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.atomically(|t| t.exec_mint(caller, to, amount))
    }

    pub fn burn(&mut self, caller: Address, amount: u128) -> Result<(), TokenError> {
        self.atomically(|t| t.exec_burn(caller, amount))
    }

    pub fn transfer(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.atomically(|t| t.exec_transfer(caller, to, amount))
    }

    pub fn approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.atomically(|t| t.exec_approve(caller, spender, amount))
    }

    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.atomically(|t| t.exec_transfer_from(caller, from, to, amount))
    }

    pub fn add_operator(&mut self, caller: Address, account: Address) -> Result<(), TokenError> {
        self.atomically(|t| t.exec_add_operator(caller, account))
    }

    pub fn remove_operator(&mut self, caller: Address, account: Address) -> Result<(), TokenError> {
        self.atomically(|t| t.exec_remove_operator(caller, account))
    }

    pub fn transfer_ownership(&mut self, caller: Address, owner: Address) -> Result<(), TokenError> {
        self.atomically(|t| t.exec_transfer_ownership(caller, owner))
    }

    /// Point bonus funding at `pool`. Zero means bonuses are minted.
    pub fn set_referral_pool(&mut self, caller: Address, pool: Address) -> Result<(), TokenError> {
        self.atomically(|t| t.exec_set_referral_pool(caller, pool))
    }

    /// Flip the referral gate and return the new state.
    pub fn toggle_referral_active(&mut self, caller: Address) -> Result<bool, TokenError> {
        self.atomically(|t| t.exec_toggle_referral_active(caller))
    }

    pub fn set_referral_permils(&mut self, caller: Address, permils: Vec<u32>) -> Result<(), TokenError> {
        self.atomically(|t| t.exec_set_referral_permils(caller, permils))
    }

    /// Make `referrer` the referrer of `user` unless `user` already has one;
    /// returns the referrer in effect afterwards.
    pub fn add_or_get_referrer(
        &mut self,
        caller: Address,
        referrer: Address,
        user: Address,
    ) -> Result<Address, TokenError> {
        self.atomically(|t| t.exec_add_or_get_referrer(caller, referrer, user))
    }

    /// Spend `caller`'s allowance to move `amount` from `from` to `to`,
    /// record `referrer` as `to`'s referrer if it has none, and, while the
    /// referral gate is open, pay the bonuses of `to`'s referrer chain.
    pub fn transfer_referral(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: u128,
        referrer: Address,
    ) -> Result<Vec<ReferralBonus<Address>>, TokenError> {
        self.atomically(|t| t.exec_transfer_referral(caller, from, to, amount, referrer))
    }

    /// Run `op` as one transaction: on error every field is restored and the
    /// events it emitted are dropped.
    pub(crate) fn atomically<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, TokenError>,
    ) -> Result<T, TokenError> {
        let events_len = self.events.len();
        let events = std::mem::take(&mut self.events);
        let checkpoint = self.clone();
        self.events = events;

        match op(self) {
            Ok(value) => {
                self.meta.height += 1;
                let overflow = self.events.len().saturating_sub(MAX_RETAINED_EVENTS);
                if overflow > 0 {
                    self.events.drain(..overflow);
                }
                Ok(value)
            }
            Err(err) => {
                let mut events = std::mem::take(&mut self.events);
                events.truncate(events_len);
                *self = checkpoint;
                self.events = events;
                warn!("call rejected, state rolled back: {}", err);
                Err(err)
            }
        }
    }

    //==================== transaction bodies ====================//

    pub(crate) fn exec_mint(
        &mut self,
        caller: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.roles.require_operator(&caller)?;
        self.mint_to(to, amount)
    }

    pub(crate) fn exec_burn(&mut self, caller: Address, amount: u128) -> Result<(), TokenError> {
        if caller.is_zero() {
            return Err(TokenError::ZeroAddress { role: "burner" });
        }
        self.debit(caller, amount)?;
        self.total_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(TokenError::Overflow)?;
        self.events.push(TokenEvent::Transfer {
            from: caller,
            to: Address::ZERO,
            amount,
        });
        Ok(())
    }

    pub(crate) fn exec_transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.move_tokens(caller, to, amount)
    }

    pub(crate) fn exec_approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        if caller.is_zero() {
            return Err(TokenError::ZeroAddress { role: "approver" });
        }
        if spender.is_zero() {
            return Err(TokenError::ZeroAddress { role: "spender" });
        }
        self.allowances
            .entry(caller)
            .or_default()
            .insert(spender, amount);
        self.events.push(TokenEvent::Approval {
            owner: caller,
            spender,
            amount,
        });
        Ok(())
    }

    pub(crate) fn exec_transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.spend_allowance(from, caller, amount)?;
        self.move_tokens(from, to, amount)
    }

    pub(crate) fn exec_add_operator(
        &mut self,
        caller: Address,
        account: Address,
    ) -> Result<(), TokenError> {
        self.roles.require_owner(&caller)?;
        if account.is_zero() {
            return Err(TokenError::ZeroAddress { role: "operator" });
        }
        if self.roles.grant(account) {
            info!("operator {} added", account);
            self.events.push(TokenEvent::OperatorAdded { account });
        }
        Ok(())
    }

    pub(crate) fn exec_remove_operator(
        &mut self,
        caller: Address,
        account: Address,
    ) -> Result<(), TokenError> {
        self.roles.require_owner(&caller)?;
        if self.roles.revoke(&account) {
            info!("operator {} removed", account);
            self.events.push(TokenEvent::OperatorRemoved { account });
        }
        Ok(())
    }

    pub(crate) fn exec_transfer_ownership(
        &mut self,
        caller: Address,
        owner: Address,
    ) -> Result<(), TokenError> {
        self.roles.require_owner(&caller)?;
        if owner.is_zero() {
            return Err(TokenError::ZeroAddress { role: "owner" });
        }
        self.roles.set_owner(owner);
        info!("ownership moved from {} to {}", caller, owner);
        self.events.push(TokenEvent::OwnershipTransferred {
            previous: caller,
            owner,
        });
        Ok(())
    }

    pub(crate) fn exec_set_referral_pool(
        &mut self,
        caller: Address,
        pool: Address,
    ) -> Result<(), TokenError> {
        self.roles.require_operator(&caller)?;
        self.referral_pool = pool;
        info!("referral pool set to {}", pool);
        self.events.push(TokenEvent::ReferralPoolChanged { pool });
        Ok(())
    }

    pub(crate) fn exec_toggle_referral_active(&mut self, caller: Address) -> Result<bool, TokenError> {
        self.roles.require_operator(&caller)?;
        self.referral_active = !self.referral_active;
        info!("referral payouts active: {}", self.referral_active);
        self.events.push(TokenEvent::ReferralActiveToggled {
            active: self.referral_active,
        });
        Ok(self.referral_active)
    }

    pub(crate) fn exec_set_referral_permils(
        &mut self,
        caller: Address,
        permils: Vec<u32>,
    ) -> Result<(), TokenError> {
        self.roles.require_operator(&caller)?;
        self.permils.replace(permils.clone())?;
        info!("referral permils set to {:?}", permils);
        self.events.push(TokenEvent::ReferralPermilsChanged { permils });
        Ok(())
    }

    pub(crate) fn exec_add_or_get_referrer(
        &mut self,
        caller: Address,
        referrer: Address,
        user: Address,
    ) -> Result<Address, TokenError> {
        self.roles.require_operator(&caller)?;
        self.link_referrer(referrer, user)
    }

    pub(crate) fn exec_transfer_referral(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: u128,
        referrer: Address,
    ) -> Result<Vec<ReferralBonus<Address>>, TokenError> {
        self.spend_allowance(from, caller, amount)?;
        self.move_tokens(from, to, amount)?;
        self.link_referrer(referrer, to)?;
        if !self.referral_active {
            return Ok(Vec::new());
        }
        let bonuses = self.get_referral_amount(&to, amount);
        self.pay_bonuses(&bonuses)?;
        Ok(bonuses)
    }

    //==================== helpers ====================//

    fn link_referrer(&mut self, referrer: Address, user: Address) -> Result<Address, TokenError> {
        if referrer.is_zero() || user.is_zero() {
            return Ok(self.get_referrer(&user));
        }
        match self.referrals.add_or_get(referrer, user)? {
            Linked::Added(referrer) => {
                self.events.push(TokenEvent::ReferrerAdded { user, referrer });
                Ok(referrer)
            }
            Linked::Existing(existing) => Ok(existing),
        }
    }

    fn pay_bonuses(&mut self, bonuses: &[ReferralBonus<Address>]) -> Result<(), TokenError> {
        let pool = self.referral_pool;
        for bonus in bonuses.iter().filter(|b| b.bonus > 0) {
            if pool.is_zero() {
                self.mint_to(bonus.to, bonus.bonus)?;
            } else {
                self.move_tokens(pool, bonus.to, bonus.bonus)?;
            }
            debug!(
                "referral bonus {} to {} at depth {}",
                bonus.bonus, bonus.to, bonus.depth
            );
            self.events.push(TokenEvent::ReferralBonus {
                payer: pool,
                to: bonus.to,
                amount: bonus.bonus,
                depth: bonus.depth,
            });
        }
        Ok(())
    }

    fn mint_to(&mut self, to: Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress { role: "mint recipient" });
        }
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.credit(to, amount)?;
        debug!("minted {} to {}", amount, to);
        self.events.push(TokenEvent::Transfer {
            from: Address::ZERO,
            to,
            amount,
        });
        Ok(())
    }

    fn move_tokens(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        if from.is_zero() {
            return Err(TokenError::ZeroAddress { role: "sender" });
        }
        if to.is_zero() {
            return Err(TokenError::ZeroAddress { role: "recipient" });
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        debug!("transfer {} from {} to {}", amount, from, to);
        self.events.push(TokenEvent::Transfer { from, to, amount });
        Ok(())
    }

    fn spend_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let available = self.allowance(&owner, &spender);
        if available == u128::MAX {
            return Ok(());
        }
        if available < amount {
            return Err(TokenError::InsufficientAllowance {
                owner,
                spender,
                available,
                required: amount,
            });
        }
        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, available - amount);
        Ok(())
    }

    fn credit(&mut self, account: Address, amount: u128) -> Result<(), TokenError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }

    fn debit(&mut self, account: Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance_of(&account);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account,
                available,
                required: amount,
            });
        }
        if available == amount {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, available - amount);
        }
        Ok(())
    }
}
