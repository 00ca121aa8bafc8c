use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ReferralError;

/// Outcome of [`ReferralTree::add_or_get`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Linked<A> {
    /// The user already had a referrer; nothing changed.
    Existing(A),
    /// A new edge was recorded.
    Added(A),
}

impl<A> Linked<A> {
    pub fn referrer(&self) -> &A {
        match self {
            Linked::Existing(a) | Linked::Added(a) => a,
        }
    }

    pub fn into_referrer(self) -> A {
        match self {
            Linked::Existing(a) | Linked::Added(a) => a,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Linked::Added(_))
    }
}

/// Referrer registry plus per-account downline counters.
///
/// Edges point from a referred user to its referrer and are never removed.
/// `referred` holds, for every account, how many accounts sit anywhere
/// below it in the tree.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(bound(
    serialize = "A: Serialize + Ord",
    deserialize = "A: Deserialize<'de> + Ord"
))]
pub struct ReferralTree<A> {
    referrers: BTreeMap<A, A>,
    referred: BTreeMap<A, u64>,
}

impl<A: Ord> Default for ReferralTree<A> {
    fn default() -> Self {
        Self {
            referrers: BTreeMap::new(),
            referred: BTreeMap::new(),
        }
    }
}

impl<A: Ord + Clone + Debug> ReferralTree<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `referrer` as the referrer of `user`, or return the referrer
    /// `user` already has.
    ///
    /// A fresh edge moves `user` and its own downline under `referrer`, so
    /// the counter of `referrer` and of every account above it grows by
    /// that many.
    pub fn add_or_get(&mut self, referrer: A, user: A) -> Result<Linked<A>, ReferralError> {
        if let Some(existing) = self.referrers.get(&user) {
            return Ok(Linked::Existing(existing.clone()));
        }
        if referrer == user {
            return Err(ReferralError::SelfReferral);
        }
        if self.ancestors(&referrer).any(|a| *a == user) {
            return Err(ReferralError::ReferrerCycle);
        }

        let moved = self.referred_number(&user).saturating_add(1);
        let upline: Vec<A> = std::iter::once(referrer.clone())
            .chain(self.ancestors(&referrer).cloned())
            .collect();
        for account in upline {
            let count = self.referred.entry(account).or_default();
            *count = count.saturating_add(moved);
        }
        debug!("referral edge {:?} -> {:?}", user, referrer);
        self.referrers.insert(user, referrer.clone());
        Ok(Linked::Added(referrer))
    }

    pub fn referrer_of(&self, user: &A) -> Option<&A> {
        self.referrers.get(user)
    }

    /// Number of accounts anywhere below `account`.
    pub fn referred_number(&self, account: &A) -> u64 {
        self.referred.get(account).copied().unwrap_or(0)
    }

    /// Walk upward from `user`, nearest referrer first.
    pub fn ancestors<'a>(&'a self, user: &'a A) -> Ancestors<'a, A> {
        let mut visited = BTreeSet::new();
        visited.insert(user);
        Ancestors {
            tree: self,
            node: user,
            visited,
        }
    }

    /// The first `limit` entries of the referrer chain of `user`.
    pub fn ancestry(&self, user: &A, limit: usize) -> Vec<A> {
        self.ancestors(user).take(limit).cloned().collect()
    }

    /// All recorded `(user, referrer)` edges in key order.
    pub fn edges(&self) -> impl Iterator<Item = (&A, &A)> {
        self.referrers.iter()
    }

    /// Every account with a non-zero downline and its size.
    pub fn counters(&self) -> impl Iterator<Item = (&A, u64)> {
        self.referred.iter().map(|(a, n)| (a, *n))
    }

    pub fn len(&self) -> usize {
        self.referrers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.referrers.is_empty()
    }
}

/// Iterator over a referrer chain. Stops at the first account without a
/// referrer, or when an account would repeat.
pub struct Ancestors<'a, A> {
    tree: &'a ReferralTree<A>,
    node: &'a A,
    visited: BTreeSet<&'a A>,
}

impl<'a, A: Ord> Iterator for Ancestors<'a, A> {
    type Item = &'a A;

    fn next(&mut self) -> Option<Self::Item> {
        let parent = self.tree.referrers.get(self.node)?;
        if !self.visited.insert(parent) {
            return None;
        }
        self.node = parent;
        Some(parent)
    }
}
