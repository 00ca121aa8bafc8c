use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::permil::PermilTable;
use crate::tree::ReferralTree;

/// One priced level of a referrer chain.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferralBonus<A> {
    pub to: A,
    pub bonus: u128,
    /// 0 for the direct referrer.
    pub depth: u32,
}

/// Prices referral chains against a permil table.
pub struct ReferralEngine<'a, A> {
    permils: &'a PermilTable,
    tree: &'a ReferralTree<A>,
}

impl<'a, A: Ord + Clone + Debug> ReferralEngine<'a, A> {
    pub fn new(permils: &'a PermilTable, tree: &'a ReferralTree<A>) -> Self {
        Self { permils, tree }
    }

    /// Bonuses owed on `amount` moved towards `origin`, nearest referrer
    /// first. The walk covers at most one level per permil entry and ends
    /// early where the chain does.
    pub fn calculate_bonuses(&self, origin: &A, amount: u128) -> Vec<ReferralBonus<A>> {
        self.tree
            .ancestors(origin)
            .take(self.permils.depth())
            .enumerate()
            .map(|(depth, account)| ReferralBonus {
                to: account.clone(),
                bonus: self.permils.share(amount, depth),
                depth: depth as u32,
            })
            .collect()
    }
}
