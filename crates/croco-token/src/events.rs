use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::units::serde_amount;

/// Append-only record of what each committed call did. Mints are
/// transfers from [`Address::ZERO`], burns transfers to it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenEvent {
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "serde_amount")]
        amount: u128,
    },
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "serde_amount")]
        amount: u128,
    },
    ReferrerAdded {
        user: Address,
        referrer: Address,
    },
    ReferralBonus {
        /// The referral pool, or zero when the bonus was minted.
        payer: Address,
        to: Address,
        #[serde(with = "serde_amount")]
        amount: u128,
        depth: u32,
    },
    OperatorAdded {
        account: Address,
    },
    OperatorRemoved {
        account: Address,
    },
    OwnershipTransferred {
        previous: Address,
        owner: Address,
    },
    ReferralPoolChanged {
        pool: Address,
    },
    ReferralActiveToggled {
        active: bool,
    },
    ReferralPermilsChanged {
        permils: Vec<u32>,
    },
}
