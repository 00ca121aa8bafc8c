use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::calls::ReceiptId;
use crate::token::CrocoToken;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LedgerMeta {
    /// Committed transactions so far.
    pub height: u64,
    pub previous_receipt: Option<ReceiptId>,
}

/// Point-in-time view of the ledger. `state_root` commits to balances,
/// allowances, roles, supply, referral edges and referral settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub meta: LedgerMeta,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub owner: Address,
    pub total_supply: u128,
    pub balances: BTreeMap<Address, u128>,
    pub referrers: BTreeMap<Address, Address>,
    pub referred: BTreeMap<Address, u64>,
    pub referral_permils: Vec<u32>,
    pub referral_pool: Address,
    pub referral_active: bool,
    #[serde(with = "serde_hex32")]
    pub state_root: [u8; 32],
}

impl CrocoToken {
    pub fn snapshot(&self) -> TokenSnapshot {
        let referrers: BTreeMap<Address, Address> =
            self.referrals().edges().map(|(u, r)| (*u, *r)).collect();
        let referred: BTreeMap<Address, u64> =
            self.referrals().counters().map(|(a, n)| (*a, n)).collect();
        TokenSnapshot {
            meta: self.meta.clone(),
            name: self.name().to_string(),
            symbol: self.symbol().to_string(),
            decimals: self.decimals(),
            owner: self.owner(),
            total_supply: self.total_supply(),
            balances: self.balances().clone(),
            state_root: self.state_root(),
            referrers,
            referred,
            referral_permils: self.permils().as_slice().to_vec(),
            referral_pool: self.referral_pool(),
            referral_active: self.referral_active(),
        }
    }

    /// Commitment over the whole ledger: a settings leaf plus one merkle
    /// section each for balances, allowances and referral edges. The event
    /// log and applied receipts are history and stay outside it.
    pub fn state_root(&self) -> [u8; 32] {
        let mut settings = Sha256::new();
        settings.update(b"settings");
        settings.update(self.symbol().as_bytes());
        settings.update([self.decimals()]);
        settings.update(self.total_supply().to_le_bytes());
        settings.update(self.owner().as_bytes());
        for operator in self.roles().operators() {
            settings.update(operator.as_bytes());
        }
        settings.update(self.referral_pool().as_bytes());
        settings.update([self.referral_active() as u8]);
        for permil in self.permils().as_slice() {
            settings.update(permil.to_le_bytes());
        }
        let settings: [u8; 32] = settings.finalize().into();

        let accounts = section_root(
            b"accounts",
            self.balances()
                .iter()
                .map(|(account, balance)| {
                    leaf(b"acct", &[account.as_bytes(), &balance.to_le_bytes()])
                })
                .collect(),
        );
        let allowances = section_root(
            b"allowances",
            self.allowances()
                .map(|(owner, spender, amount)| {
                    leaf(
                        b"allow",
                        &[owner.as_bytes(), spender.as_bytes(), &amount.to_le_bytes()],
                    )
                })
                .collect(),
        );
        let referrals = section_root(
            b"referrals",
            self.referrals()
                .edges()
                .map(|(user, referrer)| leaf(b"edge", &[user.as_bytes(), referrer.as_bytes()]))
                .collect(),
        );
        leaf(b"croco-state", &[&settings, &accounts, &allowances, &referrals])
    }
}

fn leaf(tag: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Pairwise fold; an unpaired node moves up a level unchanged.
fn section_root(tag: &[u8], mut level: Vec<[u8; 32]>) -> [u8; 32] {
    if level.is_empty() {
        return leaf(tag, &[]);
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => leaf(b"node", &[left.as_slice(), right.as_slice()]),
                _ => pair[0],
            })
            .collect();
    }
    level[0]
}

pub(crate) mod serde_hex32 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("expected 32 bytes"))
    }
}
