use std::fmt;

use log::info;
use referral_module::ReferralBonus;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::TokenError;
use crate::token::CrocoToken;
use crate::units::serde_amount;

/// Identifier of an applied batch; a batch id is accepted once.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReceiptId(pub [u8; 32]);

impl ReceiptId {
    /// SHA-256 of the raw batch payload.
    pub fn digest(payload: &[u8]) -> Self {
        Self(Sha256::digest(payload).into())
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReceiptId({})", self)
    }
}

impl Serialize for ReceiptId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReceiptId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| D::Error::custom("receipt id must be 32 bytes"))?;
        Ok(Self(bytes))
    }
}

/// One mutating entry point of the token, as data. Amounts are base units
/// written as decimal strings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenCall {
    Mint {
        to: Address,
        #[serde(with = "serde_amount")]
        amount: u128,
    },
    Burn {
        #[serde(with = "serde_amount")]
        amount: u128,
    },
    Transfer {
        to: Address,
        #[serde(with = "serde_amount")]
        amount: u128,
    },
    Approve {
        spender: Address,
        #[serde(with = "serde_amount")]
        amount: u128,
    },
    TransferFrom {
        from: Address,
        to: Address,
        #[serde(with = "serde_amount")]
        amount: u128,
    },
    AddOperator {
        account: Address,
    },
    RemoveOperator {
        account: Address,
    },
    TransferOwnership {
        owner: Address,
    },
    SetReferralPool {
        pool: Address,
    },
    ToggleReferralActive,
    SetReferralPermils {
        permils: Vec<u32>,
    },
    AddOrGetReferrer {
        referrer: Address,
        user: Address,
    },
    TransferReferral {
        from: Address,
        to: Address,
        #[serde(with = "serde_amount")]
        amount: u128,
        referrer: Address,
    },
}

/// What a call returned, for the calls that return anything.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallOutput {
    Done,
    Referrer { referrer: Address },
    ReferralActive { active: bool },
    Bonuses { bonuses: Vec<ReferralBonus<Address>> },
}

impl CrocoToken {
    /// Run a single call atomically.
    pub fn execute(&mut self, caller: Address, call: &TokenCall) -> Result<CallOutput, TokenError> {
        self.atomically(|t| t.dispatch(caller, call))
    }

    /// Apply `calls` as one transaction under `receipt_id`. Either every
    /// call is applied or none is; a receipt id can be used once.
    pub fn apply_calls(
        &mut self,
        caller: Address,
        calls: &[TokenCall],
        receipt_id: ReceiptId,
    ) -> Result<Vec<CallOutput>, TokenError> {
        if self.applied_receipts.contains(&receipt_id) {
            return Err(TokenError::DuplicateReceipt(receipt_id));
        }

        let outputs = self.atomically(|t| {
            let mut outputs = Vec::with_capacity(calls.len());
            for (index, call) in calls.iter().enumerate() {
                let output = t
                    .dispatch(caller, call)
                    .map_err(|source| TokenError::BatchCall {
                        index,
                        source: Box::new(source),
                    })?;
                outputs.push(output);
            }
            t.meta.previous_receipt = Some(receipt_id);
            t.applied_receipts.insert(receipt_id);
            Ok(outputs)
        })?;
        info!(
            "applied batch {} ({} calls) at height {}",
            receipt_id,
            calls.len(),
            self.height()
        );
        Ok(outputs)
    }

    fn dispatch(&mut self, caller: Address, call: &TokenCall) -> Result<CallOutput, TokenError> {
        let output = match call {
            TokenCall::Mint { to, amount } => {
                self.exec_mint(caller, *to, *amount)?;
                CallOutput::Done
            }
            TokenCall::Burn { amount } => {
                self.exec_burn(caller, *amount)?;
                CallOutput::Done
            }
            TokenCall::Transfer { to, amount } => {
                self.exec_transfer(caller, *to, *amount)?;
                CallOutput::Done
            }
            TokenCall::Approve { spender, amount } => {
                self.exec_approve(caller, *spender, *amount)?;
                CallOutput::Done
            }
            TokenCall::TransferFrom { from, to, amount } => {
                self.exec_transfer_from(caller, *from, *to, *amount)?;
                CallOutput::Done
            }
            TokenCall::AddOperator { account } => {
                self.exec_add_operator(caller, *account)?;
                CallOutput::Done
            }
            TokenCall::RemoveOperator { account } => {
                self.exec_remove_operator(caller, *account)?;
                CallOutput::Done
            }
            TokenCall::TransferOwnership { owner } => {
                self.exec_transfer_ownership(caller, *owner)?;
                CallOutput::Done
            }
            TokenCall::SetReferralPool { pool } => {
                self.exec_set_referral_pool(caller, *pool)?;
                CallOutput::Done
            }
            TokenCall::ToggleReferralActive => CallOutput::ReferralActive {
                active: self.exec_toggle_referral_active(caller)?,
            },
            TokenCall::SetReferralPermils { permils } => {
                self.exec_set_referral_permils(caller, permils.clone())?;
                CallOutput::Done
            }
            TokenCall::AddOrGetReferrer { referrer, user } => CallOutput::Referrer {
                referrer: self.exec_add_or_get_referrer(caller, *referrer, *user)?,
            },
            TokenCall::TransferReferral {
                from,
                to,
                amount,
                referrer,
            } => CallOutput::Bonuses {
                bonuses: self.exec_transfer_referral(caller, *from, *to, *amount, *referrer)?,
            },
        };
        Ok(output)
    }
}
