use referral_module::ReferralError;
use thiserror::Error;

use crate::address::Address;
use crate::calls::ReceiptId;

/// Every way a token call can be rejected. A rejected call leaves the
/// ledger as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error(transparent)]
    Referral(#[from] ReferralError),

    #[error("caller {caller} is not the owner")]
    NotOwner { caller: Address },

    #[error("caller {caller} is not an operator")]
    NotOperator { caller: Address },

    #[error("insufficient balance in {account}: has {available}, needs {required}")]
    InsufficientBalance {
        account: Address,
        available: u128,
        required: u128,
    },

    #[error("insufficient allowance of {spender} over {owner}: has {available}, needs {required}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        available: u128,
        required: u128,
    },

    #[error("{role} is the zero address")]
    ZeroAddress { role: &'static str },

    #[error("arithmetic overflow")]
    Overflow,

    #[error("receipt {0} was already applied")]
    DuplicateReceipt(ReceiptId),

    #[error("call #{index} in batch failed: {source}")]
    BatchCall {
        index: usize,
        #[source]
        source: Box<TokenError>,
    },
}

/// Failures converting between decimal token strings and base units.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid character in amount {0:?}")]
    InvalidDigit(String),
    #[error("amount has more than {decimals} fractional digits")]
    TooManyDecimals { decimals: u8 },
    #[error("amount does not fit in 128 bits")]
    Overflow,
}
