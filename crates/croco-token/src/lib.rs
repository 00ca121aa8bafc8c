//! Croco token ledger.
//!
//! An ERC-20 style balance sheet extended with a referral registry: every
//! `transfer_referral` can record who brought the recipient in and pays a
//! permil share of the transferred amount to each level of the recipient's
//! referrer chain, funded by the referral pool.
//!
//! Every mutating entry point takes the caller explicitly and either fully
//! applies or leaves the ledger untouched.

pub mod address;
pub mod calls;
pub mod config;
pub mod events;
pub mod roles;
pub mod service;
pub mod snapshot;
pub mod token;
pub mod units;

mod error;

pub use address::{Address, AddressParseError};
pub use calls::{CallOutput, ReceiptId, TokenCall};
pub use config::TokenConfig;
pub use error::{TokenError, UnitsError};
pub use events::TokenEvent;
pub use referral_module::{ReferralBonus, ReferralError, PERMIL_DENOMINATOR};
pub use roles::AccessControl;
pub use service::TokenService;
pub use snapshot::{LedgerMeta, TokenSnapshot};
pub use token::{CrocoToken, MAX_RETAINED_EVENTS};
pub use units::{format_units, parse_units, tokens, DECIMALS};

/// Base units, `10^decimals` per whole token.
pub type Amount = u128;
